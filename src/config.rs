use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// Default task queue capacity.
pub const TASK_QUEUE_CAPACITY: usize = i32::MAX as usize;
/// Default ceiling on worker threads under [`PoolMode::Cached`].
pub const THREAD_CEILING: usize = 1024;

/// Scaling policy of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolMode {
    /// The worker count is set once at start and never changes.
    #[default]
    Fixed,
    /// Workers are added under queue pressure, up to the thread ceiling,
    /// and retire after staying idle, down to the initial count.
    Cached,
}

/// Tunables of a [`ThreadPool`](crate::ThreadPool).
///
/// Durations are written as integer milliseconds when (de)serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Scaling policy.
    pub mode: PoolMode,
    /// Maximum number of queued tasks.
    pub queue_capacity: usize,
    /// Maximum number of workers. Only used in cached mode.
    pub thread_ceiling: usize,
    /// How long `submit` waits for queue space before rejecting.
    #[serde(with = "millis")]
    pub submit_timeout: Duration,
    /// How long an extra cached worker may idle before it retires.
    #[serde(with = "millis")]
    pub idle_timeout: Duration,
    /// How often an idle cached worker re-checks its idle time.
    #[serde(with = "millis")]
    pub idle_poll: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            mode: PoolMode::Fixed,
            queue_capacity: TASK_QUEUE_CAPACITY,
            thread_ceiling: THREAD_CEILING,
            submit_timeout: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(10),
            idle_poll: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds
    /// out-of-range values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PoolConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(invalid("queue capacity must be at least 1"));
        }
        if self.thread_ceiling == 0 {
            return Err(invalid("thread ceiling must be at least 1"));
        }
        if self.submit_timeout.is_zero()
            || self.idle_timeout.is_zero()
            || self.idle_poll.is_zero()
        {
            return Err(invalid("timeouts must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> PoolError {
    PoolError::InvalidConfig(msg.to_owned())
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
