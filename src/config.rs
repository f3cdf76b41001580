use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default progress refresh period when the tuning document does not set one.
pub const DEFAULT_PROGRESS_REFRESH_PERIOD_MS: u64 = 1000;

/// Error raised while building read options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("progress refresh period must be non-negative, got {millis} ms")]
    NegativeRefreshPeriod { millis: i64 },
    #[error("failed to parse read options document")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

/// Tuning options for one read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadConfig {
    progress_refresh_period: Duration,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            progress_refresh_period: Duration::from_millis(DEFAULT_PROGRESS_REFRESH_PERIOD_MS),
        }
    }
}

impl ReadConfig {
    /// Builds options from a raw period in milliseconds. Negative values are
    /// rejected outright rather than clamped; zero means "refresh on every
    /// record" and suppresses the ticker thread.
    pub fn from_millis(millis: i64) -> Result<Self, ConfigError> {
        if millis < 0 {
            return Err(ConfigError::NegativeRefreshPeriod { millis });
        }
        Ok(Self {
            progress_refresh_period: Duration::from_millis(millis as u64),
        })
    }

    /// Parses the upstream tuning document
    /// `{"progress_refresh_period_ms": <int>}`. A missing key keeps the
    /// default.
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let raw: RawReadOptions =
            serde_json::from_str(payload).map_err(|source| ConfigError::Parse { source })?;
        match raw.progress_refresh_period_ms {
            Some(millis) => Self::from_millis(millis),
            None => Ok(Self::default()),
        }
    }

    pub fn refresh_period(&self) -> Duration {
        self.progress_refresh_period
    }

    /// True when every record advance must refresh the progress cache.
    pub fn refresh_every_record(&self) -> bool {
        self.progress_refresh_period.is_zero()
    }
}

#[derive(Debug, Deserialize)]
struct RawReadOptions {
    #[serde(default)]
    progress_refresh_period_ms: Option<i64>,
}
