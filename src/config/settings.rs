use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_VALIDATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine knobs that are not part of the form schema itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Upper bound for one rule invocation. A rule that takes longer is
    /// reported as a validator failure.
    pub validator_timeout: Duration,
}

impl EngineSettings {
    pub fn with_validator_timeout(mut self, timeout: Duration) -> Self {
        self.validator_timeout = timeout;
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            validator_timeout: DEFAULT_VALIDATOR_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSettings {
    #[serde(default, alias = "validatorTimeoutMs")]
    validator_timeout_ms: Option<u64>,
}

impl From<RawSettings> for EngineSettings {
    fn from(raw: RawSettings) -> Self {
        let defaults = Self::default();
        Self {
            validator_timeout: raw
                .validator_timeout_ms
                .map(|ms| Duration::from_millis(ms.max(1)))
                .unwrap_or(defaults.validator_timeout),
        }
    }
}
