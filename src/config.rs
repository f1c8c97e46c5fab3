use std::sync::LazyLock;

use derive_from_env::FromEnv;

use crate::severity::Severity;

#[derive(FromEnv)]
#[from_env(prefix = "PLINTH")]
#[allow(non_snake_case)]
pub struct PlinthConfig {
    /// Flush cadence of file sink writer threads, in milliseconds.
    #[from_env(default = "100")]
    pub FLUSH_INTERVAL_MS: u64,
    /// Threshold assigned to newly created loggers.
    #[from_env(default = "INFO")]
    pub DEFAULT_THRESHOLD: String,
}

impl PlinthConfig {
    /// Parsed form of `DEFAULT_THRESHOLD`; unknown names fall back to
    /// [`Severity::Information`].
    pub fn default_threshold(&self) -> Severity {
        Severity::from_name(&self.DEFAULT_THRESHOLD).unwrap_or(Severity::Information)
    }
}

pub static PLINTH_CONFIG: LazyLock<PlinthConfig> =
    LazyLock::new(|| PlinthConfig::from_env().unwrap());
