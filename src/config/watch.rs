use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Watch request and stream decoding configuration
///
/// # Example (TOML)
/// ```toml
/// [watch]
/// watch_param = "watch"
/// resume_param = "resourceVersion"
/// timeout_seconds = 300
/// max_line_bytes = 16777216
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Query parameter carrying the watch flag
    ///
    /// **Default**: `watch`
    #[serde(default = "default_watch_param")]
    pub watch_param: String,

    /// Query parameter carrying the resume VersionToken
    ///
    /// **Default**: `resourceVersion`
    #[serde(default = "default_resume_param")]
    pub resume_param: String,

    /// Server-side session lifetime, sent as `timeoutSeconds` when set
    ///
    /// **Default**: unset (server decides)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Longest accepted record line. Longer lines are discarded like
    /// malformed records.
    ///
    /// **Default**: 16 MiB
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch_param: default_watch_param(),
            resume_param: default_resume_param(),
            timeout_seconds: None,
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.watch_param.is_empty() || self.resume_param.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "watch.watch_param and watch.resume_param cannot be empty".into(),
            )));
        }

        if self.watch_param == self.resume_param {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch.watch_param and watch.resume_param are both '{}'",
                self.watch_param
            ))));
        }

        if self.max_line_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.max_line_bytes must be > 0".into(),
            )));
        }

        if self.timeout_seconds == Some(0) {
            return Err(Error::Config(ConfigError::Message(
                "watch.timeout_seconds must be > 0 when set".into(),
            )));
        }

        Ok(())
    }
}

fn default_watch_param() -> String {
    "watch".to_string()
}
fn default_resume_param() -> String {
    "resourceVersion".to_string()
}
fn default_max_line_bytes() -> usize {
    16 * 1024 * 1024
}
