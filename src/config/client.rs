use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// HTTP client parameters shared by list and watch requests
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// TCP connect timeout (unit: milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Total timeout for a list request. Watch requests carry none since
    /// their body is expected to stay open.
    #[serde(default = "default_list_timeout_ms")]
    pub list_timeout_ms: u64,

    #[serde(default = "default_tcp_keepalive_secs")]
    pub tcp_keepalive_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            list_timeout_ms: default_list_timeout_ms(),
            tcp_keepalive_secs: default_tcp_keepalive_secs(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client.connect_timeout_ms cannot be 0".into(),
            )));
        }

        if self.list_timeout_ms < self.connect_timeout_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "client.list_timeout_ms {}ms should not be shorter than connect_timeout_ms {}ms",
                self.list_timeout_ms, self.connect_timeout_ms
            ))));
        }

        Ok(())
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_list_timeout_ms() -> u64 {
    30_000
}
fn default_tcp_keepalive_secs() -> u64 {
    60
}
