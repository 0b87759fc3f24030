use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::ApiClient;
use super::NoAuth;
use super::RequestDecorator;
use crate::ClientConfig;
use crate::Error;
use crate::Result;

pub struct ApiClientBuilder {
    base_url: String,
    config: ClientConfig,
    decorator: Arc<dyn RequestDecorator>,
}

impl ApiClientBuilder {
    /// Create a new builder with default config for `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            config: ClientConfig::default(),
            decorator: Arc::new(NoAuth),
        }
    }

    /// Set connection timeout (default: 5s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the total timeout of list requests (default: 30s)
    pub fn list_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.list_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Completely replaces the default configuration
    ///
    /// Discards anything set through
    /// [`connect_timeout`](ApiClientBuilder::connect_timeout) or
    /// [`list_timeout`](ApiClientBuilder::list_timeout).
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn decorator(
        mut self,
        decorator: Arc<dyn RequestDecorator>,
    ) -> Self {
        self.decorator = decorator;
        self
    }

    /// Validate the configuration and build the underlying HTTP client
    pub fn build(self) -> Result<ApiClient> {
        self.config.validate()?;

        let http = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout())
            .tcp_keepalive(self.config.tcp_keepalive())
            .build()
            .map_err(|e| Error::Fatal(format!("failed to build http client: {e}")))?;

        let base_url = self.base_url.trim_end_matches('/').to_string();
        debug!(%base_url, "api client ready");

        Ok(ApiClient::new(base_url, http, self.config, self.decorator))
    }
}
