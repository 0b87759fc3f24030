//! Fluent assembly of an [`Informer`].
//!
//! ```ignore
//! let informer = InformerBuilder::<DynamicObject>::new("/api/v1/pods")?
//!     .lister(lister)
//!     .transport(transport)
//!     .spawn()
//!     .await?;
//! ```
//!
//! [`build`](InformerBuilder::build) leaves the informer idle until
//! [`Informer::start`]; [`spawn`](InformerBuilder::spawn) starts it right
//! away.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use super::Informer;
use super::Lister;
use crate::watch::WatchTransport;
use crate::InformerConfig;
use crate::Resource;
use crate::Result;
use crate::UsageError;

pub struct InformerBuilder<T> {
    path: String,
    params: Vec<(String, String)>,
    lister: Option<Arc<dyn Lister<T>>>,
    transport: Option<Arc<dyn WatchTransport>>,
    config: InformerConfig,
}

impl<T> InformerBuilder<T>
where
    T: Resource + DeserializeOwned,
{
    /// Builder for `path` with configuration loaded from defaults,
    /// `CONFIG_PATH` and `INFORMER__*` environment variables.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let config = InformerConfig::new()?.validate()?;
        Ok(Self::from_config(path, config))
    }

    /// Builder for `path` with an in-memory configuration
    pub fn from_config(
        path: impl Into<String>,
        config: InformerConfig,
    ) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
            lister: None,
            transport: None,
            config,
        }
    }

    /// Merge an extra configuration file over the current values.
    pub fn with_override_config(
        mut self,
        config_path: &str,
    ) -> Result<Self> {
        info!("with_override_config from: {}", config_path);
        self.config = self.config.with_override_config(config_path)?.validate()?;
        Ok(self)
    }

    pub fn lister(
        mut self,
        lister: Arc<dyn Lister<T>>,
    ) -> Self {
        self.lister = Some(lister);
        self
    }

    pub fn transport(
        mut self,
        transport: Arc<dyn WatchTransport>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the entire configuration
    pub fn config(
        mut self,
        config: InformerConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Extra query parameter for every watch request, e.g. a label selector.
    pub fn watch_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<Informer<T>> {
        let lister = self.lister.ok_or(UsageError::MissingComponent("lister"))?;
        let transport = self.transport.ok_or(UsageError::MissingComponent("watch transport"))?;
        Ok(Informer::new(self.path, self.params, lister, transport, self.config))
    }

    /// Build and start. Resolves once the first snapshot is applied.
    pub async fn spawn(self) -> Result<Informer<T>> {
        let informer = self.build()?;
        informer.start().await?;
        Ok(informer)
    }
}
