use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::ApiClientBuilder;
use super::HttpLister;
use super::RequestDecorator;
use crate::watch::ByteStream;
use crate::watch::WatchTransport;
use crate::ClientConfig;
use crate::InformerBuilder;
use crate::InformerConfig;
use crate::Resource;
use crate::Result;
use crate::WatchError;

/// HTTP access to one API server.
///
/// Cheap to clone: clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    config: ClientConfig,
    decorator: Arc<dyn RequestDecorator>,
}

impl ApiClient {
    pub(super) fn new(
        base_url: String,
        http: reqwest::Client,
        config: ClientConfig,
        decorator: Arc<dyn RequestDecorator>,
    ) -> Self {
        Self {
            base_url,
            http,
            config,
            decorator,
        }
    }

    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url(
        &self,
        path: &str,
    ) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decorated GET request for `path`
    pub(crate) fn get(
        &self,
        path: &str,
    ) -> RequestBuilder {
        self.decorator.decorate(self.http.get(self.url(path)))
    }

    pub fn lister<T>(
        &self,
        path: impl Into<String>,
    ) -> HttpLister<T> {
        HttpLister::new(self.clone(), path)
    }

    /// Informer builder listing and watching `path` through this client.
    pub fn informer<T>(
        &self,
        path: impl Into<String>,
        config: InformerConfig,
    ) -> InformerBuilder<T>
    where
        T: Resource + DeserializeOwned,
    {
        let path = path.into();
        InformerBuilder::from_config(path.clone(), config)
            .lister(Arc::new(self.lister::<T>(path)))
            .transport(Arc::new(self.clone()))
    }
}

#[async_trait]
impl WatchTransport for ApiClient {
    async fn open(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ByteStream> {
        let response = self.get(path).query(query).send().await.map_err(WatchError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        debug!(path, %status, "watch stream opened");
        Ok(Box::pin(response.bytes_stream().map_err(io::Error::other)))
    }
}
