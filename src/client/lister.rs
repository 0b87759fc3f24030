use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::ApiClient;
use crate::ListError;
use crate::Lister;
use crate::ObjectList;
use crate::Resource;
use crate::Result;
use crate::VersionToken;

#[derive(Deserialize)]
struct ListBody<T> {
    items: Vec<T>,
    #[serde(default)]
    metadata: ListMeta,
}

#[derive(Deserialize, Default)]
struct ListMeta {
    #[serde(default, rename = "resourceVersion")]
    resource_version: VersionToken,
}

/// [`Lister`] issuing `GET {base}{path}` and decoding
/// `{"items": [...], "metadata": {"resourceVersion": "..."}}`.
pub struct HttpLister<T> {
    client: ApiClient,
    path: String,
    query: Vec<(String, String)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HttpLister<T> {
    pub fn new(
        client: ApiClient,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            query: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Extra query parameter for every list call, e.g. a label selector.
    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl<T> Lister<T> for HttpLister<T>
where
    T: Resource + DeserializeOwned,
{
    async fn list(&self) -> Result<ObjectList<T>> {
        let response = self
            .client
            .get(&self.path)
            .query(&self.query)
            .timeout(self.client.config().list_timeout())
            .send()
            .await
            .map_err(ListError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListError::Status {
                path: self.path.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(ListError::Http)?;
        let list: ListBody<T> = serde_json::from_slice(&body).map_err(ListError::Decode)?;

        debug!(
            path = %self.path,
            items = list.items.len(),
            version = %list.metadata.resource_version,
            "list decoded"
        );
        Ok(ObjectList::new(list.items, list.metadata.resource_version))
    }
}
