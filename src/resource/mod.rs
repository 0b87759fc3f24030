//! Object identity and the opaque records the cache mirrors.
//!
//! The cache never looks inside an object beyond its [`Identity`]. Values
//! are replaced wholesale, so the only requirement on a cached type is the
//! [`Resource`] trait.


use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// `(name, namespace?)` key of a cached object. `namespace` is `None` for
/// cluster-scoped objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    namespace: Option<String>,
    name: String,
}

impl Identity {
    pub fn new(
        name: impl Into<String>,
        namespace: Option<impl Into<String>>,
    ) -> Self {
        Self {
            namespace: namespace.map(Into::into),
            name: name.into(),
        }
    }

    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for Identity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Anything the informer can cache.
pub trait Resource: Send + Sync + 'static {
    fn identity(&self) -> Identity;
}

/// Opaque resume marker returned by a list and handed to the next watch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for VersionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for VersionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full snapshot produced by a list call
#[derive(Debug, Clone)]
pub struct ObjectList<T> {
    pub items: Vec<T>,
    pub version: VersionToken,
}

impl<T> ObjectList<T> {
    pub fn new(
        items: Vec<T>,
        version: impl Into<VersionToken>,
    ) -> Self {
        Self {
            items,
            version: version.into(),
        }
    }
}

/// Schema-less object backed by a JSON value.
///
/// Identity comes from `metadata.name` / `metadata.namespace` when the
/// object carries a `metadata` map, otherwise from top-level `name` /
/// `namespace`. An object without a string name does not deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DynamicObject {
    identity: Identity,
    value: Value,
}

impl DynamicObject {
    pub fn identity_ref(&self) -> &Identity {
        &self.identity
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Shortcut for `value[field]`, `Value::Null` when absent.
    pub fn field(
        &self,
        field: &str,
    ) -> &Value {
        &self.value[field]
    }
}

#[derive(Debug, thiserror::Error)]
#[error("object has no name")]
pub struct MissingName;

impl TryFrom<Value> for DynamicObject {
    type Error = MissingName;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let source = match value.get("metadata") {
            Some(meta) if meta.is_object() => meta,
            _ => &value,
        };

        let name = source.get("name").and_then(Value::as_str).ok_or(MissingName)?;
        let namespace = source
            .get("namespace")
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty());

        Ok(Self {
            identity: Identity::new(name, namespace),
            value,
        })
    }
}

impl From<DynamicObject> for Value {
    fn from(object: DynamicObject) -> Self {
        object.value
    }
}

impl Resource for DynamicObject {
    fn identity(&self) -> Identity {
        self.identity.clone()
    }
}
