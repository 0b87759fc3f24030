//! HTTP collaborators for the informer
//!
//! - [`ApiClient`] - reqwest client bound to one API server; opens watch
//!   streams ([`WatchTransport`](crate::watch::WatchTransport))
//! - [`HttpLister`] - list calls against the same server, decoding the
//!   `{items, metadata.resourceVersion}` list shape
//! - [`RequestDecorator`] - credentials applied to every request
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use listwatch::{ApiClient, BearerToken, DynamicObject, InformerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = ApiClient::builder("https://cluster.local:6443")
//!         .decorator(Arc::new(BearerToken::new("token")))
//!         .build()
//!         .unwrap();
//!
//!     let pods = client
//!         .informer::<DynamicObject>("/api/v1/pods", InformerConfig::default())
//!         .spawn()
//!         .await
//!         .unwrap();
//!
//!     println!("cached pods: {}", pods.list(None).len());
//! }
//! ```

mod api_client;
mod auth;
mod builder;
mod lister;

pub use api_client::*;
pub use auth::*;
pub use builder::*;
pub use lister::*;
