//! Streaming watch sessions.
//!
//! A [`WatchTransport`] opens one long-lived request and hands back its body
//! as a byte stream. A [`WatchSession`] splits that body into lines, decodes
//! each line as a `{type, object}` record and feeds the records, in arrival
//! order, to a callback. Every session ends with exactly one completion
//! signal unless it is stopped first.
//!
//! ```text
//!  Idle ──watch()──► Connecting ──open ok──► Streaming ──EOF / error──► Done
//!                        │                                              ▲
//!                        └──────────────── open failed ─────────────────┘
//! ```

mod decoder;
mod session;
pub use decoder::*;
pub use session::*;


use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Response body of a watch request
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Opens watch requests.
///
/// `query` already carries the watch flag and the resume VersionToken.
/// Implementations must fail with [`crate::WatchError::Status`] for
/// non-success responses and with a transport error when the connection
/// cannot be established. Errors while reading the body are reported
/// through the returned stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchTransport: Send + Sync + 'static {
    async fn open(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ByteStream>;
}
