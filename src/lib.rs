//! List-watch reconciling cache.
//!
//! An [`Informer`] lists a remote collection, mirrors it in an
//! [`ObjectStore`], follows changes over a streaming watch and relists
//! whenever the stream ends. Subscribers register per [`Verb`] and see every
//! store change in the order it was applied.

mod client;
mod config;
mod errors;
mod event;
mod informer;
mod metrics;
mod registry;
mod resource;
mod store;
pub mod utils;
mod watch;

pub use client::*;
pub use config::*;
pub use errors::*;
pub use event::*;
pub use informer::*;
pub use metrics::*;
pub use registry::*;
pub use resource::*;
pub use store::*;
pub use utils::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
