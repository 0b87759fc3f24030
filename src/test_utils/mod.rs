//! Shared helpers for unit tests: sample objects, canned watch bodies and
//! scripted list/watch collaborators.
mod common;
mod fakes;

pub use common::*;
pub use fakes::*;
