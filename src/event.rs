//! Wire vocabulary vs. subscription vocabulary.
//!
//! The watch stream speaks `ADDED | MODIFIED | DELETED`; subscribers speak
//! `add | update | delete`. The two are distinct closed enums joined by one
//! total mapping, [`WatchEventType::verb`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::UsageError;

/// Event type as sent by the streaming transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

impl WatchEventType {
    /// Maps a wire event to the verb subscribers see.
    ///
    /// `existed` is whether the identity was in the store before the event
    /// was applied: ADDED and MODIFIED both become `update` for a known
    /// identity and `add` otherwise.
    pub fn verb(
        self,
        existed: bool,
    ) -> Verb {
        match (self, existed) {
            (WatchEventType::Deleted, _) => Verb::Delete,
            (WatchEventType::Added | WatchEventType::Modified, true) => Verb::Update,
            (WatchEventType::Added | WatchEventType::Modified, false) => Verb::Add,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventType::Added => "ADDED",
            WatchEventType::Modified => "MODIFIED",
            WatchEventType::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for WatchEventType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the watch stream: `{"type": ..., "object": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchRecord<T> {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    pub object: T,
}

/// Subscription-facing event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Add,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 3] = [Verb::Add, Verb::Update, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Add => "add",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Verb::Add),
            "update" => Ok(Verb::Update),
            "delete" => Ok(Verb::Delete),
            other => Err(UsageError::UnknownVerb(other.to_string()).into()),
        }
    }
}

/// Arguments accepted where a verb is expected: a [`Verb`] or its name.
///
/// Names outside `add | update | delete` fail with
/// [`UsageError::UnknownVerb`].
pub trait IntoVerb {
    fn into_verb(self) -> Result<Verb>;
}

impl IntoVerb for Verb {
    fn into_verb(self) -> Result<Verb> {
        Ok(self)
    }
}

impl IntoVerb for &str {
    fn into_verb(self) -> Result<Verb> {
        self.parse()
    }
}

impl IntoVerb for String {
    fn into_verb(self) -> Result<Verb> {
        self.parse()
    }
}
