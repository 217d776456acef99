// src/tabs.rs
//! Tabs: [`TabId`], [`TabInfo`], the [`TabSource`] collaborator and the
//! [`TabEventLoop`] that keeps badges current.

mod event_loop;
mod source;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use event_loop::{TabEvent, TabEventLoop, TabStatus};
pub use source::{StaticTabSource, TabSource, TabSourceHandle};

/// Browser-assigned tab identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl From<i64> for TabId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the guard needs to know about a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    /// Current URL. `None` for tabs the extension may not inspect.
    #[serde(default)]
    pub url: Option<String>,
}

impl TabInfo {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id: TabId(id),
            url: Some(url.into()),
        }
    }
}
