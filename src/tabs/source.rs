use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::tabs::{TabId, TabInfo};

/// Tab-activity capability: "which tab is active" and "what does tab X show".
#[async_trait]
pub trait TabSource: Send + Sync {
    /// The active tab of the focused window, if any.
    async fn active_tab(&self) -> anyhow::Result<Option<TabInfo>>;

    /// Looks up a tab by id.
    async fn tab(&self, id: TabId) -> anyhow::Result<Option<TabInfo>>;
}

/// A reference-counted pointer to a type-erased [`TabSource`].
pub type TabSourceHandle = Arc<dyn TabSource>;

/// A tab source whose tabs are set by the host (or a test).
#[derive(Debug, Default)]
pub struct StaticTabSource {
    tabs: RwLock<BTreeMap<TabId, TabInfo>>,
    active: RwLock<Option<TabId>>,
}

impl StaticTabSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tab.
    pub fn upsert(&self, tab: TabInfo) {
        self.tabs.write().unwrap_or_else(PoisonError::into_inner).insert(tab.id, tab);
    }

    pub fn close(&self, id: TabId) {
        self.tabs.write().unwrap_or_else(PoisonError::into_inner).remove(&id);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(id) {
            *active = None;
        }
    }

    pub fn activate(&self, id: TabId) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(id);
    }
}

#[async_trait]
impl TabSource for StaticTabSource {
    async fn active_tab(&self) -> anyhow::Result<Option<TabInfo>> {
        let active = *self.active.read().unwrap_or_else(PoisonError::into_inner);
        match active {
            Some(id) => self.tab(id).await,
            None => Ok(None),
        }
    }

    async fn tab(&self, id: TabId) -> anyhow::Result<Option<TabInfo>> {
        Ok(self.tabs.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned())
    }
}
