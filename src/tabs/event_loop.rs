use std::sync::Arc;

use tokio::sync::mpsc;

use crate::badge::{BadgeState, BadgeSynchronizer};
use crate::tabs::{TabId, TabSourceHandle};

/// Navigation status carried by tab update notifications.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Browser notifications that may change what a badge should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// A tab became the active tab.
    Activated { tab_id: TabId },
    /// A tab's load state or URL changed.
    Updated { tab_id: TabId, status: TabStatus, url: Option<String> },
    /// The browser started with the extension loaded.
    Startup,
    /// The extension was installed or updated.
    Installed,
}

/// Consumes [`TabEvent`]s and refreshes the affected badge.
///
/// Events are handled one at a time in arrival order. The loop ends when every
/// sender is dropped.
pub struct TabEventLoop {
    event_rx: mpsc::Receiver<TabEvent>,
    tabs: TabSourceHandle,
    badges: Arc<BadgeSynchronizer>,
}

impl TabEventLoop {
    pub fn new(event_rx: mpsc::Receiver<TabEvent>, tabs: TabSourceHandle, badges: Arc<BadgeSynchronizer>) -> Self {
        Self { event_rx, tabs, badges }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event).await;
        }
        log::debug!("tab event loop finished");
    }

    /// Handles one event, returning the refreshed badge if any.
    pub async fn handle_event(&self, event: TabEvent) -> Option<BadgeState> {
        match event {
            TabEvent::Activated { tab_id } => match self.tabs.tab(tab_id).await {
                Ok(Some(tab)) => Some(self.badges.refresh(tab.id, tab.url.as_deref()).await),
                Ok(None) => {
                    log::debug!("Tab[{tab_id}]: activated tab vanished before lookup");
                    None
                }
                Err(e) => {
                    log::warn!("Tab[{tab_id}]: lookup failed: {e}");
                    None
                }
            },
            TabEvent::Updated { tab_id, status: TabStatus::Complete, url } => {
                Some(self.badges.refresh(tab_id, url.as_deref()).await)
            }
            TabEvent::Updated { .. } => None,
            TabEvent::Startup | TabEvent::Installed => self.refresh_active().await,
        }
    }

    async fn refresh_active(&self) -> Option<BadgeState> {
        match self.tabs.active_tab().await {
            Ok(Some(tab)) => Some(self.badges.refresh(tab.id, tab.url.as_deref()).await),
            Ok(None) => None,
            Err(e) => {
                log::warn!("active tab lookup failed: {e}");
                None
            }
        }
    }
}
