use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::badge::BadgeRenderer;
use crate::config::Rgba;
use crate::tabs::TabId;

/// What a tab's badge currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBadge {
    pub text: String,
    pub background: Option<Rgba>,
    pub text_color: Option<Rgba>,
}

/// Badge renderer that only remembers the last badge per tab. Used by hosts
/// without a toolbar and by tests.
#[derive(Debug, Default)]
pub struct RecordingBadgeRenderer {
    badges: RwLock<HashMap<TabId, RenderedBadge>>,
}

impl RecordingBadgeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn badge(&self, tab: TabId) -> Option<RenderedBadge> {
        self.badges.read().unwrap_or_else(PoisonError::into_inner).get(&tab).cloned()
    }

    fn update(&self, tab: TabId, f: impl FnOnce(&mut RenderedBadge)) {
        let mut badges = self.badges.write().unwrap_or_else(PoisonError::into_inner);
        f(badges.entry(tab).or_default());
    }
}

#[async_trait]
impl BadgeRenderer for RecordingBadgeRenderer {
    async fn set_text(&self, tab: TabId, text: &str) -> anyhow::Result<()> {
        self.update(tab, |b| b.text = text.to_string());
        Ok(())
    }

    async fn set_background_color(&self, tab: TabId, color: Rgba) -> anyhow::Result<()> {
        self.update(tab, |b| b.background = Some(color));
        Ok(())
    }

    async fn set_text_color(&self, tab: TabId, color: Rgba) -> anyhow::Result<()> {
        self.update(tab, |b| b.text_color = Some(color));
        Ok(())
    }
}
