// src/badge.rs
//! Per-tab cookie count badge.
//!
//! [`BadgeSynchronizer::refresh`] recomputes a tab's badge from scratch:
//!
//! - no URL, or a non-http(s) URL: the badge text is cleared,
//! - otherwise the cookies visible for the URL are counted and shown, with
//!   counts above the cap shown as `"{cap}+"`, in a fixed color scheme.
//!
//! Refreshing is idempotent and safe to run concurrently for the same tab;
//! the last write to a tab's badge wins. Enumeration failures count as zero
//! cookies and render failures are logged, so a refresh never fails.

mod recording;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::{GuardConfig, Rgba};
use crate::cookies::CookieSourceHandle;
use crate::domain::is_http_url;
use crate::tabs::TabId;

pub use recording::{RecordingBadgeRenderer, RenderedBadge};

/// Badge-rendering capability (text plus colors per tab).
#[async_trait]
pub trait BadgeRenderer: Send + Sync {
    async fn set_text(&self, tab: TabId, text: &str) -> anyhow::Result<()>;

    async fn set_background_color(&self, tab: TabId, color: Rgba) -> anyhow::Result<()>;

    /// Not every platform can color badge text; the default does nothing.
    async fn set_text_color(&self, _tab: TabId, _color: Rgba) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A reference-counted pointer to a type-erased [`BadgeRenderer`].
pub type BadgeRendererHandle = Arc<dyn BadgeRenderer>;

/// Result of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeState {
    pub tab_id: TabId,
    /// Number of visible cookies; `None` when no badge is shown.
    pub visible_count: Option<usize>,
}

impl BadgeState {
    /// Text the badge shows for this state with the given cap.
    pub fn label(&self, cap: usize) -> String {
        self.visible_count.map(|n| badge_text(n, cap)).unwrap_or_default()
    }
}

/// `"0"` … `"{cap}"`, then `"{cap}+"`.
pub fn badge_text(count: usize, cap: usize) -> String {
    if count > cap {
        format!("{cap}+")
    } else {
        count.to_string()
    }
}

pub struct BadgeSynchronizer {
    cookies: CookieSourceHandle,
    renderer: BadgeRendererHandle,
    cap: usize,
    background: Rgba,
    text_color: Rgba,
}

impl BadgeSynchronizer {
    pub fn new(cookies: CookieSourceHandle, renderer: BadgeRendererHandle, config: &GuardConfig) -> Self {
        Self {
            cookies,
            renderer,
            cap: config.badge_cap,
            background: config.badge_background,
            text_color: config.badge_text_color,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Recomputes and renders the badge for `tab_id` showing `url`.
    pub async fn refresh(&self, tab_id: TabId, url: Option<&str>) -> BadgeState {
        let page = url
            .filter(|u| is_http_url(u))
            .and_then(|u| Url::parse(u).ok());

        let Some(page) = page else {
            if let Err(e) = self.renderer.set_text(tab_id, "").await {
                log::warn!("Tab[{tab_id}]: cannot clear badge: {e}");
            }
            return BadgeState { tab_id, visible_count: None };
        };

        let count = match self.cookies.list(&page).await {
            Ok(cookies) => cookies.len(),
            Err(e) => {
                log::warn!("Tab[{tab_id}]: cookie enumeration for {page} failed: {e}");
                0
            }
        };

        let state = BadgeState { tab_id, visible_count: Some(count) };
        self.render(&state).await;
        state
    }

    async fn render(&self, state: &BadgeState) {
        let tab_id = state.tab_id;
        let text = state.label(self.cap);

        if let Err(e) = self.renderer.set_text(tab_id, &text).await {
            log::warn!("Tab[{tab_id}]: cannot set badge text: {e}");
            return;
        }
        if let Err(e) = self.renderer.set_background_color(tab_id, self.background).await {
            log::warn!("Tab[{tab_id}]: cannot set badge background: {e}");
        }
        if let Err(e) = self.renderer.set_text_color(tab_id, self.text_color).await {
            log::warn!("Tab[{tab_id}]: cannot set badge text color: {e}");
        }
    }
}
