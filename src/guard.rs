use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::badge::{BadgeRendererHandle, BadgeSynchronizer};
use crate::classify::{ClassificationOverlay, OverlayClassifier};
use crate::config::GuardConfig;
use crate::cookies::{CachingCookieSource, CookieSourceHandle};
use crate::enforce::EnforcementEngine;
use crate::panel::Panel;
use crate::policy::{KeyValueHandle, PolicyStore};
use crate::protocol::{MessageHandler, RequestContext};
use crate::risk::Confirmer;
use crate::tabs::{TabEvent, TabEventLoop, TabSourceHandle};

/// Capacity of the tab event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// The browser-side capabilities the guard runs against.
pub struct Collaborators {
    pub cookies: CookieSourceHandle,
    pub storage: KeyValueHandle,
    pub badges: BadgeRendererHandle,
    pub tabs: TabSourceHandle,
    pub overlay: Option<Arc<dyn ClassificationOverlay>>,
}

pub struct CookieGuard {
    config: Arc<GuardConfig>,          // Configuration shared by all parts
    policies: Arc<PolicyStore>,        // Domain policies
    badges: Arc<BadgeSynchronizer>,    // Badge updates, always on fresh enumerations
    handler: Arc<MessageHandler>,      // Protocol entry point
    tabs: TabSourceHandle,
    overlay: Option<Arc<dyn ClassificationOverlay>>,
}

impl CookieGuard {
    /// Wires the guard on top of the given collaborators. Can use None when using the default
    /// configuration.
    pub fn new(config: Option<GuardConfig>, collaborators: Collaborators) -> Self {
        let config = Arc::new(config.unwrap_or_default());

        let policies = Arc::new(PolicyStore::new(collaborators.storage, config.policy_storage_key.clone()));
        let cache = Arc::new(CachingCookieSource::new(collaborators.cookies.clone(), config.state_cache_ttl));
        let badges = Arc::new(BadgeSynchronizer::new(collaborators.cookies, collaborators.badges, &config));
        let enforcement = Arc::new(EnforcementEngine::new(policies.clone(), cache.clone(), badges.clone(), &config));
        let handler = Arc::new(MessageHandler::new(
            config.clone(),
            policies.clone(),
            cache,
            enforcement,
            badges.clone(),
        ));

        Self {
            config,
            policies,
            badges,
            handler,
            tabs: collaborators.tabs,
            overlay: collaborators.overlay,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn handler(&self) -> Arc<MessageHandler> {
        self.handler.clone()
    }

    pub fn policies(&self) -> Arc<PolicyStore> {
        self.policies.clone()
    }

    /// Request context for the currently active tab. Lookup failures give an empty context.
    pub async fn active_context(&self) -> RequestContext {
        match self.tabs.active_tab().await {
            Ok(tab) => RequestContext { tab },
            Err(e) => {
                log::warn!("active tab lookup failed: {e}");
                RequestContext::default()
            }
        }
    }

    /// Spawns the tab event loop on the current runtime. Dropping the sender stops the loop.
    pub fn start_tab_events(&self) -> (mpsc::Sender<TabEvent>, JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let event_loop = TabEventLoop::new(event_rx, self.tabs.clone(), self.badges.clone());
        let handle = tokio::spawn(event_loop.run());
        (event_tx, handle)
    }

    /// A new classifier; its overlay cache lives as long as the returned value.
    pub fn classifier(&self) -> OverlayClassifier {
        match &self.overlay {
            Some(overlay) => OverlayClassifier::new(overlay.clone(), self.config.overlay_timeout),
            None => OverlayClassifier::heuristic_only(),
        }
    }

    pub async fn open_panel(&self, ctx: RequestContext, confirmer: Arc<dyn Confirmer>) -> Panel {
        Panel::open(self.handler(), ctx, Arc::new(self.classifier()), confirmer).await
    }
}
