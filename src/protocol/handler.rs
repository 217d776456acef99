use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use url::Url;

use crate::badge::BadgeSynchronizer;
use crate::config::GuardConfig;
use crate::cookies::{CachingCookieSource, Cookie};
use crate::domain::{domain_key, is_http_url, strip_www_prefix};
use crate::enforce::EnforcementEngine;
use crate::errors::GuardError;
use crate::policy::{Policy, PolicyStore};
use crate::protocol::{Ack, Request, RequestContext, Response, StateResponse, StorageFlags};

/// Answers protocol requests on behalf of the shell.
///
/// Holds no per-tab state; everything it needs about the calling tab comes in
/// through the [`RequestContext`].
pub struct MessageHandler {
    config: Arc<GuardConfig>,
    policies: Arc<PolicyStore>,
    cookies: Arc<CachingCookieSource>,
    enforcement: Arc<EnforcementEngine>,
    badges: Arc<BadgeSynchronizer>,
    storage_signals: RwLock<HashMap<String, StorageFlags>>,
}

impl MessageHandler {
    pub fn new(
        config: Arc<GuardConfig>,
        policies: Arc<PolicyStore>,
        cookies: Arc<CachingCookieSource>,
        enforcement: Arc<EnforcementEngine>,
        badges: Arc<BadgeSynchronizer>,
    ) -> Self {
        Self {
            config,
            policies,
            cookies,
            enforcement,
            badges,
            storage_signals: RwLock::new(HashMap::new()),
        }
    }

    pub async fn handle(&self, ctx: &RequestContext, request: Request) -> Response {
        log::debug!("handling {request:?}");

        match request {
            Request::GetState => Response::State(self.state(ctx, false).await),
            Request::ForceState => Response::State(self.state(ctx, true).await),
            Request::SetBlockList { domain, names, block } => {
                let result = self
                    .enforcement
                    .apply_block_list(&domain, &names, block, ctx.tab.as_ref())
                    .await
                    .map(|_| ());
                Response::Ack(ack(result))
            }
            Request::ClearPolicy { domain } => {
                Response::Ack(ack(self.enforcement.clear_domain(&domain, ctx.tab.as_ref()).await))
            }
            Request::RefreshBadge | Request::RefreshBadgeColors => {
                if let Some(tab) = &ctx.tab {
                    self.badges.refresh(tab.id, tab.url.as_deref()).await;
                }
                Response::Ack(Ack::ok())
            }
            Request::StorageSignal { domain, flags } => {
                self.record_storage(&domain, flags);
                Response::Ack(Ack::ok())
            }
        }
    }

    /// Decodes a raw JSON request, handles it and encodes the response.
    ///
    /// Malformed requests are answered with `{ok: false, error}`.
    pub async fn handle_json(&self, ctx: &RequestContext, raw: &Value) -> Value {
        let response = match serde_json::from_value::<Request>(raw.clone()) {
            Ok(request) => self.handle(ctx, request).await,
            Err(e) => {
                log::warn!("rejecting malformed request: {e}");
                Response::Ack(Ack::failed(format!("invalid request: {e}")))
            }
        };

        serde_json::to_value(&response).unwrap_or_else(|e| {
            log::error!("failed to encode response: {e}");
            serde_json::json!({"ok": false, "error": e.to_string()})
        })
    }

    /// Storage flags last reported for `domain`, if any.
    pub fn storage_for(&self, domain: &str) -> Option<StorageFlags> {
        self.storage_signals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(strip_www_prefix(domain))
            .copied()
    }

    fn record_storage(&self, domain: &str, flags: StorageFlags) {
        let key = strip_www_prefix(&domain.trim().to_ascii_lowercase()).to_string();
        if key.is_empty() {
            return;
        }
        self.storage_signals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, flags);
    }

    async fn state(&self, ctx: &RequestContext, force: bool) -> StateResponse {
        match self.try_state(ctx, force).await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("state request failed, answering with empty state: {e}");
                StateResponse::empty()
            }
        }
    }

    async fn try_state(&self, ctx: &RequestContext, force: bool) -> Result<StateResponse, GuardError> {
        let url = ctx.url().to_string();
        let domain = domain_key(&url, self.config.strip_www);

        let policy = if domain.is_empty() {
            Policy::default()
        } else {
            self.policies.try_get(&domain).await?
        };

        let live = match Url::parse(&url) {
            Ok(parsed) if is_http_url(&url) => self.list_cookies(&parsed, force).await,
            _ => Vec::new(),
        };
        let cookies = merge_remembered(live, &policy);
        let storage = self.storage_for(&domain);

        Ok(StateResponse { url, domain, policy, cookies, storage })
    }

    async fn list_cookies(&self, url: &Url, force: bool) -> Vec<Cookie> {
        if !force {
            // an empty cached answer may be stale right after navigation
            if let Some(cookies) = self.cookies.cached(url).filter(|c| !c.is_empty()) {
                log::debug!("cookie cache hit for {url}");
                return cookies;
            }
        }

        let listed = self.cookies.list_fresh(url).await;

        listed.unwrap_or_else(|e| {
            log::warn!("cookie enumeration for {url} failed: {e}");
            Vec::new()
        })
    }
}

/// Appends a `present == false` entry for every blocked name with no live
/// cookie, so blocked cookies stay visible after removal.
fn merge_remembered(mut live: Vec<Cookie>, policy: &Policy) -> Vec<Cookie> {
    let present: HashSet<&str> = live.iter().map(|c| c.name.as_str()).collect();
    let remembered: Vec<Cookie> = policy
        .blocked_cookies
        .iter()
        .filter(|name| !present.contains(name.as_str()))
        .map(|name| Cookie::remembered(name.as_str()))
        .collect();
    live.extend(remembered);
    live
}

fn ack(result: Result<(), GuardError>) -> Ack {
    match result {
        Ok(()) => Ack::ok(),
        Err(e) => {
            log::warn!("request failed: {e}");
            Ack::failed(e)
        }
    }
}
