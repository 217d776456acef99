//! Enforcement engine.
//!
//! The only writer of the [`PolicyStore`]. A block-list request:
//!
//! 1. reads the domain's current policy,
//! 2. adds (block) or removes (unblock) the requested names,
//! 3. persists the updated policy,
//! 4. removes any live cookie with those names (failures are logged only),
//! 5. refreshes the badge of the tab the request came from.
//!
//! If step 3 fails nothing is removed and the error is returned. Requests for
//! the same domain run one after another behind a per-domain async lock, so
//! overlapping requests never lose an update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use url::Url;

use crate::badge::BadgeSynchronizer;
use crate::config::GuardConfig;
use crate::cookies::CookieSourceHandle;
use crate::domain::{strip_www_prefix, url_for_domain};
use crate::errors::GuardError;
use crate::policy::{Policy, PolicyStore};
use crate::tabs::TabInfo;

type DomainLock = Arc<tokio::sync::Mutex<()>>;

pub struct EnforcementEngine {
    policies: Arc<PolicyStore>,
    cookies: CookieSourceHandle,
    badges: Arc<BadgeSynchronizer>,
    /// Same key derivation as the state read path.
    strip_www: bool,
    locks: Mutex<HashMap<String, DomainLock>>,
}

impl EnforcementEngine {
    pub fn new(
        policies: Arc<PolicyStore>,
        cookies: CookieSourceHandle,
        badges: Arc<BadgeSynchronizer>,
        config: &GuardConfig,
    ) -> Self {
        Self {
            policies,
            cookies,
            badges,
            strip_www: config.strip_www,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks (`block == true`) or unblocks `names` on `domain`.
    ///
    /// `tab` is the tab the request came from; its URL is used for cookie
    /// removal when it belongs to `domain`, and its badge is refreshed.
    /// Returns the policy as persisted.
    pub async fn apply_block_list(
        &self,
        domain: &str,
        names: &[String],
        block: bool,
        tab: Option<&TabInfo>,
    ) -> Result<Policy, GuardError> {
        let domain = normalize(domain, self.strip_www)?;
        let names: Vec<String> = names.iter().filter(|n| !n.is_empty()).cloned().collect();

        let lock = self.domain_lock(&domain);
        let _guard = lock.lock().await;

        let mut policy = self
            .policies
            .try_get(&domain)
            .await
            .map_err(|e| GuardError::PersistenceWrite {
                domain: domain.clone(),
                source: anyhow::Error::new(e),
            })?;
        policy.apply(&names, block);
        self.policies.set(&domain, policy.clone()).await?;

        log::debug!(
            "{} {} cookie name(s) on '{domain}', {} blocked in total",
            if block { "blocked" } else { "unblocked" },
            names.len(),
            policy.blocked_cookies.len()
        );

        if let Some(url) = removal_url(&domain, tab) {
            let removals = names.iter().map(|name| self.cookies.remove(&url, name));
            for (name, result) in names.iter().zip(join_all(removals).await) {
                if let Err(e) = result {
                    log::warn!("removing cookie '{name}' from {url} failed: {e}");
                }
            }
        }

        self.refresh_badge(tab).await;
        Ok(policy)
    }

    /// Deletes the whole policy for `domain`, unblocking every name.
    pub async fn clear_domain(&self, domain: &str, tab: Option<&TabInfo>) -> Result<(), GuardError> {
        let domain = normalize(domain, self.strip_www)?;

        let lock = self.domain_lock(&domain);
        let _guard = lock.lock().await;

        self.policies.remove(&domain).await?;
        log::debug!("cleared policy for '{domain}'");

        self.refresh_badge(tab).await;
        Ok(())
    }

    async fn refresh_badge(&self, tab: Option<&TabInfo>) {
        if let Some(tab) = tab {
            self.badges.refresh(tab.id, tab.url.as_deref()).await;
        }
    }

    /// Returns the lock for `domain`, dropping locks nobody holds.
    fn domain_lock(&self, domain: &str) -> DomainLock {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(domain.to_string()).or_default().clone()
    }
}

/// Lowercased, trimmed policy key; `www.` is dropped when `strip_www` is set.
fn normalize(domain: &str, strip_www: bool) -> Result<String, GuardError> {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return Err(GuardError::InvalidUrl("empty domain".into()));
    }
    if strip_www {
        return Ok(strip_www_prefix(&domain).to_string());
    }
    Ok(domain)
}

/// The tab's URL when it is on `domain`, else `https://{domain}/`.
fn removal_url(domain: &str, tab: Option<&TabInfo>) -> Option<Url> {
    let from_tab = tab
        .and_then(|t| t.url.as_deref())
        .and_then(|u| Url::parse(u).ok())
        .filter(|u| {
            u.host_str()
                .map(|h| h.eq_ignore_ascii_case(domain) || h.to_ascii_lowercase().ends_with(&format!(".{domain}")))
                .unwrap_or(false)
        });

    from_tab.or_else(|| url_for_domain(domain))
}
