//! Cookie source abstraction.
//!
//! A **cookie source** is the browser's cookie API as seen by the guard: it
//! enumerates the cookies visible for a URL and removes a cookie by name.
//! Both calls may suspend and both may fail; callers decide how to degrade.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::cookies::Cookie;

/// Enumeration/removal capability keyed by URL + name.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
#[async_trait]
pub trait CookieSource: Send + Sync {
    /// Returns all cookies that would be sent to `url`.
    async fn list(&self, url: &Url) -> anyhow::Result<Vec<Cookie>>;

    /// Removes the cookie called `name` that applies to `url`.
    ///
    /// Removing a cookie that does not exist is not an error.
    async fn remove(&self, url: &Url, name: &str) -> anyhow::Result<()>;
}

/// A reference-counted pointer to a type-erased [`CookieSource`].
pub type CookieSourceHandle = Arc<dyn CookieSource>;
