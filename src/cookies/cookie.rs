//! Cookie snapshot type.
//!
//! A [`Cookie`] is an immutable snapshot handed to the engine by the cookie
//! source. The engine never owns live cookies; it only reads these records,
//! classifies them and asks the source to remove them by name.
//!
//! Field names serialize in camelCase so the snapshot can be passed to the UI
//! shell unchanged:
//!
//! ```rust
//! use gosub_cookie_guard::cookies::{Cookie, SameSite};
//!
//! let c = Cookie {
//!     name: "cart_sig".into(),
//!     domain: "shop.example".into(),
//!     present: true,
//!     size: 40,
//!     secure: true,
//!     http_only: false,
//!     same_site: SameSite::Lax,
//!     expiry: Some("2026-12-31T23:59:59Z".into()),
//! };
//! let json = serde_json::to_value(&c).unwrap();
//! assert_eq!(json["httpOnly"], false);
//! assert_eq!(json["sameSite"], "lax");
//! ```

use serde::{Deserialize, Serialize};

/// SameSite policy as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    NoRestriction,
    Lax,
    Strict,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SameSite::NoRestriction => write!(f, "None"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Unspecified => write!(f, "Unspecified"),
        }
    }
}

/// A cookie as seen by the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name (case-sensitive, unique within a domain's cookie set).
    pub name: String,

    /// Domain attribute. Empty for cookies only remembered from a policy.
    #[serde(default)]
    pub domain: String,

    /// `true` when the cookie is currently set, `false` when it is only
    /// remembered because a policy blocks it.
    #[serde(default = "present_default")]
    pub present: bool,

    /// Size in bytes (name plus value).
    #[serde(default)]
    pub size: usize,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    #[serde(default)]
    pub same_site: SameSite,

    /// Expiration as reported by the source. Session cookies have `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

fn present_default() -> bool {
    true
}

impl Cookie {
    /// A live cookie with default attributes.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            present: true,
            size: 0,
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiry: None,
        }
    }

    /// A placeholder for a blocked name that currently has no live cookie.
    pub fn remembered(name: impl Into<String>) -> Self {
        Self {
            present: false,
            ..Self::new(name, "")
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_flags(mut self, secure: bool, http_only: bool) -> Self {
        self.secure = secure;
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn with_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry = Some(expiry.into());
        self
    }

    /// True when this cookie applies to `host`: an exact match, or a
    /// subdomain match on the (dot-stripped) domain attribute.
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        if domain.is_empty() {
            return false;
        }
        host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }
}
