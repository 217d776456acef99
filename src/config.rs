//! Guard configuration.
//!
//! `GuardConfig` controls the badge appearance, the time bounds on platform
//! and overlay calls, and how policy domain keys are derived.
//!
//! `GuardConfig` provides sensible defaults via [`Default`] and a fluent
//! [`GuardConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_cookie_guard::config::GuardConfig;
//! let cfg = GuardConfig::default();
//! assert_eq!(cfg.badge_cap, 99);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use std::time::Duration;
//! use gosub_cookie_guard::config::GuardConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = GuardConfig::builder()
//!     .badge_cap(999)
//!     .badge_background_hex("#1d4ed8")?
//!     .overlay_timeout(Duration::from_millis(1500))
//!     .strip_www(true)
//!     .build()?; // returns Result<GuardConfig, GuardConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `badge_cap`: Largest count shown verbatim; larger counts show as `"{cap}+"` (default: 99).
//! - `badge_background`: Badge background color, RGBA (default: `#ef4444`).
//! - `badge_text_color`: Badge text color, RGBA (default: `#ffffff`).
//! - `overlay_timeout`: Upper bound for one overlay classification (default: 3s).
//! - `state_cache_ttl`: How long `GET_STATE` may reuse an enumeration (default: 2s).
//! - `strip_www`: Strip a leading `www.` when deriving policy domain keys (default: `false`).
//! - `policy_storage_key`: Key under which the domain→policy map is persisted (default: `"policies"`).
//!
//! # Errors
//!
//! Builder validation can return [`GuardConfigError`] if values are invalid
//! (e.g. `badge_cap == 0`, a zero overlay timeout or an empty storage key).

use std::fmt;
use std::time::Duration;

/// RGBA color, as used by the badge renderer.
pub type Rgba = [u8; 4];

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub badge_cap: usize,
    pub badge_background: Rgba,
    pub badge_text_color: Rgba,
    pub overlay_timeout: Duration,
    pub state_cache_ttl: Duration,
    pub strip_www: bool,
    pub policy_storage_key: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            badge_cap: 99,
            badge_background: [0xef, 0x44, 0x44, 0xff],
            badge_text_color: [0xff, 0xff, 0xff, 0xff],
            overlay_timeout: Duration::from_secs(3),
            state_cache_ttl: Duration::from_secs(2),
            strip_www: false,
            policy_storage_key: "policies".to_string(),
        }
    }
}

impl GuardConfig {
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::default()
    }
}

/// Builder for [`GuardConfig`].
#[derive(Debug, Clone, Default)]
pub struct GuardConfigBuilder {
    inner: GuardConfig,
}

impl GuardConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut GuardConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn badge_cap(self, cap: usize) -> Self { self.map(|c| c.badge_cap = cap) }
    pub fn badge_background(self, rgba: Rgba) -> Self { self.map(|c| c.badge_background = rgba) }
    pub fn badge_text_color(self, rgba: Rgba) -> Self { self.map(|c| c.badge_text_color = rgba) }
    pub fn overlay_timeout(self, d: Duration) -> Self { self.map(|c| c.overlay_timeout = d) }
    pub fn state_cache_ttl(self, d: Duration) -> Self { self.map(|c| c.state_cache_ttl = d) }
    pub fn strip_www(self, on: bool) -> Self { self.map(|c| c.strip_www = on) }
    pub fn policy_storage_key<S: Into<String>>(self, key: S) -> Self { self.map(|c| c.policy_storage_key = key.into()) }

    pub fn badge_background_hex(self, hex: &str) -> Result<Self, GuardConfigError> {
        let rgba = parse_hex_color(hex)?;
        Ok(self.badge_background(rgba))
    }

    pub fn badge_text_color_hex(self, hex: &str) -> Result<Self, GuardConfigError> {
        let rgba = parse_hex_color(hex)?;
        Ok(self.badge_text_color(rgba))
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut GuardConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<GuardConfig, GuardConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

/// Parses `#rrggbb` or `#rrggbbaa` into RGBA. Alpha defaults to opaque.
pub fn parse_hex_color(hex: &str) -> Result<Rgba, GuardConfigError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return Err(GuardConfigError::InvalidColor(hex.to_string()));
    }

    let mut rgba = [0xff_u8; 4];
    for (i, chunk) in digits.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).map_err(|_| GuardConfigError::InvalidColor(hex.to_string()))?;
        rgba[i] = u8::from_str_radix(pair, 16).map_err(|_| GuardConfigError::InvalidColor(hex.to_string()))?;
    }
    Ok(rgba)
}

// ---------- Validation ----------

#[derive(Debug, Clone)]
pub enum GuardConfigError {
    ZeroBadgeCap,
    ZeroOverlayTimeout,
    EmptyStorageKey,
    InvalidColor(String),
}

impl fmt::Display for GuardConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardConfigError::ZeroBadgeCap =>
                write!(f, "badge_cap must be at least 1"),
            GuardConfigError::ZeroOverlayTimeout =>
                write!(f, "overlay_timeout must be non-zero"),
            GuardConfigError::EmptyStorageKey =>
                write!(f, "policy_storage_key must not be empty"),
            GuardConfigError::InvalidColor(s) =>
                write!(f, "color {s:?} is not a #rrggbb or #rrggbbaa value"),
        }
    }
}
impl std::error::Error for GuardConfigError {}

fn validate(c: &GuardConfig) -> Result<(), GuardConfigError> {
    if c.badge_cap == 0 {
        return Err(GuardConfigError::ZeroBadgeCap);
    }
    if c.overlay_timeout.is_zero() {
        return Err(GuardConfigError::ZeroOverlayTimeout);
    }
    if c.policy_storage_key.trim().is_empty() {
        return Err(GuardConfigError::EmptyStorageKey);
    }
    Ok(())
}
