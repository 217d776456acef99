use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::GuardError;

/// Longest reason text a classification may carry, in characters.
pub const MAX_REASON_CHARS: usize = 140;

/// Purpose category of a cookie.
///
/// The declaration order is the display priority:
/// `Necessary < Functional < Analytics < Advertising < Unknown`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Necessary,
    Functional,
    Analytics,
    Advertising,
    Unknown,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Necessary,
        Category::Functional,
        Category::Analytics,
        Category::Advertising,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Necessary => "Necessary",
            Category::Functional => "Functional",
            Category::Analytics => "Analytics",
            Category::Advertising => "Advertising",
            Category::Unknown => "Unknown",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GuardError::OverlayMalformed(format!("unknown category {s:?}")))
    }
}

/// A category plus a short human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub reason: String,
}

impl Classification {
    /// Builds a classification, rejecting empty or over-long reasons.
    pub fn try_new(category: Category, reason: impl Into<String>) -> Result<Self, GuardError> {
        let reason = reason.into().trim().to_string();
        if reason.is_empty() {
            return Err(GuardError::OverlayMalformed("empty reason".into()));
        }
        let len = reason.chars().count();
        if len > MAX_REASON_CHARS {
            return Err(GuardError::OverlayMalformed(format!(
                "reason is {len} chars (max {MAX_REASON_CHARS})"
            )));
        }
        Ok(Self { category, reason })
    }
}
