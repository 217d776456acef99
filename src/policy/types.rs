use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Per-domain block policy.
///
/// The domain is the key under which the policy is stored, not a field.
/// `blocked_cookies` is a set: a name appears at most once, and unblocking
/// removes it entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub blocked_cookies: BTreeSet<String>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self, name: &str) -> bool {
        self.blocked_cookies.contains(name)
    }

    /// Adds `names` to the blocked set. Idempotent.
    pub fn block<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_cookies.extend(names.into_iter().map(Into::into));
    }

    /// Removes `names` from the blocked set. Idempotent.
    pub fn unblock<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.blocked_cookies.remove(name.as_ref());
        }
    }

    /// Applies a block (`true`) or unblock (`false`) of `names`.
    pub fn apply(&mut self, names: &[String], block: bool) {
        if block {
            self.block(names.iter().cloned());
        } else {
            self.unblock(names);
        }
    }
}
