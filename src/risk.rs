//! Risk policy for block actions.
//!
//! Blocking a cookie can sign the user out or break the site. A pending
//! **block** is risky when:
//!
//! - its classification is [`Category::Necessary`], or
//! - its name looks login/session related, or
//! - its classification reason looks login/session related (this catches
//!   overlay reasons that mention sessions under another category).
//!
//! "Looks login/session related" is a case-insensitive match on `session`,
//! `auth`, `login`, or `sid` followed by a word boundary.
//!
//! Unblocking is never risky. Risky blocks must go through a [`Confirmer`]
//! before the enforcement engine is invoked.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::classify::{Category, Classification};
use crate::cookies::Cookie;

lazy_static! {
    static ref LOGIN_PATTERN: Regex = Regex::new(r"(?i)session|sid\b|auth|login").expect("valid login pattern");
}

/// The transition a user asked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockAction {
    Block,
    Unblock,
}

impl BlockAction {
    pub fn from_block_flag(block: bool) -> Self {
        if block { BlockAction::Block } else { BlockAction::Unblock }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, BlockAction::Block)
    }
}

/// True when `text` mentions sessions, auth, login or a `sid` token.
pub fn looks_login_related(text: &str) -> bool {
    LOGIN_PATTERN.is_match(text)
}

/// Whether blocking `cookie` (classified as `classification`) is risky.
pub fn is_risky(cookie: &Cookie, classification: &Classification) -> bool {
    classification.category == Category::Necessary
        || looks_login_related(&cookie.name)
        || looks_login_related(&classification.reason)
}

/// Whether performing `action` on `cookie` needs confirmation.
pub fn requires_confirmation(action: BlockAction, cookie: &Cookie, classification: &Classification) -> bool {
    action.is_block() && is_risky(cookie, classification)
}

/// Risk assessment of a batch block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRisk {
    /// Names of the risky members, in input order.
    pub risky: Vec<String>,
    /// Number of cookies in the batch.
    pub total: usize,
}

impl BatchRisk {
    /// Assesses a batch of `(cookie, classification)` pairs for `action`.
    pub fn assess<'a, I>(action: BlockAction, items: I) -> Self
    where
        I: IntoIterator<Item = (&'a Cookie, &'a Classification)>,
    {
        let mut risky = Vec::new();
        let mut total = 0;
        for (cookie, classification) in items {
            total += 1;
            if requires_confirmation(action, cookie, classification) {
                risky.push(cookie.name.clone());
            }
        }
        Self { risky, total }
    }

    /// A batch is risky as a whole if any member is.
    pub fn is_risky(&self) -> bool {
        !self.risky.is_empty()
    }

    pub fn risky_count(&self) -> usize {
        self.risky.len()
    }
}

/// Prompt text for blocking a single risky cookie.
pub fn single_confirmation(name: &str, domain: &str) -> String {
    format!("Turn off “{name}” on {domain}?")
}

/// Prompt text for a batch block with `risky_count` risky members.
pub fn batch_confirmation(risky_count: usize, domain: &str) -> String {
    format!("Turn off {risky_count} sign-in/session cookies on {domain}?")
}

/// The UI collaborator that presents a yes/no prompt.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Resolves to `true` only on an affirmative answer.
    async fn confirm(&self, message: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn risky(name: &str) -> bool {
        let cookie = Cookie::new(name, "a.test");
        is_risky(&cookie, &classify(&cookie))
    }

    #[test]
    fn session_names_are_risky() {
        assert!(risky("session_id"));
        assert!(risky("__Secure-auth_session"));
        assert!(risky("LOGIN_TOKEN"));
        assert!(risky("sid"));
        assert!(risky("user.sid"));
    }

    #[test]
    fn sid_needs_a_boundary() {
        assert!(!looks_login_related("sidebar_state"));
        assert!(!looks_login_related("inside"));
        assert!(looks_login_related("x-sid"));
    }

    #[test]
    fn analytics_cookie_is_not_risky() {
        let cookie = Cookie::new("_ga_1234", "a.test");
        let classification = Classification { category: Category::Analytics, reason: classify(&cookie).reason };
        assert!(!is_risky(&cookie, &classification));
    }

    #[test]
    fn necessary_is_risky_regardless_of_name() {
        let cookie = Cookie::new("zz_plain", "a.test");
        let classification = Classification { category: Category::Necessary, reason: "Bot protection.".into() };
        assert!(is_risky(&cookie, &classification));
    }

    #[test]
    fn reason_text_can_make_a_cookie_risky() {
        let cookie = Cookie::new("zz_plain", "a.test");
        let classification = Classification { category: Category::Functional, reason: "Keeps your Session alive.".into() };
        assert!(is_risky(&cookie, &classification));
    }

    #[test]
    fn unblock_never_needs_confirmation() {
        let cookie = Cookie::new("session_id", "a.test");
        let c = classify(&cookie);
        assert!(requires_confirmation(BlockAction::Block, &cookie, &c));
        assert!(!requires_confirmation(BlockAction::Unblock, &cookie, &c));
    }

    #[test]
    fn batch_counts_risky_members() {
        let cookies = [Cookie::new("_ga_1", "shop.example"), Cookie::new("session_tok", "shop.example")];
        let classes: Vec<_> = cookies.iter().map(classify).collect();

        let risk = BatchRisk::assess(BlockAction::Block, cookies.iter().zip(classes.iter()));
        assert!(risk.is_risky());
        assert_eq!(risk.risky_count(), 1);
        assert_eq!(risk.total, 2);
        assert_eq!(risk.risky, vec!["session_tok".to_string()]);
        assert_eq!(
            batch_confirmation(risk.risky_count(), "shop.example"),
            "Turn off 1 sign-in/session cookies on shop.example?"
        );

        let unblock = BatchRisk::assess(BlockAction::Unblock, cookies.iter().zip(classes.iter()));
        assert!(!unblock.is_risky());
    }

    #[test]
    fn single_prompt_names_cookie_and_domain() {
        assert_eq!(single_confirmation("sid", "a.test"), "Turn off “sid” on a.test?");
    }
}
