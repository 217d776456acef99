//! Heuristic cookie classifier.
//!
//! [`RULES`] is an ordered list of (predicate, result) pairs tested against
//! the lower-cased cookie name. Evaluation is top to bottom and the first match
//! wins. The order is part of the contract:
//!
//! 1. cart / checkout / shop platform cookies → Functional
//! 2. payment processor cookies → Necessary
//! 3. bot protection cookies → Necessary
//! 4. consent tracking cookies → Functional
//! 5. analytics prefixes → Analytics
//! 6. ad network prefixes (Meta, Microsoft, TikTok, Pinterest) → Advertising
//! 7. session replay / performance tracing → Analytics
//! 8. session / auth names → Necessary
//! 9. locale / preference names → Functional
//!
//! Payment and bot-protection rules sit above the generic session rule because
//! names like `__stripe_sid` would otherwise be read as a login session. New
//! rules must be inserted at the position that keeps these precedences.

use crate::classify::{Category, Classification};
use crate::cookies::Cookie;

/// A single heuristic rule.
pub struct Rule {
    /// Short identifier, used in logs and tests.
    pub id: &'static str,
    matches: fn(&str) -> bool,
    pub category: Category,
    pub reason: &'static str,
}

impl Rule {
    pub fn matches(&self, lower_name: &str) -> bool {
        (self.matches)(lower_name)
    }

    fn classification(&self) -> Classification {
        Classification {
            category: self.category,
            reason: self.reason.to_string(),
        }
    }
}

/// Reason used when no rule matches.
pub const UNKNOWN_REASON: &str = "Purpose unclear. Likely a site preference or tracker.";

pub static RULES: &[Rule] = &[
    Rule {
        id: "cart",
        matches: is_cart,
        category: Category::Functional,
        reason: "Remembers your cart and checkout so items stay put.",
    },
    Rule {
        id: "payment",
        matches: is_payment,
        category: Category::Necessary,
        reason: "Secure payments and fraud checks during checkout.",
    },
    Rule {
        id: "bot-protection",
        matches: is_bot_protection,
        category: Category::Necessary,
        reason: "Bot protection to keep the site available.",
    },
    Rule {
        id: "consent",
        matches: is_consent,
        category: Category::Functional,
        reason: "Saves your cookie consent choices.",
    },
    Rule {
        id: "analytics",
        matches: is_analytics,
        category: Category::Analytics,
        reason: "Measures which pages are visited and for how long.",
    },
    Rule {
        id: "ads-meta",
        matches: is_meta_ads,
        category: Category::Advertising,
        reason: "Helps show ads for this site on Facebook or Instagram.",
    },
    Rule {
        id: "ads-microsoft",
        matches: is_microsoft_ads,
        category: Category::Advertising,
        reason: "Helps show ads for this site on Microsoft/Bing.",
    },
    Rule {
        id: "ads-tiktok",
        matches: is_tiktok_ads,
        category: Category::Advertising,
        reason: "Helps show ads for this site on TikTok.",
    },
    Rule {
        id: "ads-pinterest",
        matches: is_pinterest_ads,
        category: Category::Advertising,
        reason: "Helps show ads for this site on Pinterest.",
    },
    Rule {
        id: "session-replay",
        matches: is_session_replay,
        category: Category::Analytics,
        reason: "Records clicks or performance to improve the site.",
    },
    Rule {
        id: "session",
        matches: is_session,
        category: Category::Necessary,
        reason: "Keeps you signed in and remembers your session.",
    },
    Rule {
        id: "preferences",
        matches: is_preference,
        category: Category::Functional,
        reason: "Remembers language or display preferences.",
    },
];

/// Classifies `cookie` by name. Pure, total and deterministic.
pub fn classify(cookie: &Cookie) -> Classification {
    classify_name(&cookie.name)
}

/// Classifies a bare cookie name.
pub fn classify_name(name: &str) -> Classification {
    matching_rule(name)
        .map(Rule::classification)
        .unwrap_or_else(|| Classification {
            category: Category::Unknown,
            reason: UNKNOWN_REASON.to_string(),
        })
}

/// Returns the first rule that matches `name`, if any.
pub fn matching_rule(name: &str) -> Option<&'static Rule> {
    let lower = name.to_lowercase();
    RULES.iter().find(|rule| rule.matches(&lower))
}

fn is_cart(n: &str) -> bool {
    n.starts_with("_shopify")
        || n.contains("shopify")
        || ["cart", "cart_sig", "cart_ts", "cart_currency", "checkout_token"]
            .iter()
            .any(|x| n.contains(x))
}

fn is_payment(n: &str) -> bool {
    n.contains("stripe") || n == "__stripe_mid" || n == "__stripe_sid"
}

fn is_bot_protection(n: &str) -> bool {
    n == "__cf_bm" || n.contains("cf_bm") || n.contains("cloudflare")
}

fn is_consent(n: &str) -> bool {
    n.contains("optanon") || n.contains("euconsent") || n.contains("consent") || n.starts_with("cookieconsent")
}

fn is_analytics(n: &str) -> bool {
    n.starts_with("_ga") || n.starts_with("_gid") || n.starts_with("_gcl") || n.contains("analytics")
}

fn is_meta_ads(n: &str) -> bool {
    n == "_fbp" || n.contains("fbp") || n == "_fbc"
}

fn is_microsoft_ads(n: &str) -> bool {
    n.starts_with("_uet") || n == "_uetsid" || n == "_uetvid"
}

fn is_tiktok_ads(n: &str) -> bool {
    n.contains("_ttp") || n.contains("tt_")
}

fn is_pinterest_ads(n: &str) -> bool {
    n.contains("_pin_unauth") || n.contains("_pinterest_sess")
}

fn is_session_replay(n: &str) -> bool {
    n.contains("hotjar")
        || n.starts_with("_hj")
        || n.contains("clarity")
        || n.contains("_clck")
        || n.contains("datadog")
        || n.starts_with("__dd")
        || n.contains("trace")
}

fn is_session(n: &str) -> bool {
    n.contains("session") || n == "sid" || n.ends_with("_sid") || n.contains("auth")
}

fn is_preference(n: &str) -> bool {
    n.contains("pref") || n.contains("lang") || n.contains("locale")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MAX_REASON_CHARS;

    fn cat(name: &str) -> Category {
        classify_name(name).category
    }

    #[test]
    fn known_names() {
        assert_eq!(cat("cart_sig"), Category::Functional);
        assert_eq!(cat("_shopify_y"), Category::Functional);
        assert_eq!(cat("__stripe_mid"), Category::Necessary);
        assert_eq!(cat("__cf_bm"), Category::Necessary);
        assert_eq!(cat("OptanonConsent"), Category::Functional);
        assert_eq!(cat("_ga_1234"), Category::Analytics);
        assert_eq!(cat("_gcl_au"), Category::Analytics);
        assert_eq!(cat("_fbp"), Category::Advertising);
        assert_eq!(cat("_uetvid"), Category::Advertising);
        assert_eq!(cat("_ttp"), Category::Advertising);
        assert_eq!(cat("_pin_unauth"), Category::Advertising);
        assert_eq!(cat("_hjSessionUser_1"), Category::Analytics);
        assert_eq!(cat("session_id"), Category::Necessary);
        assert_eq!(cat("__Secure-auth_session"), Category::Necessary);
        assert_eq!(cat("sid"), Category::Necessary);
        assert_eq!(cat("user_lang"), Category::Functional);
        assert_eq!(cat("zz_random"), Category::Unknown);
    }

    #[test]
    fn payment_wins_over_session() {
        // contains "_sid", which the session rule would also accept
        let rule = matching_rule("__stripe_sid").unwrap();
        assert_eq!(rule.id, "payment");
        assert_eq!(classify_name("__stripe_sid").reason, "Secure payments and fraud checks during checkout.");
    }

    #[test]
    fn replay_tools_win_over_session() {
        // Hotjar's session cookie is analytics, not a login session
        assert_eq!(matching_rule("_hjSession_42").unwrap().id, "session-replay");
    }

    #[test]
    fn unknown_falls_through_with_generic_reason() {
        let c = classify(&Cookie::new("xyz", "a.test"));
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.reason, UNKNOWN_REASON);
    }

    #[test]
    fn every_reason_fits_and_classify_is_pure() {
        for rule in RULES {
            assert!(rule.reason.chars().count() <= MAX_REASON_CHARS, "rule {}", rule.id);
        }
        assert!(UNKNOWN_REASON.chars().count() <= MAX_REASON_CHARS);

        let cookie = Cookie::new("_gid", "a.test");
        assert_eq!(classify(&cookie), classify(&cookie));
    }
}
