//! Optional overlay classification.
//!
//! An overlay is an external text-classification capability (typically a
//! language model) that may refine the heuristic result. It is never
//! authoritative:
//!
//! - every call runs under a timeout; a late answer is abandoned,
//! - the reply must name a category from the closed set and carry a reason
//!   of at most [`MAX_REASON_CHARS`] characters,
//! - on any failure the heuristic [`classify`](super::classify) result is used
//!   and the failure is only logged.
//!
//! Accepted replies are cached per `(domain, name)` for the lifetime of the
//! [`OverlayClassifier`], which is one popup session.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::classify::{classify, Category, Classification, MAX_REASON_CHARS};
use crate::cookies::Cookie;
use crate::errors::GuardError;

/// Bounded-latency classification capability.
#[async_trait]
pub trait ClassificationOverlay: Send + Sync {
    /// Returns the raw reply: either a JSON object or a JSON string holding one.
    async fn complete(&self, prompt: &OverlayPrompt) -> anyhow::Result<Value>;
}

/// The cookie attributes the overlay is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayPrompt {
    pub name: String,
    pub domain: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
    pub expiry: Option<String>,
}

impl OverlayPrompt {
    pub fn for_cookie(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            domain: cookie.domain.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site.to_string(),
            expiry: cookie.expiry.clone(),
        }
    }

    /// Prompt text sent to the capability.
    pub fn render(&self) -> String {
        let categories = Category::ALL.map(|c| c.as_str()).join(", ");
        format!(
            "Return JSON only.\n\
             Explain what this cookie does in <={MAX_REASON_CHARS} chars for a regular shopper. \
             Also give a category from: {categories}.\n\
             name: {}\n\
             domain: {}\n\
             secure: {}\n\
             httpOnly: {}\n\
             sameSite: {}\n\
             expiresIn: {}",
            self.name,
            self.domain,
            self.secure,
            self.http_only,
            self.same_site,
            self.expiry.as_deref().unwrap_or("session"),
        )
    }

    /// JSON schema the reply must satisfy.
    pub fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": { "enum": Category::ALL.map(|c| c.as_str()) },
                "reason": { "type": "string", "maxLength": MAX_REASON_CHARS },
            },
            "required": ["category", "reason"],
            "additionalProperties": false,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OverlayReply {
    category: String,
    reason: String,
}

/// Validates a raw overlay reply against the closed category set and the
/// reason length limit.
pub fn parse_overlay_reply(reply: Value) -> Result<Classification, GuardError> {
    let reply = match reply {
        Value::String(text) => serde_json::from_str::<Value>(text.trim())
            .map_err(|e| GuardError::OverlayMalformed(format!("reply is not JSON: {e}")))?,
        other => other,
    };

    let parsed: OverlayReply = serde_json::from_value(reply)
        .map_err(|e| GuardError::OverlayMalformed(e.to_string()))?;
    let category: Category = parsed.category.parse()?;
    Classification::try_new(category, parsed.reason)
}

/// "Try overlay, else heuristic" combinator.
pub struct OverlayClassifier {
    overlay: Option<Arc<dyn ClassificationOverlay>>,
    timeout: Duration,
    cache: RwLock<HashMap<(String, String), Classification>>,
}

impl OverlayClassifier {
    pub fn new(overlay: Arc<dyn ClassificationOverlay>, timeout: Duration) -> Self {
        Self {
            overlay: Some(overlay),
            timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// A classifier without an overlay; always answers with the heuristic.
    pub fn heuristic_only() -> Self {
        Self {
            overlay: None,
            timeout: Duration::ZERO,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Classifies `cookie`, preferring a valid overlay answer. Never fails.
    pub async fn classify(&self, cookie: &Cookie) -> Classification {
        if self.overlay.is_none() {
            return classify(cookie);
        }

        match self.try_overlay(cookie).await {
            Ok(classification) => classification,
            Err(e) => {
                log::warn!("overlay classification for '{}' failed, using heuristic: {e}", cookie.name);
                classify(cookie)
            }
        }
    }

    /// Returns a previously accepted overlay answer for `cookie`, if any.
    pub fn cached(&self, cookie: &Cookie) -> Option<Classification> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key(cookie))
            .cloned()
    }

    /// Asks the overlay only. Errors describe why the overlay was not used.
    pub async fn try_overlay(&self, cookie: &Cookie) -> Result<Classification, GuardError> {
        if let Some(hit) = self.cached(cookie) {
            return Ok(hit);
        }

        let overlay = self
            .overlay
            .as_ref()
            .ok_or_else(|| GuardError::OverlayUnavailable("no overlay configured".into()))?;

        let prompt = OverlayPrompt::for_cookie(cookie);
        let reply = tokio::time::timeout(self.timeout, overlay.complete(&prompt))
            .await
            .map_err(|_| GuardError::OverlayTimeout(self.timeout))?
            .map_err(|e| GuardError::OverlayUnavailable(e.to_string()))?;

        let classification = parse_overlay_reply(reply)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key(cookie), classification.clone());

        Ok(classification)
    }
}

fn cache_key(cookie: &Cookie) -> (String, String) {
    (cookie.domain.to_ascii_lowercase(), cookie.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: Value,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: Value) -> Arc<Self> {
            Arc::new(Self { reply, delay: Duration::ZERO, calls: AtomicUsize::new(0) })
        }

        fn slow(reply: Value, delay: Duration) -> Arc<Self> {
            Arc::new(Self { reply, delay, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl ClassificationOverlay for Scripted {
        async fn complete(&self, _prompt: &OverlayPrompt) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl ClassificationOverlay for Broken {
        async fn complete(&self, _prompt: &OverlayPrompt) -> anyhow::Result<Value> {
            anyhow::bail!("model not downloaded")
        }
    }

    fn ga() -> Cookie {
        Cookie::new("_ga", "shop.example")
    }

    #[tokio::test]
    async fn accepted_reply_overrides_heuristic_and_is_cached() {
        let overlay = Scripted::new(json!({"category": "Functional", "reason": "Keeps your basket."}));
        let classifier = OverlayClassifier::new(overlay.clone(), Duration::from_secs(1));

        let first = classifier.classify(&ga()).await;
        assert_eq!(first.category, Category::Functional);
        assert_eq!(first.reason, "Keeps your basket.");

        let second = classifier.classify(&ga()).await;
        assert_eq!(first, second);
        assert_eq!(overlay.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn string_replies_are_parsed() {
        let overlay = Scripted::new(Value::String(r#" {"category":"Advertising","reason":"Ad id."} "#.into()));
        let classifier = OverlayClassifier::new(overlay, Duration::from_secs(1));
        assert_eq!(classifier.classify(&ga()).await.category, Category::Advertising);
    }

    #[tokio::test]
    async fn malformed_replies_fall_back() {
        for reply in [
            json!({"category": "Marketing", "reason": "x"}),
            json!({"category": "Analytics"}),
            json!({"category": "Analytics", "reason": "x", "extra": 1}),
            json!({"category": "Analytics", "reason": "y".repeat(141)}),
            Value::String("not json".into()),
            json!(42),
        ] {
            let classifier = OverlayClassifier::new(Scripted::new(reply), Duration::from_secs(1));
            let got = classifier.classify(&ga()).await;
            assert_eq!(got, classify(&ga()));
            assert!(classifier.cached(&ga()).is_none());
        }
    }

    #[tokio::test]
    async fn slow_overlay_is_abandoned() {
        let overlay = Scripted::slow(json!({"category": "Unknown", "reason": "late"}), Duration::from_millis(500));
        let classifier = OverlayClassifier::new(overlay, Duration::from_millis(20));

        let err = classifier.try_overlay(&ga()).await.unwrap_err();
        assert!(matches!(err, GuardError::OverlayTimeout(_)));
        assert_eq!(classifier.classify(&ga()).await, classify(&ga()));
    }

    #[tokio::test]
    async fn unavailable_overlay_falls_back() {
        let classifier = OverlayClassifier::new(Arc::new(Broken), Duration::from_secs(1));
        assert!(matches!(classifier.try_overlay(&ga()).await, Err(GuardError::OverlayUnavailable(_))));
        assert_eq!(classifier.classify(&ga()).await.category, Category::Analytics);

        let plain = OverlayClassifier::heuristic_only();
        assert!(!plain.has_overlay());
        assert_eq!(plain.classify(&ga()).await.category, Category::Analytics);
    }

    #[test]
    fn prompt_mentions_attributes_and_categories() {
        let prompt = OverlayPrompt::for_cookie(&Cookie::new("sid", "a.test").with_flags(true, true));
        let text = prompt.render();
        assert!(text.contains("name: sid"));
        assert!(text.contains("httpOnly: true"));
        assert!(text.contains("Necessary, Functional, Analytics, Advertising, Unknown"));
        assert!(text.contains("expiresIn: session"));

        let schema = OverlayPrompt::response_schema();
        assert_eq!(schema["properties"]["reason"]["maxLength"], 140);
    }
}
