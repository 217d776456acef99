//! Overlay backed by a local text-generation endpoint.
//!
//! Speaks the `POST /api/generate` shape used by local model servers such as
//! Ollama: the request carries the rendered prompt plus the reply schema in
//! `format`, and the answer text comes back in the `response` field. The text
//! is handed to [`parse_overlay_reply`](super::parse_overlay_reply) unchanged.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::classify::{ClassificationOverlay, OverlayPrompt};

pub struct HttpOverlay {
    endpoint: Url,
    model: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpOverlay {
    /// `timeout` bounds the HTTP exchange itself; the classifier applies its
    /// own overall timeout on top.
    pub fn new(endpoint: Url, model: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            endpoint,
            model: model.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self, prompt: &OverlayPrompt) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt.render(),
            "format": OverlayPrompt::response_schema(),
            "stream": false,
        })
    }
}

/// Pulls the answer text out of a generate response body.
fn extract_reply(body: Value) -> anyhow::Result<Value> {
    let parsed: GenerateResponse = serde_json::from_value(body).context("generate response has no text")?;
    Ok(Value::String(parsed.response))
}

#[async_trait]
impl ClassificationOverlay for HttpOverlay {
    async fn complete(&self, prompt: &OverlayPrompt) -> anyhow::Result<Value> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("overlay endpoint answered {status}");
        }

        let body: Value = res.json().await?;
        extract_reply(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{parse_overlay_reply, Category};
    use crate::cookies::Cookie;

    fn overlay() -> HttpOverlay {
        let endpoint = Url::parse("http://127.0.0.1:11434/api/generate").unwrap();
        HttpOverlay::new(endpoint, "llama3.2", Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn request_carries_prompt_and_schema() {
        let prompt = OverlayPrompt::for_cookie(&Cookie::new("_fbp", "shop.example"));
        let body = overlay().request_body(&prompt);

        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
        assert!(body["prompt"].as_str().unwrap().contains("name: _fbp"));
        assert_eq!(body["format"]["required"], json!(["category", "reason"]));
    }

    #[test]
    fn reply_text_feeds_the_parser() {
        let body = json!({
            "model": "llama3.2",
            "response": "{\"category\":\"Advertising\",\"reason\":\"Facebook ad tracking.\"}",
            "done": true,
        });
        let reply = extract_reply(body).unwrap();
        assert_eq!(parse_overlay_reply(reply).unwrap().category, Category::Advertising);

        assert!(extract_reply(json!({"error": "model not found"})).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // port 9 (discard) is closed on test machines
        let endpoint = Url::parse("http://127.0.0.1:9/api/generate").unwrap();
        let overlay = HttpOverlay::new(endpoint, "m", Duration::from_millis(200)).unwrap();
        let prompt = OverlayPrompt::for_cookie(&Cookie::new("x", "a.test"));
        assert!(overlay.complete(&prompt).await.is_err());
    }
}
