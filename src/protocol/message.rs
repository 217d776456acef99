use serde::{Deserialize, Serialize};

use crate::cookies::Cookie;
use crate::policy::Policy;
use crate::tabs::TabInfo;

/// Requests accepted by the [`MessageHandler`](super::MessageHandler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Current state; may reuse a recent cookie enumeration.
    GetState,
    /// Current state from a fresh cookie enumeration.
    ForceState,
    SetBlockList {
        #[serde(default)]
        domain: String,
        #[serde(default)]
        names: Vec<String>,
        #[serde(default)]
        block: bool,
    },
    ClearPolicy {
        #[serde(default)]
        domain: String,
    },
    RefreshBadge,
    RefreshBadgeColors,
    /// Sent by the content side when a page uses web storage.
    StorageSignal {
        domain: String,
        #[serde(default)]
        flags: StorageFlags,
    },
}

/// Which web storage areas a page has data in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFlags {
    #[serde(default)]
    pub ls: bool,
    #[serde(default)]
    pub idb: bool,
}

/// The tab a request originates from, resolved by the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub tab: Option<TabInfo>,
}

impl RequestContext {
    pub fn for_tab(tab: TabInfo) -> Self {
        Self { tab: Some(tab) }
    }

    pub fn url(&self) -> &str {
        self.tab.as_ref().and_then(|t| t.url.as_deref()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    pub url: String,
    pub domain: String,
    pub policy: Policy,
    pub cookies: Vec<Cookie>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageFlags>,
}

impl StateResponse {
    /// The response used when state cannot be produced.
    pub fn empty() -> Self {
        Self {
            url: String::new(),
            domain: String::new(),
            policy: Policy::default(),
            cookies: Vec::new(),
            storage: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self { ok: false, error: Some(error.to_string()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    State(StateResponse),
    Ack(Ack),
}

impl Response {
    pub fn as_state(&self) -> Option<&StateResponse> {
        match self {
            Response::State(s) => Some(s),
            Response::Ack(_) => None,
        }
    }

    pub fn as_ack(&self) -> Option<&Ack> {
        match self {
            Response::Ack(a) => Some(a),
            Response::State(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_names() {
        let req: Request = serde_json::from_value(json!({"type": "GET_STATE"})).unwrap();
        assert_eq!(req, Request::GetState);

        let req: Request = serde_json::from_value(json!({"type": "REFRESH_BADGE_COLORS"})).unwrap();
        assert_eq!(req, Request::RefreshBadgeColors);

        let req: Request = serde_json::from_value(
            json!({"type": "SET_BLOCK_LIST", "domain": "shop.example", "names": ["cart_sig"], "block": true}),
        )
        .unwrap();
        assert_eq!(
            req,
            Request::SetBlockList { domain: "shop.example".into(), names: vec!["cart_sig".into()], block: true }
        );
    }

    #[test]
    fn missing_fields_default_like_the_shell_expects() {
        let req: Request = serde_json::from_value(json!({"type": "SET_BLOCK_LIST", "domain": "a.test"})).unwrap();
        assert_eq!(req, Request::SetBlockList { domain: "a.test".into(), names: vec![], block: false });

        let req: Request = serde_json::from_value(json!({"type": "STORAGE_SIGNAL", "domain": "a.test"})).unwrap();
        assert_eq!(req, Request::StorageSignal { domain: "a.test".into(), flags: StorageFlags::default() });
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_value::<Request>(json!({"type": "DROP_TABLES"})).is_err());
        assert!(serde_json::from_value::<Request>(json!({"names": []})).is_err());
    }

    #[test]
    fn response_shapes() {
        let empty = serde_json::to_value(Response::State(StateResponse::empty())).unwrap();
        assert_eq!(empty, json!({"url": "", "domain": "", "policy": {"blockedCookies": []}, "cookies": []}));

        assert_eq!(serde_json::to_value(Response::Ack(Ack::ok())).unwrap(), json!({"ok": true}));
        assert_eq!(
            serde_json::to_value(Response::Ack(Ack::failed("disk full"))).unwrap(),
            json!({"ok": false, "error": "disk full"})
        );
    }
}
