//! Popup-side controller.
//!
//! A [`Panel`] is one popup session: it fetches state through the
//! [`MessageHandler`], classifies the cookies once, and turns the user's
//! toggles into `SET_BLOCK_LIST` requests after consulting the risk policy.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::classify::{classify, Category, Classification, OverlayClassifier};
use crate::cookies::Cookie;
use crate::protocol::{MessageHandler, Request, RequestContext, Response, StateResponse};
use crate::risk::{batch_confirmation, requires_confirmation, single_confirmation, BatchRisk, BlockAction, Confirmer};

/// One rendered cookie row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    pub cookie: Cookie,
    pub classification: Classification,
    pub blocked: bool,
}

impl PanelRow {
    pub fn allowed(&self) -> bool {
        !self.blocked
    }
}

/// Per-category counts over every cookie, ignoring the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub total: usize,
    counts: BTreeMap<Category, usize>,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The request was sent and persisted.
    Applied,
    /// The user declined the confirmation; nothing was sent.
    Declined,
    /// Nothing to do (unknown name or empty selection).
    Unchanged,
    /// The request was sent but not applied.
    Failed(String),
}

pub struct Panel {
    handler: Arc<MessageHandler>,
    ctx: RequestContext,
    classifier: Arc<OverlayClassifier>,
    confirmer: Arc<dyn Confirmer>,
    state: StateResponse,
    classifications: HashMap<String, Classification>,
    filter: Option<Category>,
}

impl Panel {
    pub async fn open(
        handler: Arc<MessageHandler>,
        ctx: RequestContext,
        classifier: Arc<OverlayClassifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        let state = request_state(&handler, &ctx, Request::GetState).await;
        handler.handle(&ctx, Request::RefreshBadge).await;

        let mut panel = Self {
            handler,
            ctx,
            classifier,
            confirmer,
            state,
            classifications: HashMap::new(),
            filter: None,
        };
        panel.classify_all().await;
        panel
    }

    /// Re-fetches state from a fresh enumeration.
    pub async fn reload(&mut self) {
        self.state = request_state(&self.handler, &self.ctx, Request::ForceState).await;
        self.classify_all().await;
    }

    pub fn domain(&self) -> &str {
        &self.state.domain
    }

    pub fn url(&self) -> &str {
        &self.state.url
    }

    pub fn state(&self) -> &StateResponse {
        &self.state
    }

    pub fn filter(&self) -> Option<Category> {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Option<Category>) {
        self.filter = filter;
    }

    /// Header title for the current filter.
    pub fn title(&self) -> String {
        match self.filter {
            Some(category) => format!("{category} cookies"),
            None => "Cookies on this site".to_string(),
        }
    }

    pub fn classification(&self, cookie: &Cookie) -> Classification {
        self.classifications
            .get(&cookie.name)
            .cloned()
            .unwrap_or_else(|| classify(cookie))
    }

    pub fn rows(&self) -> Vec<PanelRow> {
        let mut rows: Vec<PanelRow> = self
            .state
            .cookies
            .iter()
            .map(|cookie| PanelRow {
                cookie: cookie.clone(),
                classification: self.classification(cookie),
                blocked: self.state.policy.is_blocked(&cookie.name),
            })
            .filter(|row| self.filter.map_or(true, |f| row.classification.category == f))
            .collect();

        rows.sort_by(|a, b| {
            a.classification
                .category
                .cmp(&b.classification.category)
                .then(b.cookie.present.cmp(&a.cookie.present))
                .then(b.cookie.size.cmp(&a.cookie.size))
                .then_with(|| a.cookie.name.cmp(&b.cookie.name))
        });
        rows
    }

    pub fn category_counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts {
            total: self.state.cookies.len(),
            counts: BTreeMap::new(),
        };
        for cookie in &self.state.cookies {
            *counts.counts.entry(self.classification(cookie).category).or_default() += 1;
        }
        counts
    }

    /// State of the master toggle: on when no visible row is blocked.
    pub fn all_visible_allowed(&self) -> bool {
        self.rows().iter().all(PanelRow::allowed)
    }

    /// Allows (`allow == true`) or blocks the cookie called `name`.
    pub async fn toggle(&mut self, name: &str, allow: bool) -> ToggleOutcome {
        let Some(cookie) = self.state.cookies.iter().find(|c| c.name == name).cloned() else {
            return ToggleOutcome::Unchanged;
        };

        let action = BlockAction::from_block_flag(!allow);
        let classification = self.classification(&cookie);
        if requires_confirmation(action, &cookie, &classification) {
            let prompt = single_confirmation(&cookie.name, &self.state.domain);
            if !self.confirmer.confirm(&prompt).await {
                log::debug!("user declined blocking '{name}'");
                return ToggleOutcome::Declined;
            }
        }

        self.send(vec![cookie.name], action).await
    }

    /// Master toggle over the rows visible under the current filter.
    pub async fn set_visible_allowed(&mut self, allow: bool) -> ToggleOutcome {
        let rows = self.rows();
        if rows.is_empty() {
            return ToggleOutcome::Unchanged;
        }

        let action = BlockAction::from_block_flag(!allow);
        let risk = BatchRisk::assess(action, rows.iter().map(|r| (&r.cookie, &r.classification)));
        if risk.is_risky() {
            let prompt = batch_confirmation(risk.risky_count(), &self.state.domain);
            if !self.confirmer.confirm(&prompt).await {
                log::debug!("user declined blocking {} of {} visible cookies", risk.risky_count(), risk.total);
                return ToggleOutcome::Declined;
            }
        }

        let names = rows.into_iter().map(|r| r.cookie.name).collect();
        self.send(names, action).await
    }

    async fn send(&mut self, names: Vec<String>, action: BlockAction) -> ToggleOutcome {
        let request = Request::SetBlockList {
            domain: self.state.domain.clone(),
            names: names.clone(),
            block: action.is_block(),
        };

        match self.handler.handle(&self.ctx, request).await {
            Response::Ack(ack) if ack.ok => {
                self.state.policy.apply(&names, action.is_block());
                ToggleOutcome::Applied
            }
            Response::Ack(ack) => ToggleOutcome::Failed(ack.error.unwrap_or_default()),
            Response::State(_) => ToggleOutcome::Failed("unexpected state response".into()),
        }
    }

    async fn classify_all(&mut self) {
        self.classifications.clear();
        for cookie in &self.state.cookies {
            let classification = self.classifier.classify(cookie).await;
            self.classifications.insert(cookie.name.clone(), classification);
        }
    }
}

async fn request_state(handler: &MessageHandler, ctx: &RequestContext, request: Request) -> StateResponse {
    match handler.handle(ctx, request).await {
        Response::State(state) => state,
        Response::Ack(ack) => {
            log::warn!("state request answered with ack: {ack:?}");
            StateResponse::empty()
        }
    }
}
