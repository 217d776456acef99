use gosub_cookie_guard::{
    badge::RecordingBadgeRenderer,
    classify::{Category, ClassificationOverlay, HttpOverlay},
    cookies::{Cookie, InMemoryCookieSource, SameSite},
    panel::ToggleOutcome,
    policy::JsonKeyValueStore,
    risk::Confirmer,
    tabs::{StaticTabSource, TabEvent, TabId, TabInfo, TabStatus},
    Collaborators, CookieGuard, GuardConfig,
};

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use url::Url;

/// Stands in for the popup's confirmation dialog: prints the prompt and says yes.
struct AlwaysYes;

#[async_trait]
impl Confirmer for AlwaysYes {
    async fn confirm(&self, message: &str) -> bool {
        println!("[confirm] {message} -> yes");
        true
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Configure the guard. Badge counts above 9 are shown as "9+" to make the cap visible.
    let config = GuardConfig::builder()
        .badge_cap(9)
        .badge_background_hex("#2563eb")?
        .build()?;

    // Policies are persisted in a JSON file so they survive a restart of the demo.
    let dir = tempfile::tempdir()?;
    let storage = Arc::new(JsonKeyValueStore::new(dir.path().join("policies.json"))?);

    // The browser side: a cookie jar, the badge and the tab strip.
    let cookies = Arc::new(InMemoryCookieSource::new());
    for (name, size) in [("cart_sig", 64), ("_ga", 30), ("_gid", 30), ("_fbp", 28), ("session_id", 40)] {
        cookies.set_cookie(
            "shop.example",
            Cookie::new(name, "shop.example")
                .with_size(size)
                .with_same_site(SameSite::Lax),
        );
    }
    let badges = Arc::new(RecordingBadgeRenderer::new());
    let tabs = Arc::new(StaticTabSource::new());
    tabs.upsert(TabInfo::new(1, "https://shop.example/cart"));
    tabs.activate(TabId(1));

    // Point COOKIE_GUARD_OVERLAY_URL at a local model server (e.g.
    // http://127.0.0.1:11434/api/generate) to refine the heuristic labels.
    let overlay: Option<Arc<dyn ClassificationOverlay>> = match std::env::var("COOKIE_GUARD_OVERLAY_URL") {
        Ok(endpoint) => Some(Arc::new(HttpOverlay::new(
            Url::parse(&endpoint)?,
            "llama3.2",
            config.overlay_timeout,
        )?)),
        Err(_) => None,
    };

    let guard = CookieGuard::new(
        Some(config),
        Collaborators {
            cookies: cookies.clone(),
            storage,
            badges: badges.clone(),
            tabs: tabs.clone(),
            overlay,
        },
    );

    // Tab events keep the badge current while the "browser" runs.
    let (event_tx, event_handle) = guard.start_tab_events();
    event_tx
        .send(TabEvent::Updated {
            tab_id: TabId(1),
            status: TabStatus::Complete,
            url: Some("https://shop.example/cart".into()),
        })
        .await?;

    // Open the popup for the active tab and list what it sees.
    let ctx = guard.active_context().await;
    let mut panel = guard.open_panel(ctx.clone(), Arc::new(AlwaysYes)).await;
    println!("{} on {}", panel.title(), panel.domain());
    for row in panel.rows() {
        println!(
            "  {:<12} {:<11} {:>3}B  {}",
            row.cookie.name, row.classification.category, row.cookie.size, row.classification.reason
        );
    }

    // Turn off the advertising and analytics cookies, one filter at a time.
    for category in [Category::Advertising, Category::Analytics] {
        panel.set_filter(Some(category));
        match panel.set_visible_allowed(false).await {
            ToggleOutcome::Applied => println!("blocked every {category} cookie"),
            other => println!("blocking {category} cookies: {other:?}"),
        }
    }
    panel.set_filter(None);

    // Blocking the session cookie goes through the confirmation prompt.
    let outcome = panel.toggle("session_id", false).await;
    println!("session_id: {outcome:?}");

    // The shell talks JSON; blocked cookies come back as remembered entries.
    let state = guard.handler().handle_json(&ctx, &json!({ "type": "FORCE_STATE" })).await;
    println!("state: {}", serde_json::to_string_pretty(&state)?);

    if let Some(badge) = badges.badge(TabId(1)) {
        println!("badge: {:?} on {:?}", badge.text, badge.background);
    }

    // Dropping the sender ends the event loop.
    drop(event_tx);
    if let Err(join_err) = event_handle.await {
        eprintln!("tab event loop panicked: {join_err}");
    }

    Ok(())
}
