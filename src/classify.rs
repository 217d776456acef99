// src/classify.rs
//! Classification: [`Category`], the ordered heuristic [`rules`] and the
//! optional [`OverlayClassifier`].

mod category;
#[cfg(feature = "http_overlay")]
mod http_overlay;
mod overlay;
pub mod rules;

pub use category::Category;
pub use category::Classification;
pub use category::MAX_REASON_CHARS;

#[cfg(feature = "http_overlay")]
pub use http_overlay::HttpOverlay;

pub use overlay::parse_overlay_reply;
pub use overlay::ClassificationOverlay;
pub use overlay::OverlayClassifier;
pub use overlay::OverlayPrompt;

pub use rules::classify;
