pub mod badge;
pub mod classify;
pub mod config;
pub mod cookies;
pub mod domain;
pub mod enforce;
pub mod errors;
pub mod guard;
pub mod panel;
pub mod policy;
pub mod protocol;
pub mod risk;
pub mod tabs;

pub use guard::*;
pub use config::GuardConfig;
pub use errors::GuardError;
