// src/cookies.rs
//! Cookies: the [`Cookie`] snapshot and the [`CookieSource`] collaborator.

mod cache;
mod cookie;
mod in_memory;
mod source;

pub use cookie::Cookie;
pub use cookie::SameSite;

pub use source::CookieSource;
pub use source::CookieSourceHandle;

pub use cache::CachingCookieSource;
pub use in_memory::InMemoryCookieSource;
