// src/protocol.rs
//! Message protocol between the UI shell and the guard.
//!
//! Requests are JSON objects addressed by a `type` discriminant:
//!
//! | Request | Input | Response |
//! |---|---|---|
//! | `GET_STATE` / `FORCE_STATE` | none | `{url, domain, policy, cookies, storage?}` |
//! | `SET_BLOCK_LIST` | `{domain, names, block}` | `{ok, error?}` |
//! | `CLEAR_POLICY` | `{domain}` | `{ok, error?}` |
//! | `REFRESH_BADGE` / `REFRESH_BADGE_COLORS` | none | `{ok: true}` |
//! | `STORAGE_SIGNAL` | `{domain, flags: {ls, idb}}` | `{ok: true}` |
//!
//! The protocol is stateless with respect to tabs: the shell resolves which
//! tab a request came from and passes it as a [`RequestContext`].

mod handler;
mod message;

pub use handler::MessageHandler;
pub use message::{Ack, Request, RequestContext, Response, StateResponse, StorageFlags};
