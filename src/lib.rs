//! PrintEase client: session management, route guarding, and the pages of
//! the document-upload service, backed by its REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` builds one [`SessionStore`] over an [`HttpBackend`] and a
//! [`storage::SessionStorage`], runs [`SessionStore::check_auth`] once, and
//! drives the pages from CLI commands. Tests swap the backend for a fake.

pub mod config;
pub mod guard;
pub mod net;
pub mod pages;
pub mod state;
pub mod storage;

#[cfg(test)]
pub mod test_helpers;

pub use config::ClientConfig;
pub use guard::{GuardDecision, Route, RouteGuard};
pub use net::api::{Backend, HttpBackend};
pub use net::types::{AccountKind, DocumentRecord, Identity};
pub use state::session::{AuthPhase, SessionError, SessionState, SessionStore};
