//! Client-side state containers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` owns the signed-in identity and credential token; guards and
//! pages read it through snapshots and `watch` subscriptions.

pub mod session;
