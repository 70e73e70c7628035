//! Networking modules for the PrintEase REST backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` holds the [`api::Backend`] seam and its HTTP implementation, and
//! `types` defines the wire schema shared with the session store and pages.

pub mod api;
pub mod types;
