//! Session lifecycle management.
//!
//! This module provides:
//! - `SessionManager`: the session state machine - login, logout, silent
//!   restore, identity fetch with a bounded reactive refresh
//! - `RefreshScheduler`: the one-shot timer that renews the access token
//!   ahead of expiry
//!
//! The session is the single source of truth for "who is logged in"; no
//! other component mutates it.

pub mod scheduler;
pub mod session;

pub use scheduler::RefreshScheduler;
pub use session::{SessionManager, SessionSnapshot};
