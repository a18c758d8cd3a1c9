//! Authkeep - client-side authentication session management.
//!
//! This crate manages the full lifecycle of a client auth session against a
//! token-issuing REST API: register/login, silent session restoration from a
//! long-lived refresh cookie, proactive token renewal ahead of expiry, and a
//! single bounded reactive refresh when a request comes back 401.
//!
//! The UI layer interacts with one type, [`SessionManager`], and observes
//! state through read-only [`SessionSnapshot`] views. All network failure
//! modes are returned as values - no operation panics or surfaces an
//! unhandled error.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, AuthApi};
pub use auth::{SessionManager, SessionSnapshot};
pub use config::Config;
pub use models::{Identity, TokenGrant};
