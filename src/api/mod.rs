//! REST client for the auth server.
//!
//! This module provides the `AuthApi` client for the five auth endpoints
//! (register, login, logout, refresh, current user) and the `ApiError`
//! taxonomy every call is normalized into.
//!
//! Short-lived access tokens go out as `Authorization: Bearer` headers;
//! the long-lived refresh credential lives in the client's cookie store
//! and travels automatically.

pub mod client;
pub mod error;

pub use client::AuthApi;
pub use error::ApiError;
