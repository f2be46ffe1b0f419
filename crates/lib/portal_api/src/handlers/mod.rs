//! Request handlers.

pub mod access;
pub mod auth;
pub mod fallback;
pub mod health;
pub mod webhooks;
