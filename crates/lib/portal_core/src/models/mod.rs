//! Domain models shared across the portal crates.

pub mod auth;

pub use auth::{Claims, ParseRoleError, Role, TokenKind, TokenPair};
