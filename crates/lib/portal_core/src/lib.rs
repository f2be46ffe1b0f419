//! # portal_core
//!
//! Identity, authorization and admission-control primitives for the portal
//! backend. Framework-free: the HTTP integration lives in `portal_api`.

pub mod auth;
pub mod models;
pub mod rate_limit;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
