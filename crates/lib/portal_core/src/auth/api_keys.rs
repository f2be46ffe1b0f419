//! API key registry for webhook callers.
//!
//! Keys are held as SHA-256 digests; plaintext keys are never kept after
//! construction.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use super::AuthError;

/// Returned for an `API_KEYS` entry that is not `name:key`.
#[derive(Debug, Clone, Error)]
#[error("malformed API key entry '{0}' (expected name:key)")]
pub struct ParseApiKeysError(String);

/// Read-only mapping from API key to caller name (e.g. "stripe").
#[derive(Debug, Clone, Default)]
pub struct ApiKeyRegistry {
    callers: HashMap<[u8; 32], String>,
}

impl ApiKeyRegistry {
    pub fn new<I, N, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, K)>,
        N: Into<String>,
        K: AsRef<str>,
    {
        let callers = entries
            .into_iter()
            .map(|(name, key)| (digest(key.as_ref()), name.into()))
            .collect();
        Self { callers }
    }

    /// Parse `name:key,name:key`. Blank segments are skipped.
    pub fn parse(list: &str) -> Result<Self, ParseApiKeysError> {
        let mut entries = Vec::new();
        for segment in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match segment.split_once(':') {
                Some((name, key)) if !name.trim().is_empty() && !key.trim().is_empty() => {
                    entries.push((name.trim().to_string(), key.trim().to_string()));
                }
                _ => return Err(ParseApiKeysError(segment.to_string())),
            }
        }
        Ok(Self::new(entries))
    }

    /// Caller name for `key`.
    pub fn authenticate(&self, key: &str) -> Result<&str, AuthError> {
        match self.callers.get(&digest(key)) {
            Some(caller) => Ok(caller),
            None => {
                warn!("rejected unknown API key");
                Err(AuthError::InvalidApiKey)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_resolves_to_caller() {
        let registry = ApiKeyRegistry::new([("stripe", "sk_live_1"), ("admin", "adm_2")]);
        assert_eq!(registry.authenticate("sk_live_1"), Ok("stripe"));
        assert_eq!(registry.authenticate("adm_2"), Ok("admin"));
    }

    #[test]
    fn unknown_key_is_invalid() {
        let registry = ApiKeyRegistry::new([("stripe", "sk_live_1")]);
        assert_eq!(registry.authenticate("sk_live_2"), Err(AuthError::InvalidApiKey));
        assert_eq!(ApiKeyRegistry::default().authenticate(""), Err(AuthError::InvalidApiKey));
    }

    #[test]
    fn parses_comma_separated_pairs() {
        let registry = ApiKeyRegistry::parse(" stripe:sk_1 , admin:adm:with:colons ,").unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.authenticate("adm:with:colons"), Ok("admin"));
    }

    #[test]
    fn rejects_entries_without_key() {
        assert!(ApiKeyRegistry::parse("stripe").is_err());
        assert!(ApiKeyRegistry::parse("stripe:").is_err());
    }
}
