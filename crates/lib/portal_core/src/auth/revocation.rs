//! Process-wide record of revoked token identifiers.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Revoked token identifiers, each remembered until its token's own expiry.
///
/// Entries are only ever removed by [`RevocationSet::purge_expired`] once the
/// token they name has expired, so a revoked token never validates again.
#[derive(Debug, Default)]
pub struct RevocationSet {
    /// `jti` → token expiry (unix timestamp).
    entries: DashMap<String, i64>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `jti` revoked. Returns `false` if it already was.
    pub fn revoke(&self, jti: &str, expires_at: i64) -> bool {
        match self.entries.entry(jti.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.entries.contains_key(jti)
    }

    /// Drop entries whose token expired before `now`. Returns how many were dropped.
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at >= now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
