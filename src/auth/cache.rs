//! Claims cache
//!
//! Maps raw token strings to their verified claims so repeat requests skip
//! signature verification. Entries are evicted lazily: a lookup that finds an
//! expired entry removes it. An optional capacity bound keeps the working set
//! finite when token lifetimes are long.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::token::IdentityClaim;

/// Concurrent token → claim cache
#[derive(Debug, Default)]
pub struct ClaimsCache {
    entries: DashMap<String, IdentityClaim>,
    /// 0 means unbounded
    max_entries: usize,
}

impl ClaimsCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `max_entries` tokens (0 = unbounded)
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    /// Look up a token, evicting it if its claim has expired at `now`
    pub fn get(&self, token: &str, now: DateTime<Utc>) -> Option<IdentityClaim> {
        if let Some(entry) = self.entries.get(token) {
            if entry.is_valid_at(now) {
                return Some(entry.clone());
            }
        } else {
            return None;
        }

        // Only remove if still expired; a concurrent insert may have refreshed it
        if self
            .entries
            .remove_if(token, |_, claim| !claim.is_valid_at(now))
            .is_some()
        {
            debug!("Evicted expired token from claims cache");
        }
        None
    }

    /// Cache a verified claim under its exact raw token
    pub fn insert(&self, token: &str, claim: IdentityClaim, now: DateTime<Utc>) {
        if self.max_entries > 0
            && self.entries.len() >= self.max_entries
            && !self.entries.contains_key(token)
        {
            self.make_room(now);
        }
        self.entries.insert(token.to_string(), claim);
    }

    /// Number of cached tokens (including not-yet-evicted expired ones)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, then the entry closest to expiry if still full
    fn make_room(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, claim| claim.is_valid_at(now));
        if self.entries.len() < self.max_entries {
            return;
        }

        let soonest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());

        if let Some(token) = soonest {
            self.entries.remove(&token);
            debug!("Claims cache full, evicted entry closest to expiry");
        }
    }
}
