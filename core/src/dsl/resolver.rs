//! Effect key resolution.
//!
//! Authors write short keys (`Head`, `Belly`); hosts often need the exact node
//! or slider name. A [`KeyResolver`] maps one to the other at parse time, so a
//! key that cannot be resolved rejects its line instead of failing later
//! inside a sink.

use hashbrown::HashMap;

use crate::timeline::EffectKind;

pub trait KeyResolver: Send + Sync {
    /// Canonical key for `key`, or `None` when the host has no such target
    fn resolve(&self, kind: EffectKind, key: &str) -> Option<String>;
}

/// Accepts every key unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl KeyResolver for IdentityResolver {
    fn resolve(&self, _kind: EffectKind, key: &str) -> Option<String> {
        Some(key.to_string())
    }
}

/// Lookup table resolver.
///
/// Keys match case-insensitively. A kind marked `closed` only accepts listed
/// keys; other kinds pass unlisted keys through unchanged.
#[derive(Debug, Clone, Default)]
pub struct TableResolver {
    entries: HashMap<(EffectKind, String), String>,
    closed: Vec<EffectKind>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EffectKind, key: &str, canonical: impl Into<String>) -> Self {
        self.entries
            .insert((kind, key.to_ascii_lowercase()), canonical.into());
        self
    }

    /// Reject keys of `kind` that are not in the table
    pub fn closed(mut self, kind: EffectKind) -> Self {
        if !self.closed.contains(&kind) {
            self.closed.push(kind);
        }
        self
    }
}

impl KeyResolver for TableResolver {
    fn resolve(&self, kind: EffectKind, key: &str) -> Option<String> {
        match self.entries.get(&(kind, key.to_ascii_lowercase())) {
            Some(canonical) => Some(canonical.clone()),
            None if self.closed.contains(&kind) => None,
            None => Some(key.to_string()),
        }
    }
}
