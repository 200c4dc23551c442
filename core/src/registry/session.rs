use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::ids::{Generation, Handle};
use crate::scheduler::tween::Tween;
use crate::timeline::{EffectKind, Role, Timeline};

/// A `(role, key, kind)` applied at least once during the current generation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TouchedKey {
    pub role: Role,
    pub kind: EffectKind,
    pub key: String,
}

impl TouchedKey {
    pub fn new(role: Role, kind: EffectKind, key: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Live binding of a timeline to one subject
#[derive(Debug)]
pub struct Session {
    pub(crate) timeline: Arc<Timeline>,
    pub(crate) generation: Generation,
    pub(crate) initiator: Handle,
    pub(crate) partner: Option<Handle>,
    pub(crate) elapsed_secs: f32,
    /// Index of the next command to run
    pub(crate) next_index: usize,
    /// At most one tween per (role, key)
    pub(crate) tweens: BTreeMap<(Role, String), Tween>,
}

impl Session {
    pub(crate) fn new(
        timeline: Arc<Timeline>,
        generation: Generation,
        initiator: Handle,
        partner: Option<Handle>,
    ) -> Self {
        Self {
            timeline,
            generation,
            initiator,
            partner,
            elapsed_secs: 0.0,
            next_index: 0,
            tweens: BTreeMap::new(),
        }
    }

    pub(crate) fn handle_for(&self, role: Role) -> Option<Handle> {
        match role {
            Role::Initiator => Some(self.initiator),
            Role::Partner => self.partner,
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            timeline: self.timeline.name().to_string(),
            generation: self.generation,
            elapsed_secs: self.elapsed_secs,
            next_index: self.next_index,
            remaining_commands: self.timeline.len().saturating_sub(self.next_index),
            active_tweens: self.tweens.len(),
        }
    }
}

/// Point-in-time view of a running session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub timeline: String,
    pub generation: Generation,
    pub elapsed_secs: f32,
    pub next_index: usize,
    pub remaining_commands: usize,
    pub active_tweens: usize,
}

/// Touched keys removed from a subject, with the handles needed to revert them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchedSnapshot {
    pub initiator: Option<Handle>,
    pub partner: Option<Handle>,
    /// Sorted by role, then kind, then key
    pub keys: Vec<TouchedKey>,
}

impl TouchedSnapshot {
    pub fn handle_for(&self, role: Role) -> Option<Handle> {
        match role {
            Role::Initiator => self.initiator,
            Role::Partner => self.partner,
        }
    }
}

/// What a cancel left behind
#[derive(Debug, Clone, PartialEq)]
pub struct CancelSnapshot {
    /// Generation after the bump
    pub generation: Generation,
    pub was_running: bool,
    pub touched: TouchedSnapshot,
}
