//! Effect sinks
//!
//! Sinks are the host collaborators that actually mutate a subject: scale a
//! node, nudge a morph slider, hide a shape. The runtime only knows them
//! through [`EffectSink`] and picks one per [`EffectKind`] from a [`SinkSet`].

mod memory;

use std::sync::Arc;

use crate::error::SinkError;
use crate::ids::Handle;
use crate::timeline::EffectKind;

pub use memory::{ValueModel, ValueMode};

pub trait EffectSink: Send + Sync {
    /// Set `key` on `target` to an absolute value
    fn apply(&self, target: Handle, key: &str, value: f32) -> Result<(), SinkError>;

    /// Add `delta` to the current value of `key`
    fn apply_incremental(&self, target: Handle, key: &str, delta: f32) -> Result<(), SinkError> {
        let _ = (target, key, delta);
        Err(SinkError::Rejected("incremental updates not supported".to_string()))
    }

    /// Restore `key` on `target` to its untouched baseline
    fn revert(&self, target: Handle, key: &str) -> Result<(), SinkError>;
}

/// One sink per effect kind
#[derive(Clone)]
pub struct SinkSet {
    scale: Arc<dyn EffectSink>,
    morph: Arc<dyn EffectSink>,
    visibility: Arc<dyn EffectSink>,
}

impl SinkSet {
    pub fn new(
        scale: Arc<dyn EffectSink>,
        morph: Arc<dyn EffectSink>,
        visibility: Arc<dyn EffectSink>,
    ) -> Self {
        Self {
            scale,
            morph,
            visibility,
        }
    }

    pub fn for_kind(&self, kind: EffectKind) -> &dyn EffectSink {
        match kind {
            EffectKind::Scale => self.scale.as_ref(),
            EffectKind::Morph => self.morph.as_ref(),
            EffectKind::Visibility => self.visibility.as_ref(),
        }
    }
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSet").finish_non_exhaustive()
    }
}
