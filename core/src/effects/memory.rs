//! In-memory sink modelling a host subject's effect state.
//!
//! Used by the validate tool's simulation and by tests. Values live in a map
//! keyed by `(handle, key)`; untouched keys read as the model's baseline.

use std::sync::Mutex;

use hashbrown::{HashMap, HashSet};

use super::EffectSink;
use crate::error::SinkError;
use crate::ids::Handle;

/// How `apply` and `apply_incremental` treat stored values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueMode {
    /// `apply` sets the value; increments add to it
    Absolute,
    /// Every write is a delta, accumulated and clamped into `[min, max]`
    Accumulate { min: f32, max: f32 },
}

#[derive(Debug, Default)]
struct ModelState {
    values: HashMap<(Handle, String), f32>,
    expired: HashSet<Handle>,
}

#[derive(Debug)]
pub struct ValueModel {
    name: &'static str,
    baseline: f32,
    mode: ValueMode,
    /// Key groups: writing a group key writes every member instead
    groups: HashMap<String, Vec<String>>,
    state: Mutex<ModelState>,
}

impl ValueModel {
    /// Node scales; baseline 1.0
    pub fn scale() -> Self {
        Self::new("scale", 1.0, ValueMode::Absolute)
    }

    /// Morph sliders; baseline 0, accumulated into `[0, 100]`
    pub fn morph() -> Self {
        Self::new("morph", 0.0, ValueMode::Accumulate { min: 0.0, max: 100.0 })
    }

    /// Shape visibility; baseline visible (1.0)
    pub fn visibility(groups: HashMap<String, Vec<String>>) -> Self {
        let mut model = Self::new("visibility", 1.0, ValueMode::Absolute);
        model.groups = groups;
        model
    }

    pub fn new(name: &'static str, baseline: f32, mode: ValueMode) -> Self {
        Self {
            name,
            baseline,
            mode,
            groups: HashMap::new(),
            state: Mutex::new(ModelState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current value of `key` on `target`
    pub fn value(&self, target: Handle, key: &str) -> f32 {
        self.lock()
            .values
            .get(&(target, key.to_string()))
            .copied()
            .unwrap_or(self.baseline)
    }

    /// Make every later operation on `target` fail with `HandleExpired`
    pub fn expire(&self, target: Handle) {
        self.lock().expired.insert(target);
    }

    /// Every stored value that differs from the baseline, sorted
    pub fn snapshot(&self) -> Vec<(Handle, String, f32)> {
        let state = self.lock();
        let mut entries: Vec<(Handle, String, f32)> = state
            .values
            .iter()
            .filter(|(_, v)| (**v - self.baseline).abs() > f32::EPSILON)
            .map(|((h, k), v)| (*h, k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        entries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ModelState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn members<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        match self.groups.get(key) {
            Some(members) => members.iter().map(String::as_str).collect(),
            None => vec![key],
        }
    }

    fn write(&self, target: Handle, key: &str, f: impl Fn(f32) -> f32) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.expired.contains(&target) {
            return Err(SinkError::HandleExpired(target));
        }
        for member in self.members(key) {
            let slot = state
                .values
                .entry((target, member.to_string()))
                .or_insert(self.baseline);
            *slot = f(*slot);
        }
        Ok(())
    }
}

impl EffectSink for ValueModel {
    fn apply(&self, target: Handle, key: &str, value: f32) -> Result<(), SinkError> {
        match self.mode {
            ValueMode::Absolute => self.write(target, key, |_| value),
            ValueMode::Accumulate { min, max } => {
                self.write(target, key, |current| (current + value).clamp(min, max))
            }
        }
    }

    fn apply_incremental(&self, target: Handle, key: &str, delta: f32) -> Result<(), SinkError> {
        match self.mode {
            ValueMode::Absolute => self.write(target, key, |current| current + delta),
            ValueMode::Accumulate { min, max } => {
                self.write(target, key, |current| (current + delta).clamp(min, max))
            }
        }
    }

    fn revert(&self, target: Handle, key: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.expired.contains(&target) {
            return Err(SinkError::HandleExpired(target));
        }
        for member in self.members(key) {
            state.values.remove(&(target, member.to_string()));
        }
        Ok(())
    }
}
