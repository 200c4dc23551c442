//! Timeline data model
//!
//! A [`Timeline`] is an immutable, offset-ordered list of [`Command`]s. The
//! [`TimelineBook`] bundles every timeline parsed from one file together with
//! the trigger map, visibility groups and settings that came with it.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tandem_types::Settings;

/// Scale magnitudes are clamped into this range at parse time
pub const SCALE_RANGE: (f32, f32) = (0.0, 5.0);

/// Morph magnitudes (deltas) are clamped into this range at parse time
pub const MORPH_RANGE: (f32, f32) = (-1000.0, 1000.0);

// ═══════════════════════════════════════════════════════════════════════════
// Enums
// ═══════════════════════════════════════════════════════════════════════════

/// Which of the two cooperating subjects a command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Initiator,
    Partner,
}

impl Role {
    /// Parse a section role name. `Caster` and `Target` are accepted for
    /// older files.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("initiator") || name.eq_ignore_ascii_case("caster") {
            Some(Self::Initiator)
        } else if name.eq_ignore_ascii_case("partner") || name.eq_ignore_ascii_case("target") {
            Some(Self::Partner)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Partner => "partner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed set of effect categories. Each maps to exactly one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    /// Absolute geometry scale (1.0 is the untouched size)
    Scale,
    /// Continuous slider value, applied as deltas
    Morph,
    /// Show or hide a named shape (magnitude 1.0 = visible)
    Visibility,
}

impl EffectKind {
    /// Only continuous effects can be interpolated
    pub fn supports_tween(self) -> bool {
        matches!(self, Self::Morph)
    }

    /// Bring a parsed magnitude into the range the category accepts
    pub fn clamp_magnitude(self, value: f32) -> f32 {
        match self {
            Self::Scale => value.clamp(SCALE_RANGE.0, SCALE_RANGE.1),
            Self::Morph => value.clamp(MORPH_RANGE.0, MORPH_RANGE.1),
            Self::Visibility => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Scale => "scale",
            Self::Morph => "morph",
            Self::Visibility => "visibility",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Interpolation curve named in a tweened command.
///
/// Every curve parses, but the scheduler only runs [`TweenCurve::Linear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TweenCurve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl TweenCurve {
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "linear" => Some(Self::Linear),
            "easein" => Some(Self::EaseIn),
            "easeout" => Some(Self::EaseOut),
            "easeinout" => Some(Self::EaseInOut),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Command + Timeline
// ═══════════════════════════════════════════════════════════════════════════

/// One timed effect operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: EffectKind,
    pub role: Role,
    /// Seconds since the session started; never negative
    pub time_offset_secs: f32,
    /// Sink-defined key (bone, slider or shape name)
    pub key: String,
    pub magnitude: f32,
    /// Interpolation duration; `None` applies instantly
    #[serde(default)]
    pub tween_secs: Option<f32>,
    #[serde(default)]
    pub tween_curve: TweenCurve,
}

impl Command {
    pub fn new(
        kind: EffectKind,
        role: Role,
        time_offset_secs: f32,
        key: impl Into<String>,
        magnitude: f32,
    ) -> Self {
        Self {
            kind,
            role,
            time_offset_secs,
            key: key.into(),
            magnitude,
            tween_secs: None,
            tween_curve: TweenCurve::Linear,
        }
    }

    pub fn with_tween(mut self, secs: f32, curve: TweenCurve) -> Self {
        self.tween_secs = Some(secs);
        self.tween_curve = curve;
        self
    }

    /// True when the command should go through the tween subsystem
    pub fn is_tweened(&self) -> bool {
        self.kind.supports_tween() && self.tween_secs.is_some_and(|d| d > 0.0)
    }

    fn normalize(&mut self) {
        if !self.time_offset_secs.is_finite() || self.time_offset_secs < 0.0 {
            self.time_offset_secs = 0.0;
        }
        self.magnitude = self.kind.clamp_magnitude(self.magnitude);
        if self.tween_secs.is_some_and(|d| !d.is_finite() || d <= 0.0) {
            self.tween_secs = None;
        }
    }
}

/// Named, offset-ordered command list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    name: String,
    commands: Vec<Command>,
}

impl Timeline {
    /// Build a timeline, clamping every command and sorting by offset.
    /// The sort is stable, so commands with equal offsets keep their order.
    pub fn new(name: impl Into<String>, mut commands: Vec<Command>) -> Self {
        for command in &mut commands {
            command.normalize();
        }
        commands.sort_by(|a, b| a.time_offset_secs.total_cmp(&b.time_offset_secs));
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether any command addresses the partner role
    pub fn has_partner_commands(&self) -> bool {
        self.commands.iter().any(|c| c.role == Role::Partner)
    }

    /// Offset of the last command plus its tween, if any
    pub fn duration_secs(&self) -> f32 {
        self.commands
            .iter()
            .map(|c| c.time_offset_secs + if c.is_tweened() { c.tween_secs.unwrap_or(0.0) } else { 0.0 })
            .fold(0.0, f32::max)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Book
// ═══════════════════════════════════════════════════════════════════════════

/// Result of looking a trigger tag up in the book
#[derive(Debug, Clone)]
pub enum TriggerLookup<'a> {
    /// No mapping for this tag
    Unmapped,
    /// The tag maps to a timeline name that was never defined
    Missing(&'a str),
    Found(Arc<Timeline>),
}

/// Everything one timeline file defines
#[derive(Debug, Clone, Default)]
pub struct TimelineBook {
    timelines: HashMap<String, Arc<Timeline>>,
    triggers: HashMap<String, String>,
    vis_groups: HashMap<String, Vec<String>>,
    pub settings: Settings,
}

impl TimelineBook {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Add or replace a timeline
    pub fn insert_timeline(&mut self, timeline: Timeline) {
        self.timelines
            .insert(timeline.name().to_string(), Arc::new(timeline));
    }

    /// Map a trigger tag to a timeline name. Later mappings win.
    pub fn map_trigger(&mut self, tag: impl Into<String>, timeline: impl Into<String>) {
        self.triggers.insert(tag.into(), timeline.into());
    }

    pub fn insert_vis_group(&mut self, key: impl Into<String>, members: Vec<String>) {
        self.vis_groups.insert(key.into(), members);
    }

    pub fn timeline(&self, name: &str) -> Option<Arc<Timeline>> {
        self.timelines.get(name).cloned()
    }

    pub fn lookup_trigger(&self, tag: &str) -> TriggerLookup<'_> {
        match self.triggers.get(tag) {
            None => TriggerLookup::Unmapped,
            Some(name) => match self.timelines.get(name) {
                Some(timeline) => TriggerLookup::Found(Arc::clone(timeline)),
                None => TriggerLookup::Missing(name),
            },
        }
    }

    /// Timeline names, sorted
    pub fn timeline_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.timelines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Trigger mappings as `(tag, timeline)`, sorted by tag
    pub fn triggers(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .triggers
            .iter()
            .map(|(tag, name)| (tag.as_str(), name.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn vis_groups(&self) -> &HashMap<String, Vec<String>> {
        &self.vis_groups
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }
}
