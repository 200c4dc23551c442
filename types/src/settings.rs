//! Runtime settings for timelines, resets and diagnostics.
//!
//! Settings come from two places: the `[General]` / `[Debug]` sections of a
//! timeline file, or a standalone TOML file. Both fill the same structs.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Longest frame a single tick advances by unless configured otherwise
pub const DEFAULT_MAX_TICK_SECS: f32 = 0.25;

fn default_debounce_secs() -> f32 {
    0.2
}

fn default_max_tick_secs() -> f32 {
    DEFAULT_MAX_TICK_SECS
}

fn default_pair_end_tag() -> String {
    "PairEnd".to_string()
}

fn default_paired_stop_tag() -> String {
    "NPCPairedStop".to_string()
}

// ═══════════════════════════════════════════════════════════════════════════
// General
// ═══════════════════════════════════════════════════════════════════════════

/// Behaviour of timeline starts and lifecycle resets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Master switch; when off every trigger is ignored
    #[serde(default = "default_true")]
    pub enable_timelines: bool,

    // ─── Lifecycle resets ───────────────────────────────────────────────────
    /// Cancel and reset when the pair-end tag arrives
    #[serde(default = "default_true")]
    pub reset_on_pair_end: bool,

    /// Cancel and reset when the paired-stop tag arrives
    #[serde(default = "default_true")]
    pub reset_on_paired_stop: bool,

    #[serde(default = "default_true")]
    pub reset_scales_on_pair_end: bool,

    #[serde(default = "default_true")]
    pub reset_scales_on_paired_stop: bool,

    #[serde(default = "default_true")]
    pub reset_morphs_on_pair_end: bool,

    #[serde(default = "default_true")]
    pub reset_morphs_on_paired_stop: bool,

    #[serde(default = "default_true")]
    pub reset_visibility_on_pair_end: bool,

    #[serde(default = "default_true")]
    pub reset_visibility_on_paired_stop: bool,

    /// Revert everything a session touched, one tick after its timeline has
    /// run out. When off, final values stay until the next pair-end or
    /// paired-stop reset.
    #[serde(default)]
    pub reset_on_complete: bool,

    // ─── Triggers ───────────────────────────────────────────────────────────
    /// Repeated starts of the same timeline for one subject inside this
    /// window are ignored
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: f32,

    /// Frame deltas above this are clamped
    #[serde(default = "default_max_tick_secs")]
    pub max_tick_secs: f32,

    /// Tag that ends a pair (cancel + reset)
    #[serde(default = "default_pair_end_tag")]
    pub pair_end_tag: String,

    /// Tag sent when a paired animation is stopped early (cancel + reset)
    #[serde(default = "default_paired_stop_tag")]
    pub paired_stop_tag: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            enable_timelines: true,
            reset_on_pair_end: true,
            reset_on_paired_stop: true,
            reset_scales_on_pair_end: true,
            reset_scales_on_paired_stop: true,
            reset_morphs_on_pair_end: true,
            reset_morphs_on_paired_stop: true,
            reset_visibility_on_pair_end: true,
            reset_visibility_on_paired_stop: true,
            reset_on_complete: false,
            debounce_secs: default_debounce_secs(),
            max_tick_secs: DEFAULT_MAX_TICK_SECS,
            pair_end_tag: default_pair_end_tag(),
            paired_stop_tag: default_paired_stop_tag(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Debug
// ═══════════════════════════════════════════════════════════════════════════

/// Diagnostics toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSettings {
    /// Report malformed timeline lines instead of skipping them silently
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Log every effect operation
    #[serde(default = "default_true")]
    pub log_ops: bool,

    /// Log a summary after parsing
    #[serde(default = "default_true")]
    pub log_parse: bool,

    #[serde(default)]
    pub log_partner_resolve: bool,

    #[serde(default = "default_true")]
    pub log_timeline_start: bool,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            strict: true,
            log_ops: true,
            log_parse: true,
            log_partner_resolve: false,
            log_timeline_start: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Settings + Reset policy
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub debug: DebugSettings,
}

/// Which effect categories a cancel reverts.
///
/// Touched keys are always drained on cancel; categories switched off here are
/// simply left as they are on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPolicy {
    pub scales: bool,
    pub morphs: bool,
    pub visibility: bool,
}

impl ResetPolicy {
    pub const ALL: Self = Self {
        scales: true,
        morphs: true,
        visibility: true,
    };

    pub const NONE: Self = Self {
        scales: false,
        morphs: false,
        visibility: false,
    };

    /// Policy applied when the pair-end tag arrives
    pub fn for_pair_end(general: &GeneralSettings) -> Self {
        Self {
            scales: general.reset_scales_on_pair_end,
            morphs: general.reset_morphs_on_pair_end,
            visibility: general.reset_visibility_on_pair_end,
        }
    }

    /// Policy applied when the paired-stop tag arrives
    pub fn for_paired_stop(general: &GeneralSettings) -> Self {
        Self {
            scales: general.reset_scales_on_paired_stop,
            morphs: general.reset_morphs_on_paired_stop,
            visibility: general.reset_visibility_on_paired_stop,
        }
    }
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self::ALL
    }
}
