//! `[General]` and `[Debug]` keys.
//!
//! Key names match case-insensitively and accept the older spellings used by
//! existing timeline files (`bEnableHeadScaleTimelines`, `bLogHeadScale`, ...).

use tandem_types::{DebugSettings, GeneralSettings};
use thiserror::Error;

use super::text::{parse_bool, parse_float};

#[derive(Debug, Error, Clone, PartialEq)]
pub(crate) enum SettingError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for '{key}'")]
    BadValue { key: String, value: String },
}

fn key_is(key: &str, names: &[&str]) -> bool {
    names.iter().any(|n| key.eq_ignore_ascii_case(n))
}

fn bool_value(key: &str, value: &str) -> Result<bool, SettingError> {
    parse_bool(value).ok_or_else(|| SettingError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub(crate) fn apply_general(
    general: &mut GeneralSettings,
    key: &str,
    value: &str,
) -> Result<(), SettingError> {
    let flag: &mut bool = if key_is(
        key,
        &["enableTimelines", "bEnableTimelines", "bEnableHeadScaleTimelines"],
    ) {
        &mut general.enable_timelines
    } else if key_is(key, &["resetOnPairEnd", "bResetOnPairEnd"]) {
        &mut general.reset_on_pair_end
    } else if key_is(key, &["resetOnPairedStop", "bResetOnPairedStop"]) {
        &mut general.reset_on_paired_stop
    } else if key_is(key, &["resetScalesOnPairEnd"]) {
        &mut general.reset_scales_on_pair_end
    } else if key_is(key, &["resetScalesOnPairedStop"]) {
        &mut general.reset_scales_on_paired_stop
    } else if key_is(key, &["resetMorphsOnPairEnd"]) {
        &mut general.reset_morphs_on_pair_end
    } else if key_is(key, &["resetMorphsOnPairedStop"]) {
        &mut general.reset_morphs_on_paired_stop
    } else if key_is(key, &["resetVisibilityOnPairEnd"]) {
        &mut general.reset_visibility_on_pair_end
    } else if key_is(key, &["resetVisibilityOnPairedStop"]) {
        &mut general.reset_visibility_on_paired_stop
    } else if key_is(key, &["resetOnComplete"]) {
        &mut general.reset_on_complete
    } else if key_is(key, &["startDebounceSeconds", "debounceSeconds"]) {
        general.debounce_secs = parse_float(value)
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| SettingError::BadValue {
                key: key.to_string(),
                value: value.to_string(),
            })?;
        return Ok(());
    } else if key_is(key, &["maxTickSeconds", "maxDeltaSeconds"]) {
        general.max_tick_secs = parse_float(value)
            .filter(|v| *v > 0.0)
            .ok_or_else(|| SettingError::BadValue {
                key: key.to_string(),
                value: value.to_string(),
            })?;
        return Ok(());
    } else if key_is(key, &["pairEndTag"]) {
        general.pair_end_tag = non_empty(key, value)?;
        return Ok(());
    } else if key_is(key, &["pairedStopTag"]) {
        general.paired_stop_tag = non_empty(key, value)?;
        return Ok(());
    } else {
        return Err(SettingError::UnknownKey(key.to_string()));
    };

    *flag = bool_value(key, value)?;
    Ok(())
}

pub(crate) fn apply_debug(
    debug: &mut DebugSettings,
    key: &str,
    value: &str,
) -> Result<(), SettingError> {
    let flag: &mut bool = if key_is(key, &["bStrictIni", "strictIni", "strict"]) {
        &mut debug.strict
    } else if key_is(key, &["bLogOps", "bLogHeadScale", "logOps"]) {
        &mut debug.log_ops
    } else if key_is(key, &["bLogIni", "logIni", "logParse"]) {
        &mut debug.log_parse
    } else if key_is(key, &["bLogTargetResolve", "logTargetResolve", "logPartnerResolve"]) {
        &mut debug.log_partner_resolve
    } else if key_is(key, &["bLogTimelineStart", "logTimelineStart"]) {
        &mut debug.log_timeline_start
    } else {
        return Err(SettingError::UnknownKey(key.to_string()));
    };

    *flag = bool_value(key, value)?;
    Ok(())
}

fn non_empty(key: &str, value: &str) -> Result<String, SettingError> {
    if value.is_empty() {
        Err(SettingError::BadValue {
            key: key.to_string(),
            value: String::new(),
        })
    } else {
        Ok(value.to_string())
    }
}
