//! Action token parsing: `Name_Key(arg[, duration[, curve]])`.

use thiserror::Error;

use super::text::{parse_bool, parse_float};
use crate::timeline::{EffectKind, TweenCurve};

/// Marker every partner-role token starts with
pub const PARTNER_PREFIX: &str = "2_";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("expected Name_Key(args)")]
    Syntax,

    #[error("missing effect key")]
    MissingKey,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("{kind} takes {expected} argument(s), got {got}")]
    ArgCount {
        kind: EffectKind,
        expected: &'static str,
        got: usize,
    },

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("'{0}' is not a boolean")]
    NotABool(String),

    #[error("unknown tween curve '{0}'")]
    UnknownCurve(String),
}

/// A successfully parsed action token, before key resolution and clamping
#[derive(Debug, Clone, PartialEq)]
pub struct ActionToken {
    pub kind: EffectKind,
    pub key: String,
    pub magnitude: f32,
    /// `(duration, curve)` when a positive duration was given
    pub tween: Option<(f32, TweenCurve)>,
}

/// Map an action name to its effect kind
pub fn action_kind(name: &str) -> Option<EffectKind> {
    const SCALE: [&str; 2] = ["scale", "fbscale"];
    const MORPH: [&str; 2] = ["morph", "fbmorph"];
    const VIS: [&str; 4] = ["vis", "visible", "fbvis", "fbvisible"];

    let matches = |names: &[&str]| names.iter().any(|n| name.eq_ignore_ascii_case(n));
    if matches(&SCALE) {
        Some(EffectKind::Scale)
    } else if matches(&MORPH) {
        Some(EffectKind::Morph)
    } else if matches(&VIS) {
        Some(EffectKind::Visibility)
    } else {
        None
    }
}

/// Parse a token with the role prefix already removed
pub fn parse_action(token: &str) -> Result<ActionToken, TokenError> {
    let token = token.trim();
    let open = token.find('(').ok_or(TokenError::Syntax)?;
    let inner = token[open + 1..]
        .strip_suffix(')')
        .ok_or(TokenError::Syntax)?;
    let head = &token[..open];
    if head.chars().any(char::is_whitespace) || inner.contains(['(', ')']) {
        return Err(TokenError::Syntax);
    }

    let (name, key) = head.split_once('_').ok_or(TokenError::MissingKey)?;
    if key.is_empty() {
        return Err(TokenError::MissingKey);
    }
    let kind = action_kind(name).ok_or_else(|| TokenError::UnknownAction(name.to_string()))?;

    let args: Vec<&str> = inner.split(',').map(str::trim).collect();
    if args.iter().any(|a| a.is_empty()) {
        return Err(TokenError::Syntax);
    }

    let number = |s: &str| parse_float(s).ok_or_else(|| TokenError::NotANumber(s.to_string()));

    let (magnitude, tween) = match kind {
        EffectKind::Scale => {
            let &[value] = args.as_slice() else {
                return Err(TokenError::ArgCount { kind, expected: "1", got: args.len() });
            };
            (number(value)?, None)
        }
        EffectKind::Visibility => {
            let &[value] = args.as_slice() else {
                return Err(TokenError::ArgCount { kind, expected: "1", got: args.len() });
            };
            let visible = parse_bool(value).ok_or_else(|| TokenError::NotABool(value.to_string()))?;
            (if visible { 1.0 } else { 0.0 }, None)
        }
        EffectKind::Morph => match *args.as_slice() {
            [value] => (number(value)?, None),
            [value, duration] => (number(value)?, tween_of(number(duration)?, TweenCurve::Linear)),
            [value, duration, curve] => {
                let curve = TweenCurve::from_name(curve)
                    .ok_or_else(|| TokenError::UnknownCurve(curve.to_string()))?;
                (number(value)?, tween_of(number(duration)?, curve))
            }
            _ => {
                return Err(TokenError::ArgCount { kind, expected: "1 to 3", got: args.len() });
            }
        },
    };

    Ok(ActionToken {
        kind,
        key: key.to_string(),
        magnitude,
        tween,
    })
}

fn tween_of(duration: f32, curve: TweenCurve) -> Option<(f32, TweenCurve)> {
    (duration > 0.0).then_some((duration, curve))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_token() {
        let t = parse_action("Scale_Head(0.5)").unwrap();
        assert_eq!(t.kind, EffectKind::Scale);
        assert_eq!(t.key, "Head");
        assert_eq!(t.magnitude, 0.5);
        assert_eq!(t.tween, None);
    }

    #[test]
    fn legacy_action_names() {
        assert_eq!(parse_action("FBScale_Head(2)").unwrap().kind, EffectKind::Scale);
        assert_eq!(parse_action("fbmorph_Belly(2)").unwrap().kind, EffectKind::Morph);
        assert_eq!(parse_action("FBVisible_Hat(false)").unwrap().kind, EffectKind::Visibility);
    }

    #[test]
    fn key_keeps_inner_underscores() {
        let t = parse_action("Morph_Vore_Prey_Belly(10)").unwrap();
        assert_eq!(t.key, "Vore_Prey_Belly");
    }

    #[test]
    fn morph_with_tween_and_curve() {
        let t = parse_action("Morph_Belly(40, 2.0)").unwrap();
        assert_eq!(t.tween, Some((2.0, TweenCurve::Linear)));

        let t = parse_action("Morph_Belly(40, 1.5, EaseIn)").unwrap();
        assert_eq!(t.tween, Some((1.5, TweenCurve::EaseIn)));
    }

    #[test]
    fn zero_duration_is_instant() {
        let t = parse_action("Morph_Belly(40, 0)").unwrap();
        assert_eq!(t.tween, None);
    }

    #[test]
    fn visibility_takes_bool() {
        assert_eq!(parse_action("Vis_Hat(off)").unwrap().magnitude, 0.0);
        assert_eq!(parse_action("Vis_Hat(1)").unwrap().magnitude, 1.0);
        assert_eq!(
            parse_action("Vis_Hat(sometimes)"),
            Err(TokenError::NotABool("sometimes".to_string()))
        );
    }

    #[test]
    fn malformed_tokens() {
        assert_eq!(parse_action("Scale_Head"), Err(TokenError::Syntax));
        assert_eq!(parse_action("Scale_Head(1"), Err(TokenError::Syntax));
        assert_eq!(parse_action("Scale_Head()"), Err(TokenError::Syntax));
        assert_eq!(parse_action("ScaleHead(1)"), Err(TokenError::MissingKey));
        assert_eq!(parse_action("Scale_(1)"), Err(TokenError::MissingKey));
        assert_eq!(
            parse_action("Spin_Head(1)"),
            Err(TokenError::UnknownAction("Spin".to_string()))
        );
        assert_eq!(
            parse_action("Scale_Head(big)"),
            Err(TokenError::NotANumber("big".to_string()))
        );
    }

    #[test]
    fn scale_rejects_tween_arguments() {
        assert!(matches!(
            parse_action("Scale_Head(1, 2)"),
            Err(TokenError::ArgCount { kind: EffectKind::Scale, got: 2, .. })
        ));
    }
}
