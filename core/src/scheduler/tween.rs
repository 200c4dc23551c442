//! Continuous interpolation for morph commands.
//!
//! A tween never writes absolute values. It remembers how much of its total
//! change it has already applied and emits the difference each tick, so other
//! writers to the same slider are left alone.

use serde::Serialize;

use super::{EffectOp, OpAction};
use crate::ids::{Handle, SubjectId};
use crate::registry::Session;
use crate::timeline::{Command, EffectKind, Role, TweenCurve};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub start_secs: f32,
    pub end_secs: f32,
    /// Portion of `to - from` already sent to the sink, offset by `from`
    pub applied: f32,
    pub target: Handle,
}

/// Result of one tween step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenStep {
    pub delta: f32,
    pub finished: bool,
}

impl Tween {
    /// `carried` is the applied value of the tween this one replaces
    pub fn new(carried: f32, magnitude: f32, start_secs: f32, duration_secs: f32, target: Handle) -> Self {
        Self {
            from: carried,
            to: carried + magnitude,
            start_secs,
            end_secs: start_secs + duration_secs.max(0.0),
            applied: carried,
            target,
        }
    }

    pub fn alpha(&self, elapsed_secs: f32) -> f32 {
        let duration = self.end_secs - self.start_secs;
        if duration <= 0.0 {
            return 1.0;
        }
        ((elapsed_secs - self.start_secs) / duration).clamp(0.0, 1.0)
    }

    /// Move to `elapsed_secs` and return the delta to apply
    pub fn step(&mut self, elapsed_secs: f32) -> TweenStep {
        let alpha = self.alpha(elapsed_secs);
        let finished = alpha >= 1.0;
        let target = if finished {
            self.to
        } else {
            self.from + (self.to - self.from) * alpha
        };
        let delta = target - self.applied;
        self.applied = target;
        TweenStep { delta, finished }
    }
}

/// Install a tween for `command`, replacing any tween on the same (role, key).
///
/// A replaced tween is first stepped to the command's offset, so the value it
/// hands over does not depend on where the previous frame ended.
pub(crate) fn start(
    subject: SubjectId,
    session: &mut Session,
    command: &Command,
    target: Handle,
    ops: &mut Vec<EffectOp>,
) {
    let duration = command.tween_secs.unwrap_or(0.0);
    if command.tween_curve != TweenCurve::Linear {
        tracing::warn!(
            %subject,
            key = %command.key,
            curve = ?command.tween_curve,
            "Only linear tweens are supported, using linear"
        );
    }

    let slot = (command.role, command.key.clone());
    let carried = match session.tweens.remove(&slot) {
        Some(mut prior) => {
            let step = prior.step(command.time_offset_secs);
            push_delta(subject, session, command.role, &command.key, prior.target, step.delta, ops);
            prior.applied
        }
        None => 0.0,
    };
    let tween = Tween::new(carried, command.magnitude, command.time_offset_secs, duration, target);
    session.tweens.insert(slot, tween);
}

/// Step every tween of `session`, emitting non-zero deltas and dropping
/// finished slots
pub(crate) fn advance_all(subject: SubjectId, session: &mut Session, ops: &mut Vec<EffectOp>) {
    let elapsed = session.elapsed_secs;
    let generation = session.generation;
    session.tweens.retain(|(role, key), tween| {
        let step = tween.step(elapsed);
        if step.delta != 0.0 {
            ops.push(EffectOp::guarded(
                subject,
                generation,
                *role,
                EffectKind::Morph,
                tween.target,
                key.clone(),
                OpAction::Increment(step.delta),
            ));
        }
        !step.finished
    });
}

fn push_delta(
    subject: SubjectId,
    session: &Session,
    role: Role,
    key: &str,
    target: Handle,
    delta: f32,
    ops: &mut Vec<EffectOp>,
) {
    if delta == 0.0 {
        return;
    }
    ops.push(EffectOp::guarded(
        subject,
        session.generation,
        role,
        EffectKind::Morph,
        target,
        key.to_string(),
        OpAction::Increment(delta),
    ));
}
