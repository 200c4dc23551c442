//! Per-tick advancement of every live session
//!
//! The scheduler never calls a sink. It turns due commands and tween progress
//! into [`EffectOp`]s under the registry lock; the runtime dispatches them
//! afterwards.

pub mod tween;

use std::sync::Arc;

use serde::Serialize;
use tandem_types::{GeneralSettings, ResetPolicy, DEFAULT_MAX_TICK_SECS};

use crate::ids::{Generation, Handle, SubjectId};
use crate::registry::{AdvanceOptions, Session, SessionRegistry, TouchedSnapshot};
use crate::timeline::{Command, EffectKind, Role};

/// Default ceiling for one frame delta, so a stalled host does not replay a
/// whole timeline in one frame. `GeneralSettings::max_tick_secs` overrides it.
pub const MAX_TICK_SECS: f32 = DEFAULT_MAX_TICK_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum OpAction {
    /// Set an absolute value
    Apply(f32),
    /// Add a delta
    Increment(f32),
    /// Restore the baseline
    Revert,
}

/// One sink call waiting to be dispatched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectOp {
    pub subject: SubjectId,
    /// Generation the op was produced under; `None` for reverts, which run
    /// regardless of later starts
    pub guard: Option<Generation>,
    pub role: Role,
    pub kind: EffectKind,
    pub target: Handle,
    pub key: String,
    pub action: OpAction,
}

impl EffectOp {
    pub fn guarded(
        subject: SubjectId,
        generation: Generation,
        role: Role,
        kind: EffectKind,
        target: Handle,
        key: String,
        action: OpAction,
    ) -> Self {
        Self {
            subject,
            guard: Some(generation),
            role,
            kind,
            target,
            key,
            action,
        }
    }

    pub fn revert(subject: SubjectId, role: Role, kind: EffectKind, target: Handle, key: String) -> Self {
        Self {
            subject,
            guard: None,
            role,
            kind,
            target,
            key,
            action: OpAction::Revert,
        }
    }
}

/// Outcome of building reverts for a drained touched set
#[derive(Debug, Default)]
pub(crate) struct RevertPlan {
    pub ops: Vec<EffectOp>,
    /// Disabled by the reset policy
    pub skipped: usize,
    /// No handle known for the key's role
    pub unbound: usize,
}

pub(crate) fn plan_reverts(
    subject: SubjectId,
    touched: TouchedSnapshot,
    policy: &ResetPolicy,
) -> RevertPlan {
    let mut plan = RevertPlan::default();
    let TouchedSnapshot {
        initiator,
        partner,
        keys,
    } = touched;
    for key in keys {
        let enabled = match key.kind {
            EffectKind::Scale => policy.scales,
            EffectKind::Morph => policy.morphs,
            EffectKind::Visibility => policy.visibility,
        };
        if !enabled {
            plan.skipped += 1;
            continue;
        }
        let handle = match key.role {
            Role::Initiator => initiator,
            Role::Partner => partner,
        };
        let Some(target) = handle else {
            plan.unbound += 1;
            continue;
        };
        plan.ops
            .push(EffectOp::revert(subject, key.role, key.kind, target, key.key));
    }
    plan
}

/// What one tick produced
#[derive(Debug, Default)]
pub struct TickOutput {
    pub ops: Vec<EffectOp>,
    pub completed: Vec<SubjectId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    pub fn new() -> Self {
        Self
    }

    /// The step a tick actually advances by, or `None` for a no-op tick.
    ///
    /// A zero `dt` advances no time but still runs commands that are already
    /// due. `max_secs` falls back to [`MAX_TICK_SECS`] unless it is positive.
    pub fn effective_dt(dt: f32, max_secs: f32) -> Option<f32> {
        let ceiling = if max_secs.is_finite() && max_secs > 0.0 {
            max_secs
        } else {
            MAX_TICK_SECS
        };
        (dt.is_finite() && dt >= 0.0).then(|| dt.min(ceiling))
    }

    /// Advance every live session by `dt`.
    ///
    /// A session is completed and removed in the tick that runs its last
    /// command and finishes its last tween. With `reset_on_complete` the reverts
    /// for everything it touched come out of the following tick.
    pub fn advance(&self, registry: &SessionRegistry, dt: f32, general: &GeneralSettings) -> TickOutput {
        let Some(step) = Self::effective_dt(dt, general.max_tick_secs) else {
            return TickOutput::default();
        };

        let options = AdvanceOptions {
            reset_on_complete: general.reset_on_complete,
            debounce_secs: general.debounce_secs,
        };
        let mut ops = Vec::new();
        let advanced = registry.advance(dt, options, |subject, session| {
            step_session(subject, session, step, &mut ops)
        });

        for reset in advanced.resets {
            let plan = plan_reverts(reset.subject, reset.touched, &ResetPolicy::ALL);
            tracing::debug!(
                subject = %reset.subject,
                reverted = plan.ops.len(),
                "Reverting completed timeline"
            );
            ops.extend(plan.ops);
        }

        let mut completed = Vec::with_capacity(advanced.completions.len());
        for completion in advanced.completions {
            tracing::debug!(
                subject = %completion.subject,
                timeline = %completion.timeline.name(),
                "Timeline completed"
            );
            completed.push(completion.subject);
        }
        TickOutput { ops, completed }
    }
}

/// Run due commands and tweens of one session. Returns true once the last
/// command has run and the last tween has finished.
fn step_session(subject: SubjectId, session: &mut Session, dt: f32, ops: &mut Vec<EffectOp>) -> bool {
    let timeline = Arc::clone(&session.timeline);
    let commands = timeline.commands();

    session.elapsed_secs += dt;

    while let Some(command) = commands.get(session.next_index)
        && command.time_offset_secs <= session.elapsed_secs
    {
        session.next_index += 1;
        run_command(subject, session, command, ops);
    }

    tween::advance_all(subject, session, ops);
    session.next_index >= commands.len() && session.tweens.is_empty()
}

fn run_command(subject: SubjectId, session: &mut Session, command: &Command, ops: &mut Vec<EffectOp>) {
    let Some(target) = session.handle_for(command.role) else {
        tracing::debug!(
            %subject,
            role = %command.role,
            key = %command.key,
            "No handle bound for role, skipping command"
        );
        return;
    };

    if command.is_tweened() {
        tween::start(subject, session, command, target, ops);
        return;
    }

    let action = match command.kind {
        EffectKind::Morph => OpAction::Increment(command.magnitude),
        EffectKind::Scale | EffectKind::Visibility => OpAction::Apply(command.magnitude),
    };
    ops.push(EffectOp::guarded(
        subject,
        session.generation,
        command.role,
        command.kind,
        target,
        command.key.clone(),
        action,
    ));
}
