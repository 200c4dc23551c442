//! Per-subject session bookkeeping
//!
//! One [`SubjectRecord`] per subject id holds the generation token, the role
//! handles, the touched-key set and the running session (if any). Every
//! operation takes the single registry lock, does its bookkeeping and returns;
//! no sink is ever called while the lock is held.
//!
//! Generations come from one registry-wide counter, so a record can be pruned
//! once it has nothing left to remember and a later start still gets a fresh
//! token. Subjects without a record report `Generation(0)`.

mod session;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use crate::ids::{Generation, Handle, SubjectId};
use crate::timeline::{EffectKind, Role, Timeline};

pub use session::{
    CancelSnapshot, Session, SessionSnapshot, SessionState, TouchedKey, TouchedSnapshot,
};

#[derive(Debug, Default)]
struct SubjectRecord {
    generation: Generation,
    /// Last initiator seen; kept across cancels so touched keys can be reverted
    initiator: Option<Handle>,
    /// Last partner seen; kept across cancels and reused by later starts
    partner: Option<Handle>,
    touched: BTreeSet<TouchedKey>,
    session: Option<Session>,
    last_outcome: SessionState,
    /// Timeline name and registry clock reading of the last accepted start
    last_start: Option<(String, f64)>,
    /// A session completed with reset-on-complete; its keys revert next tick
    reset_pending: bool,
    /// The current generation was handed to a session, so effect work for it
    /// may still be queued
    generation_in_use: bool,
}

impl SubjectRecord {
    /// Move to `generation` and drop all progress of the current one
    fn invalidate(&mut self, generation: Generation) -> Generation {
        self.generation = generation;
        self.touched.clear();
        self.reset_pending = false;
        self.generation_in_use = false;
        if self.session.take().is_some() {
            self.last_outcome = SessionState::Cancelled;
        }
        self.generation
    }

    /// Nothing running or queued, nothing to revert, no partner to remember
    /// and no start recent enough to debounce against
    fn is_settled(&self, now: f64, window_secs: f32) -> bool {
        self.session.is_none()
            && !self.generation_in_use
            && !self.reset_pending
            && self.touched.is_empty()
            && self.partner.is_none()
            && self
                .last_start
                .as_ref()
                .is_none_or(|(_, at)| now - at >= f64::from(window_secs))
    }

    fn drain(&mut self) -> TouchedSnapshot {
        TouchedSnapshot {
            initiator: self.initiator,
            partner: self.partner,
            keys: std::mem::take(&mut self.touched).into_iter().collect(),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    subjects: HashMap<SubjectId, SubjectRecord>,
    /// Last generation handed out to any subject
    last_generation: Generation,
    /// Seconds of host time seen by `advance`, unclamped
    clock_secs: f64,
}

fn next_generation(last: &mut Generation) -> Generation {
    *last = last.next();
    *last
}

/// A start refused because the same timeline started too recently
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Debounced {
    pub since_secs: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AdvanceOptions {
    pub reset_on_complete: bool,
    /// Records are kept at least this long after their last start
    pub debounce_secs: f32,
}

/// A session that ran out during `advance`
#[derive(Debug)]
pub(crate) struct Completion {
    pub subject: SubjectId,
    pub timeline: Arc<Timeline>,
}

/// Touched keys of a session that completed on the previous tick
#[derive(Debug)]
pub(crate) struct CompletionReset {
    pub subject: SubjectId,
    pub touched: TouchedSnapshot,
}

#[derive(Debug, Default)]
pub(crate) struct Advanced {
    pub completions: Vec<Completion>,
    pub resets: Vec<CompletionReset>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Generations ---

    /// Invalidate everything in flight for `subject`: touched keys, tweens and
    /// the running session. Returns the new generation.
    pub fn bump_generation(&self, subject: SubjectId) -> Generation {
        let mut guard = self.lock();
        let state = &mut *guard;
        let generation = next_generation(&mut state.last_generation);
        state.subjects.entry(subject).or_default().invalidate(generation)
    }

    pub fn current_generation(&self, subject: SubjectId) -> Generation {
        self.lock()
            .subjects
            .get(&subject)
            .map(|r| r.generation)
            .unwrap_or_default()
    }

    pub fn is_current(&self, subject: SubjectId, generation: Generation) -> bool {
        self.current_generation(subject) == generation
    }

    // --- Touched keys ---

    pub fn touch(&self, subject: SubjectId, role: Role, key: &str, kind: EffectKind) {
        self.lock()
            .subjects
            .entry(subject)
            .or_default()
            .touched
            .insert(TouchedKey::new(role, kind, key));
    }

    /// Record `key` as touched only if `generation` is still current.
    ///
    /// Deferred effect work calls this right before it applies; a `false`
    /// return means the work is stale and must be dropped.
    pub fn touch_if_current(
        &self,
        subject: SubjectId,
        generation: Generation,
        role: Role,
        key: &str,
        kind: EffectKind,
    ) -> bool {
        let mut state = self.lock();
        let Some(record) = state.subjects.get_mut(&subject) else {
            return false;
        };
        if record.generation != generation {
            return false;
        }
        record.touched.insert(TouchedKey::new(role, kind, key));
        true
    }

    /// Remove and return every touched key of `subject`
    pub fn drain_touched(&self, subject: SubjectId) -> TouchedSnapshot {
        self.lock()
            .subjects
            .get_mut(&subject)
            .map(SubjectRecord::drain)
            .unwrap_or_default()
    }

    pub fn touched_count(&self, subject: SubjectId) -> usize {
        self.lock()
            .subjects
            .get(&subject)
            .map_or(0, |r| r.touched.len())
    }

    // --- Role handles ---

    pub fn set_partner_handle(&self, subject: SubjectId, partner: Option<Handle>) {
        self.lock().subjects.entry(subject).or_default().partner = partner;
    }

    pub fn partner_handle(&self, subject: SubjectId) -> Option<Handle> {
        self.lock().subjects.get(&subject).and_then(|r| r.partner)
    }

    // --- Session lifecycle ---

    /// Bump the generation and install a fresh running session
    pub fn begin_session(
        &self,
        subject: SubjectId,
        initiator: Handle,
        partner: Option<Handle>,
        timeline: Arc<Timeline>,
    ) -> Generation {
        match self.begin_inner(subject, initiator, partner, timeline, None) {
            Ok(generation) | Err((generation, _)) => generation,
        }
    }

    /// Like [`begin_session`](Self::begin_session), but refuses when the
    /// subject accepted a start of the same timeline less than `window_secs`
    /// of registry clock ago. A refused start changes nothing.
    pub(crate) fn begin_debounced(
        &self,
        subject: SubjectId,
        initiator: Handle,
        partner: Option<Handle>,
        timeline: Arc<Timeline>,
        window_secs: f32,
    ) -> Result<Generation, Debounced> {
        self.begin_inner(subject, initiator, partner, timeline, Some(window_secs))
            .map_err(|(_, debounced)| debounced)
    }

    fn begin_inner(
        &self,
        subject: SubjectId,
        initiator: Handle,
        partner: Option<Handle>,
        timeline: Arc<Timeline>,
        window_secs: Option<f32>,
    ) -> Result<Generation, (Generation, Debounced)> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = state.clock_secs;
        let record = state.subjects.entry(subject).or_default();

        if let Some(window) = window_secs
            && let Some((name, at)) = &record.last_start
            && name == timeline.name()
            && now - at < f64::from(window)
        {
            return Err((
                record.generation,
                Debounced {
                    since_secs: now - at,
                },
            ));
        }

        let generation = record.invalidate(next_generation(&mut state.last_generation));
        record.generation_in_use = true;
        record.initiator = Some(initiator);
        record.partner = partner;
        record.last_start = Some((timeline.name().to_string(), now));
        record.session = Some(Session::new(timeline, generation, initiator, partner));
        record.last_outcome = SessionState::Running;
        Ok(generation)
    }

    /// Bump the generation and drain the touched keys in one step.
    ///
    /// Also forgets the last start, so the next trigger is never debounced.
    pub fn cancel(&self, subject: SubjectId) -> CancelSnapshot {
        let mut guard = self.lock();
        let state = &mut *guard;
        let record = state.subjects.entry(subject).or_default();
        let was_running = record.session.is_some();
        let touched = record.drain();
        let generation = record.invalidate(next_generation(&mut state.last_generation));
        record.last_start = None;
        CancelSnapshot {
            generation,
            was_running,
            touched,
        }
    }

    /// Advance every running session through `step`, in subject order.
    ///
    /// `step` returns true once a session has nothing left to do; that session
    /// is removed and reported as completed in the same call. With
    /// `reset_on_complete` its touched keys are drained on the following call,
    /// after the final effect work has been dispatched, and the generation is
    /// bumped so anything still queued for it is dropped.
    ///
    /// Records left settled by earlier calls are pruned first.
    pub(crate) fn advance<F>(&self, raw_dt: f32, options: AdvanceOptions, mut step: F) -> Advanced
    where
        F: FnMut(SubjectId, &mut Session) -> bool,
    {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.clock_secs += f64::from(raw_dt);
        let now = state.clock_secs;
        state
            .subjects
            .retain(|_, record| !record.is_settled(now, options.debounce_secs));

        let mut live: Vec<SubjectId> = state
            .subjects
            .iter()
            .filter(|(_, r)| r.session.is_some() || r.reset_pending)
            .map(|(id, _)| *id)
            .collect();
        live.sort_unstable();

        let mut advanced = Advanced::default();
        for subject in live {
            let Some(record) = state.subjects.get_mut(&subject) else {
                continue;
            };

            if record.reset_pending {
                record.reset_pending = false;
                let touched = record.drain();
                record.generation = next_generation(&mut state.last_generation);
                record.generation_in_use = false;
                advanced.resets.push(CompletionReset { subject, touched });
                continue;
            }

            let Some(session) = record.session.as_mut() else {
                continue;
            };
            if !step(subject, session) {
                continue;
            }

            let Some(finished) = record.session.take() else {
                continue;
            };
            record.last_outcome = SessionState::Completed;
            record.reset_pending = options.reset_on_complete;
            advanced.completions.push(Completion {
                subject,
                timeline: finished.timeline,
            });
        }
        advanced
    }

    // --- Queries ---

    pub fn live_sessions(&self) -> usize {
        self.lock()
            .subjects
            .values()
            .filter(|r| r.session.is_some())
            .count()
    }

    pub fn session_state(&self, subject: SubjectId) -> SessionState {
        self.lock()
            .subjects
            .get(&subject)
            .map(|r| {
                if r.session.is_some() {
                    SessionState::Running
                } else {
                    r.last_outcome
                }
            })
            .unwrap_or_default()
    }

    pub fn session_snapshot(&self, subject: SubjectId) -> Option<SessionSnapshot> {
        self.lock()
            .subjects
            .get(&subject)
            .and_then(|r| r.session.as_ref())
            .map(Session::snapshot)
    }

    /// Subjects the registry currently keeps a record for
    pub fn subject_count(&self) -> usize {
        self.lock().subjects.len()
    }

    /// Host seconds seen so far
    pub fn clock_secs(&self) -> f64 {
        self.lock().clock_secs
    }
}
