//! Trigger facade
//!
//! [`TimelineRuntime`] is the one object a host talks to. Triggers call
//! [`start_timeline`](TimelineRuntime::start_timeline) or
//! [`cancel_and_reset`](TimelineRuntime::cancel_and_reset) from any thread;
//! the host's frame callback calls [`tick`](TimelineRuntime::tick).

mod dispatch;
mod events;

#[cfg(test)]
mod runtime_tests;

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tandem_types::ResetPolicy;

use crate::effects::SinkSet;
use crate::ids::{Generation, Handle, SubjectId};
use crate::registry::SessionRegistry;
use crate::scheduler::{plan_reverts, EffectOp, Scheduler};
use crate::timeline::{Timeline, TimelineBook};

pub use dispatch::{Dispatcher, InlineDispatcher, QueueDispatcher, Task};
pub use events::{EventOutcome, FixedPartner, PartnerResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartOutcome {
    Started { generation: Generation },
    /// The subject started this same timeline inside the debounce window
    Debounced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CancelReport {
    /// Generation after the cancel
    pub generation: Generation,
    pub was_running: bool,
    /// Reverts handed to the dispatcher
    pub reverted: usize,
    /// Touched keys left alone by the reset policy
    pub skipped: usize,
    /// Touched keys whose role had no known handle
    pub unbound: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Effect ops handed to the dispatcher (stale ones are dropped later)
    pub dispatched: usize,
    pub completed: Vec<SubjectId>,
}

pub struct TimelineRuntime {
    registry: Arc<SessionRegistry>,
    sinks: Arc<SinkSet>,
    dispatcher: Arc<dyn Dispatcher>,
    book: RwLock<Arc<TimelineBook>>,
    scheduler: Scheduler,
}

impl TimelineRuntime {
    /// Runtime that applies effects inline on the calling thread
    pub fn new(book: TimelineBook, sinks: SinkSet) -> Self {
        Self::with_dispatcher(book, sinks, Arc::new(InlineDispatcher))
    }

    pub fn with_dispatcher(
        book: TimelineBook,
        sinks: SinkSet,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            sinks: Arc::new(sinks),
            dispatcher,
            book: RwLock::new(Arc::new(book)),
            scheduler: Scheduler::new(),
        }
    }

    // --- Book ---

    pub fn book(&self) -> Arc<TimelineBook> {
        Arc::clone(&self.book.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new book. Running sessions keep the timelines they started with.
    pub fn reload(&self, book: TimelineBook) {
        tracing::info!(
            timelines = book.timeline_count(),
            triggers = book.trigger_count(),
            "Reloading timeline book"
        );
        *self.book.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(book);
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // --- Triggers ---

    /// Start `timeline` for `subject`, replacing whatever it was running.
    ///
    /// A repeated start of the same timeline for the same subject inside the
    /// configured debounce window is ignored entirely. Cancelling clears the
    /// window.
    pub fn start_timeline(
        &self,
        subject: SubjectId,
        initiator: Handle,
        partner: Option<Handle>,
        timeline: Arc<Timeline>,
    ) -> StartOutcome {
        let book = self.book();
        let window = book.settings.general.debounce_secs;
        let name = timeline.name().to_string();
        let command_count = timeline.len();

        match self
            .registry
            .begin_debounced(subject, initiator, partner, timeline, window)
        {
            Ok(generation) => {
                if book.settings.debug.log_timeline_start {
                    tracing::info!(
                        %subject,
                        timeline = %name,
                        %initiator,
                        partner = ?partner,
                        commands = command_count,
                        %generation,
                        "Timeline started"
                    );
                }
                StartOutcome::Started { generation }
            }
            Err(debounced) => {
                tracing::debug!(
                    %subject,
                    timeline = %name,
                    since_secs = debounced.since_secs,
                    "Start debounced"
                );
                StartOutcome::Debounced
            }
        }
    }

    /// Cancel whatever `subject` is running and revert every touched key whose
    /// category `policy` enables.
    pub fn cancel_and_reset(&self, subject: SubjectId, policy: &ResetPolicy) -> CancelReport {
        let snapshot = self.registry.cancel(subject);
        let plan = plan_reverts(subject, snapshot.touched, policy);
        let report = CancelReport {
            generation: snapshot.generation,
            was_running: snapshot.was_running,
            reverted: plan.ops.len(),
            skipped: plan.skipped,
            unbound: plan.unbound,
        };

        tracing::debug!(
            %subject,
            generation = %report.generation,
            was_running = report.was_running,
            reverted = report.reverted,
            skipped = report.skipped,
            "Cancelled"
        );

        self.dispatch(plan.ops);
        report
    }

    // --- Frame ---

    /// Advance every live session by `dt` seconds of host time
    pub fn tick(&self, dt: f32) -> TickReport {
        let book = self.book();
        let output = self
            .scheduler
            .advance(&self.registry, dt, &book.settings.general);
        let report = TickReport {
            dispatched: output.ops.len(),
            completed: output.completed,
        };
        self.dispatch(output.ops);
        report
    }

    fn dispatch(&self, ops: Vec<EffectOp>) {
        if ops.is_empty() {
            return;
        }
        let log_ops = self.book().settings.debug.log_ops;
        for op in ops {
            let registry = Arc::clone(&self.registry);
            let sinks = Arc::clone(&self.sinks);
            self.dispatcher.dispatch(Box::new(move || {
                dispatch::execute(&registry, &sinks, &op, log_ops);
            }));
        }
    }
}

impl std::fmt::Debug for TimelineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineRuntime")
            .field("live_sessions", &self.registry.live_sessions())
            .finish_non_exhaustive()
    }
}
