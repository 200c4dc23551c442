//! Deferred execution of effect operations.
//!
//! Hosts usually require sink calls to happen on one serialized thread. The
//! runtime hands every [`EffectOp`] to a [`Dispatcher`] as a task; each task
//! re-checks its generation right before calling the sink.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::effects::SinkSet;
use crate::error::SinkError;
use crate::registry::SessionRegistry;
use crate::scheduler::{EffectOp, OpAction};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Runs every task on the calling thread, immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// FIFO queue drained by the host with [`QueueDispatcher::run_pending`]
#[derive(Default)]
pub struct QueueDispatcher {
    queue: Mutex<VecDeque<Task>>,
}

impl QueueDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run every queued task in order, including tasks queued while running.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Pop under the lock, run outside it
            let task = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(task) = task else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: Task) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }
}

impl std::fmt::Debug for QueueDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueDispatcher")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Run one op against its sink. Guarded ops are dropped if their generation
/// is stale and recorded as touched otherwise.
pub(crate) fn execute(registry: &SessionRegistry, sinks: &SinkSet, op: &EffectOp, log_ops: bool) {
    if let Some(generation) = op.guard
        && !registry.touch_if_current(op.subject, generation, op.role, &op.key, op.kind)
    {
        tracing::trace!(
            subject = %op.subject,
            %generation,
            key = %op.key,
            "Dropping stale effect op"
        );
        return;
    }

    let sink = sinks.for_kind(op.kind);
    let result = match op.action {
        OpAction::Apply(value) => sink.apply(op.target, &op.key, value),
        OpAction::Increment(delta) => sink.apply_incremental(op.target, &op.key, delta),
        OpAction::Revert => sink.revert(op.target, &op.key),
    };

    match result {
        Ok(()) => {
            if log_ops {
                tracing::debug!(
                    subject = %op.subject,
                    role = %op.role,
                    kind = %op.kind,
                    target = %op.target,
                    key = %op.key,
                    action = ?op.action,
                    "Effect applied"
                );
            }
        }
        Err(SinkError::HandleExpired(handle)) => {
            tracing::debug!(subject = %op.subject, %handle, key = %op.key, "Handle expired, skipping");
        }
        Err(e) => {
            tracing::warn!(
                subject = %op.subject,
                kind = %op.kind,
                key = %op.key,
                error = %e,
                "Effect sink failed"
            );
        }
    }
}
