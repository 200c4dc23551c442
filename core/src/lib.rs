//! Tandem core: time-triggered effect timelines for paired subjects.
//!
//! # Architecture
//!
//! ```text
//!   timeline text ──► dsl::parse ──► TimelineBook (shared, read-only)
//!                                          │
//!   host trigger ──► TimelineRuntime::start_timeline / handle_event
//!                                          │
//!                                   SessionRegistry  (one lock, generation tokens)
//!                                          │
//!   host frame  ──► TimelineRuntime::tick ─► Scheduler + tweens ─► EffectOp
//!                                                                   │
//!                                       Dispatcher (deferred queue) │
//!                                                                   ▼
//!                                                       SinkSet (scale / morph / visibility)
//! ```
//!
//! Cancellation is cooperative: every effect operation carries the generation
//! it was produced under and is dropped if that generation is no longer current
//! when the dispatcher gets around to running it.

pub mod config;
pub mod dsl;
pub mod effects;
pub mod error;
pub mod ids;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod timeline;

pub use dsl::{
    parse, IdentityResolver, KeyResolver, ParseOptions, ParseOutput, ParseWarning, TableResolver,
};
pub use effects::{EffectSink, SinkSet, ValueMode, ValueModel};
pub use error::{ConfigError, SinkError};
pub use ids::{Generation, Handle, SubjectId};
pub use registry::{SessionRegistry, SessionState, TouchedKey};
pub use runtime::{
    CancelReport, Dispatcher, EventOutcome, FixedPartner, InlineDispatcher, PartnerResolver,
    QueueDispatcher, StartOutcome, TickReport, TimelineRuntime,
};
pub use scheduler::{EffectOp, OpAction, Scheduler, MAX_TICK_SECS};
pub use tandem_types::{GeneralSettings, ResetPolicy, Settings};
pub use timeline::{Command, EffectKind, Role, Timeline, TimelineBook, TriggerLookup, TweenCurve};
