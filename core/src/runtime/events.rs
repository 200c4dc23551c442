//! Host event routing.
//!
//! Maps raw host event tags onto the facade: lifecycle tags cancel and reset,
//! mapped tags start their timeline, everything else is ignored.

use tandem_types::ResetPolicy;

use super::{CancelReport, StartOutcome, TimelineRuntime};
use crate::ids::{Generation, Handle, SubjectId};
use crate::timeline::TriggerLookup;

/// Finds the second subject of a pair. Only consulted for timelines that
/// address the partner role.
pub trait PartnerResolver {
    fn resolve_partner(&self, subject: SubjectId, initiator: Handle) -> Option<Handle>;
}

impl<F> PartnerResolver for F
where
    F: Fn(SubjectId, Handle) -> Option<Handle>,
{
    fn resolve_partner(&self, subject: SubjectId, initiator: Handle) -> Option<Handle> {
        self(subject, initiator)
    }
}

/// Always resolves to the same partner (or none)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPartner(pub Option<Handle>);

impl PartnerResolver for FixedPartner {
    fn resolve_partner(&self, _subject: SubjectId, _initiator: Handle) -> Option<Handle> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Timelines are switched off in settings
    Disabled,
    /// Tag is neither a lifecycle tag nor mapped
    Ignored,
    Reset(CancelReport),
    Started {
        timeline: String,
        generation: Generation,
    },
    Debounced,
    /// Tag maps to a timeline the book does not define
    MissingTimeline(String),
    /// Mapped timeline has no commands
    EmptyTimeline(String),
}

impl TimelineRuntime {
    /// Route one host event for `subject`
    pub fn handle_event(
        &self,
        subject: SubjectId,
        initiator: Handle,
        tag: &str,
        resolver: &dyn PartnerResolver,
    ) -> EventOutcome {
        let book = self.book();
        let general = &book.settings.general;
        let debug = &book.settings.debug;

        if !general.enable_timelines {
            return EventOutcome::Disabled;
        }

        if general.reset_on_pair_end && tag == general.pair_end_tag {
            let policy = ResetPolicy::for_pair_end(general);
            return EventOutcome::Reset(self.cancel_and_reset(subject, &policy));
        }
        if general.reset_on_paired_stop && tag == general.paired_stop_tag {
            let policy = ResetPolicy::for_paired_stop(general);
            return EventOutcome::Reset(self.cancel_and_reset(subject, &policy));
        }

        let timeline = match book.lookup_trigger(tag) {
            TriggerLookup::Unmapped => return EventOutcome::Ignored,
            TriggerLookup::Missing(name) => {
                if debug.strict || debug.log_ops {
                    tracing::warn!(%subject, tag, timeline = name, "Trigger maps to undefined timeline");
                }
                return EventOutcome::MissingTimeline(name.to_string());
            }
            TriggerLookup::Found(timeline) => timeline,
        };

        if timeline.is_empty() {
            tracing::debug!(%subject, tag, timeline = %timeline.name(), "Mapped timeline is empty");
            return EventOutcome::EmptyTimeline(timeline.name().to_string());
        }

        let partner = if timeline.has_partner_commands() {
            let partner = resolver.resolve_partner(subject, initiator);
            if debug.log_partner_resolve {
                tracing::info!(%subject, %initiator, partner = ?partner, "Resolved partner");
            }
            partner
        } else {
            self.registry.partner_handle(subject)
        };

        let name = timeline.name().to_string();
        match self.start_timeline(subject, initiator, partner, timeline) {
            StartOutcome::Started { generation } => EventOutcome::Started {
                timeline: name,
                generation,
            },
            StartOutcome::Debounced => EventOutcome::Debounced,
        }
    }
}
