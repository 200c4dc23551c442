//! Tests for the timeline runtime
//!
//! Drives the facade end to end against recording and in-memory sinks.

use std::cell::Cell;
use std::sync::{Arc, Mutex};

use tandem_types::ResetPolicy;

use super::*;
use crate::dsl::{parse, ParseOptions};
use crate::effects::{EffectSink, ValueModel};
use crate::error::SinkError;
use crate::registry::SessionState;
use crate::scheduler::OpAction;
use crate::timeline::EffectKind;

const SUBJECT: SubjectId = SubjectId(0x14);
const INITIATOR: Handle = Handle(1);
const PARTNER: Handle = Handle(2);

const GREET: &str = "
[TriggerMap]
HugStart = Greet

[Group:Greet|Initiator]
0.0 Scale_Head(0.5)

[Group:Greet|Partner]
0.0 2_Scale_Head(0.8)
1.0 2_Morph_Belly(40, 2.0)
";

// ─── Recording sink ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Call {
    kind: EffectKind,
    action: OpAction,
    target: Handle,
    key: String,
}

#[derive(Debug, Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    fn applied_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c.action, OpAction::Apply(_)))
            .map(|c| c.key)
            .collect()
    }

    fn reverts(&self) -> Vec<(EffectKind, Handle, String)> {
        self.calls()
            .into_iter()
            .filter(|c| c.action == OpAction::Revert)
            .map(|c| (c.kind, c.target, c.key))
            .collect()
    }

    fn increments(&self) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c.action {
                OpAction::Increment(delta) => Some(delta),
                _ => None,
            })
            .collect()
    }
}

struct RecordingSink {
    kind: EffectKind,
    log: Recorder,
}

impl RecordingSink {
    fn record(&self, target: Handle, key: &str, action: OpAction) -> Result<(), SinkError> {
        self.log.0.lock().unwrap().push(Call {
            kind: self.kind,
            action,
            target,
            key: key.to_string(),
        });
        Ok(())
    }
}

impl EffectSink for RecordingSink {
    fn apply(&self, target: Handle, key: &str, value: f32) -> Result<(), SinkError> {
        self.record(target, key, OpAction::Apply(value))
    }

    fn apply_incremental(&self, target: Handle, key: &str, delta: f32) -> Result<(), SinkError> {
        self.record(target, key, OpAction::Increment(delta))
    }

    fn revert(&self, target: Handle, key: &str) -> Result<(), SinkError> {
        self.record(target, key, OpAction::Revert)
    }
}

fn recording_sinks() -> (SinkSet, Recorder) {
    let log = Recorder::default();
    let sink = |kind| -> Arc<dyn EffectSink> {
        Arc::new(RecordingSink {
            kind,
            log: log.clone(),
        })
    };
    let sinks = SinkSet::new(
        sink(EffectKind::Scale),
        sink(EffectKind::Morph),
        sink(EffectKind::Visibility),
    );
    (sinks, log)
}

struct Models {
    scale: Arc<ValueModel>,
    morph: Arc<ValueModel>,
}

fn model_sinks() -> (SinkSet, Models) {
    let scale = Arc::new(ValueModel::scale());
    let morph = Arc::new(ValueModel::morph());
    let visibility = Arc::new(ValueModel::visibility(Default::default()));
    let sinks = SinkSet::new(scale.clone(), morph.clone(), visibility);
    (sinks, Models { scale, morph })
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn book(text: &str) -> TimelineBook {
    let out = parse(text, &ParseOptions::default());
    assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
    out.book
}

fn runtime(text: &str) -> (TimelineRuntime, Recorder) {
    let (sinks, log) = recording_sinks();
    (TimelineRuntime::new(book(text), sinks), log)
}

fn queued_runtime(text: &str) -> (TimelineRuntime, Arc<QueueDispatcher>, Recorder) {
    let (sinks, log) = recording_sinks();
    let queue = Arc::new(QueueDispatcher::new());
    let rt = TimelineRuntime::with_dispatcher(book(text), sinks, queue.clone());
    (rt, queue, log)
}

fn timeline(rt: &TimelineRuntime, name: &str) -> Arc<Timeline> {
    rt.book().timeline(name).unwrap()
}

fn start(rt: &TimelineRuntime, name: &str, partner: Option<Handle>) -> Generation {
    match rt.start_timeline(SUBJECT, INITIATOR, partner, timeline(rt, name)) {
        StartOutcome::Started { generation } => generation,
        StartOutcome::Debounced => panic!("start of {name} was debounced"),
    }
}

fn ticks(rt: &TimelineRuntime, count: usize) {
    for _ in 0..count {
        rt.tick(0.25);
    }
}

fn revert_on_complete(text: &str) -> String {
    format!("[General]\nresetOnComplete = true\n{text}")
}

// ─── End to end ─────────────────────────────────────────────────────────────

const GREET_LITERAL: &str = "
[General]
maxTickSeconds = 2.0

[Group:Greet|Initiator]
0.0 Scale_Head(0.5)
2.0 Scale_Head(1.0)

[Group:Greet|Partner]
0.0 2_Scale_Head(0.8)
";

#[test]
fn greet_literal_scenario() {
    let (rt, log) = runtime(GREET_LITERAL);
    start(&rt, "Greet", Some(PARTNER));

    let report = rt.tick(0.0);
    assert!(report.completed.is_empty());
    assert_eq!(
        log.calls(),
        [
            Call {
                kind: EffectKind::Scale,
                action: OpAction::Apply(0.5),
                target: INITIATOR,
                key: "Head".to_string(),
            },
            Call {
                kind: EffectKind::Scale,
                action: OpAction::Apply(0.8),
                target: PARTNER,
                key: "Head".to_string(),
            },
        ]
    );

    let report = rt.tick(2.0);
    assert_eq!(report.completed, [SUBJECT]);
    assert_eq!(log.calls().len(), 3);
    assert_eq!(log.calls()[2].action, OpAction::Apply(1.0));
    assert_eq!(rt.registry().session_state(SUBJECT), SessionState::Completed);

    assert_eq!(rt.tick(0.25), TickReport::default());
    assert_eq!(log.calls().len(), 3);
}

#[test]
fn greet_under_default_clamp_needs_more_frames() {
    let text = GREET_LITERAL.replace("maxTickSeconds = 2.0", "");
    let (rt, log) = runtime(&text);
    start(&rt, "Greet", Some(PARTNER));

    rt.tick(0.0);
    rt.tick(2.0);
    assert_eq!(log.calls().len(), 2);
    assert_eq!(rt.registry().session_snapshot(SUBJECT).unwrap().elapsed_secs, 0.25);

    ticks(&rt, 7);
    assert_eq!(log.calls().len(), 3);
    assert_eq!(rt.registry().live_sessions(), 0);
}

#[test]
fn greet_runs_to_completion() {
    let (sinks, models) = model_sinks();
    let rt = TimelineRuntime::new(book(GREET), sinks);
    start(&rt, "Greet", Some(PARTNER));

    ticks(&rt, 1);
    assert_eq!(models.scale.value(INITIATOR, "Head"), 0.5);
    assert_eq!(models.scale.value(PARTNER, "Head"), 0.8);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 0.0);

    // 2.0s: halfway through the belly tween
    ticks(&rt, 7);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 20.0);
    assert_eq!(rt.registry().session_state(SUBJECT), SessionState::Running);

    // 3.0s: tween done, session completes in the same tick
    ticks(&rt, 4);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 40.0);
    assert_eq!(rt.registry().live_sessions(), 0);
    assert_eq!(rt.registry().session_state(SUBJECT), SessionState::Completed);

    ticks(&rt, 4);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 40.0);

    let report = rt.cancel_and_reset(SUBJECT, &ResetPolicy::ALL);
    assert_eq!(report.reverted, 3);
    assert!(!report.was_running);
    assert_eq!(models.scale.value(INITIATOR, "Head"), 1.0);
    assert_eq!(models.scale.value(PARTNER, "Head"), 1.0);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 0.0);
}

#[test]
fn final_state_is_kept_by_default() {
    let (sinks, models) = model_sinks();
    let rt = TimelineRuntime::new(book("[Group:S|Initiator]\n0.0 Scale_Head(2)\n"), sinks);
    start(&rt, "S", None);

    assert_eq!(rt.tick(0.25).completed, [SUBJECT]);
    assert_eq!(models.scale.value(INITIATOR, "Head"), 2.0);

    ticks(&rt, 4);
    assert_eq!(models.scale.value(INITIATOR, "Head"), 2.0);
    assert_eq!(rt.registry().touched_count(SUBJECT), 1);
}

#[test]
fn completion_revert_is_opt_in() {
    let (sinks, models) = model_sinks();
    let rt = TimelineRuntime::new(book(&revert_on_complete(GREET)), sinks);
    start(&rt, "Greet", Some(PARTNER));

    let completed: Vec<SubjectId> = (0..12).flat_map(|_| rt.tick(0.25).completed).collect();
    assert_eq!(completed, [SUBJECT]);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 40.0);
    assert_eq!(rt.registry().session_state(SUBJECT), SessionState::Completed);

    let report = rt.tick(0.25);
    assert!(report.completed.is_empty());
    assert_eq!(report.dispatched, 3);
    assert_eq!(rt.registry().touched_count(SUBJECT), 0);
    assert!(models.scale.snapshot().is_empty());
    assert!(models.morph.snapshot().is_empty());
}

// ─── Generations ────────────────────────────────────────────────────────────

const TWO_TIMELINES: &str = "
[Group:A|Initiator]
0.0 Scale_A0(2)
1.0 Scale_A1(3)

[Group:B|Initiator]
0.0 Scale_B0(4)
";

#[test]
fn replacing_start_invalidates_earlier_commands() {
    let (rt, log) = runtime(TWO_TIMELINES);
    let a = start(&rt, "A", None);
    ticks(&rt, 2);

    let b = start(&rt, "B", None);
    assert!(b > a);
    ticks(&rt, 8);

    assert_eq!(log.applied_keys(), ["A0", "B0"]);
}

#[test]
fn queued_work_is_dropped_after_cancel() {
    let (rt, queue, log) = queued_runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    rt.tick(0.25);
    assert_eq!(queue.pending(), 1);

    let report = rt.cancel_and_reset(SUBJECT, &ResetPolicy::ALL);
    assert!(report.was_running);
    assert_eq!(report.reverted, 0);

    assert_eq!(queue.run_pending(), 1);
    assert!(log.calls().is_empty());
    assert_eq!(rt.registry().touched_count(SUBJECT), 0);
}

#[test]
fn applied_work_is_reverted_after_cancel() {
    let (rt, queue, log) = queued_runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    rt.tick(0.25);
    queue.run_pending();

    let report = rt.cancel_and_reset(SUBJECT, &ResetPolicy::ALL);
    assert_eq!(report.reverted, 1);
    queue.run_pending();

    assert_eq!(
        log.calls(),
        [
            Call {
                kind: EffectKind::Scale,
                action: OpAction::Apply(2.0),
                target: INITIATOR,
                key: "A0".to_string(),
            },
            Call {
                kind: EffectKind::Scale,
                action: OpAction::Revert,
                target: INITIATOR,
                key: "A0".to_string(),
            },
        ]
    );
}

#[test]
fn duplicate_start_inside_window_is_ignored() {
    let (rt, _log) = runtime(TWO_TIMELINES);
    let first = start(&rt, "A", None);

    let again = rt.start_timeline(SUBJECT, INITIATOR, None, timeline(&rt, "A"));
    assert_eq!(again, StartOutcome::Debounced);
    assert_eq!(rt.registry().live_sessions(), 1);
    assert!(rt.registry().is_current(SUBJECT, first));

    rt.tick(0.25);
    let later = start(&rt, "A", None);
    assert!(later > first);
}

const TAGGED: &str = "
[TriggerMap]
GoA = A
GoB = B
";

#[test]
fn different_tag_inside_window_starts() {
    let (rt, _log) = runtime(&format!("{TWO_TIMELINES}{TAGGED}"));
    let none = FixedPartner(None);

    let a = rt.handle_event(SUBJECT, INITIATOR, "GoA", &none);
    assert!(matches!(a, EventOutcome::Started { ref timeline, .. } if timeline == "A"));
    let b = rt.handle_event(SUBJECT, INITIATOR, "GoB", &none);
    assert!(matches!(b, EventOutcome::Started { ref timeline, .. } if timeline == "B"));
    assert_eq!(rt.registry().session_snapshot(SUBJECT).unwrap().timeline, "B");
    assert_eq!(rt.handle_event(SUBJECT, INITIATOR, "GoB", &none), EventOutcome::Debounced);
}

#[test]
fn restart_right_after_pair_end_is_not_debounced() {
    let (rt, _log) = runtime(&format!("{TWO_TIMELINES}{TAGGED}"));
    let none = FixedPartner(None);

    rt.handle_event(SUBJECT, INITIATOR, "GoA", &none);
    rt.tick(0.05);
    let reset = rt.handle_event(SUBJECT, INITIATOR, "PairEnd", &none);
    assert!(matches!(reset, EventOutcome::Reset(CancelReport { was_running: true, .. })));

    let restart = rt.handle_event(SUBJECT, INITIATOR, "GoA", &none);
    assert!(matches!(restart, EventOutcome::Started { .. }));
}

#[test]
fn other_subjects_are_not_debounced() {
    let (rt, _log) = runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    let other = rt.start_timeline(SubjectId(0x99), Handle(9), None, timeline(&rt, "A"));
    assert!(matches!(other, StartOutcome::Started { .. }));
    assert_eq!(rt.registry().live_sessions(), 2);
}

// ─── Tweens ─────────────────────────────────────────────────────────────────

#[test]
fn finished_tween_stops_emitting() {
    let (rt, log) = runtime("[Group:T|Partner]\n0.0 2_Morph_Belly(40, 1.0)\n");
    start(&rt, "T", Some(PARTNER));

    ticks(&rt, 4);
    assert_eq!(log.increments(), [10.0, 10.0, 10.0, 10.0]);

    ticks(&rt, 4);
    assert_eq!(log.increments().len(), 4);
    assert_eq!(rt.registry().live_sessions(), 0);
}

const RETWEEN: &str = "
[Group:T|Partner]
0.0 2_Morph_Belly(40, 2.0)
1.0 2_Morph_Belly(10, 1.0)
";

#[test]
fn replacing_tween_does_not_stack() {
    let (sinks, models) = model_sinks();
    let rt = TimelineRuntime::new(book(RETWEEN), sinks);
    start(&rt, "T", Some(PARTNER));

    ticks(&rt, 4);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 20.0);
    assert_eq!(rt.registry().session_snapshot(SUBJECT).unwrap().active_tweens, 1);

    ticks(&rt, 4);
    assert_eq!(models.morph.value(PARTNER, "Belly"), 30.0);
    assert_eq!(rt.registry().live_sessions(), 0);
}

#[test]
fn replaced_tween_result_ignores_frame_size() {
    for dt in [0.5, 0.3, 0.1, 0.07] {
        let (sinks, models) = model_sinks();
        let rt = TimelineRuntime::new(book(RETWEEN), sinks);
        start(&rt, "T", Some(PARTNER));
        for _ in 0..100 {
            if rt.registry().live_sessions() == 0 {
                break;
            }
            rt.tick(dt);
        }
        let belly = models.morph.value(PARTNER, "Belly");
        assert!((belly - 30.0).abs() < 1e-3, "dt {dt}: belly ended at {belly}");
    }
}

// ─── Reverts ────────────────────────────────────────────────────────────────

const MIXED: &str = "
[Group:M|Initiator]
0.0 Scale_Head(2)
5.0 Scale_Hand(3)

[Group:M|Partner]
0.0 2_Morph_Belly(10)
";

#[test]
fn cancel_reverts_only_touched_keys_once() {
    let (rt, log) = runtime(MIXED);
    start(&rt, "M", Some(PARTNER));
    rt.tick(0.25);

    let report = rt.cancel_and_reset(SUBJECT, &ResetPolicy::ALL);
    assert_eq!(report.reverted, 2);
    assert_eq!(rt.cancel_and_reset(SUBJECT, &ResetPolicy::ALL).reverted, 0);

    assert_eq!(
        log.reverts(),
        [
            (EffectKind::Scale, INITIATOR, "Head".to_string()),
            (EffectKind::Morph, PARTNER, "Belly".to_string()),
        ]
    );
}

#[test]
fn reset_policy_limits_categories() {
    let (rt, log) = runtime(MIXED);
    start(&rt, "M", Some(PARTNER));
    rt.tick(0.25);

    let policy = ResetPolicy {
        scales: true,
        ..ResetPolicy::NONE
    };
    let report = rt.cancel_and_reset(SUBJECT, &policy);
    assert_eq!(report.reverted, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(log.reverts(), [(EffectKind::Scale, INITIATOR, "Head".to_string())]);
    assert_eq!(rt.registry().touched_count(SUBJECT), 0);
}

#[test]
fn partner_is_remembered_across_cancel() {
    let (rt, _log) = runtime(MIXED);
    start(&rt, "M", Some(PARTNER));
    rt.cancel_and_reset(SUBJECT, &ResetPolicy::ALL);
    assert_eq!(rt.registry().partner_handle(SUBJECT), Some(PARTNER));
}

// ─── Binding failures ───────────────────────────────────────────────────────

#[test]
fn missing_partner_skips_partner_commands() {
    let (rt, log) = runtime(MIXED);
    start(&rt, "M", None);
    rt.tick(0.25);
    let targets: Vec<Handle> = log.calls().iter().map(|c| c.target).collect();
    assert_eq!(targets, [INITIATOR]);
}

#[test]
fn expired_handle_does_not_stop_the_tick() {
    let (sinks, models) = model_sinks();
    models.scale.expire(PARTNER);
    models.morph.expire(PARTNER);
    let rt = TimelineRuntime::new(book(GREET), sinks);
    start(&rt, "Greet", Some(PARTNER));

    ticks(&rt, 12);
    assert_eq!(models.scale.value(INITIATOR, "Head"), 0.5);
    assert_eq!(rt.registry().session_state(SUBJECT), SessionState::Completed);
}

// ─── Ticks ──────────────────────────────────────────────────────────────────

#[test]
fn negative_and_non_finite_ticks_do_nothing() {
    let (rt, log) = runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    for dt in [-1.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        assert_eq!(rt.tick(dt), TickReport::default());
    }
    assert!(log.calls().is_empty());
    assert_eq!(rt.registry().session_snapshot(SUBJECT).unwrap().elapsed_secs, 0.0);
    assert_eq!(rt.registry().clock_secs(), 0.0);
}

#[test]
fn zero_tick_flushes_due_commands_only() {
    let (rt, log) = runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    assert_eq!(rt.tick(0.0).dispatched, 1);
    assert_eq!(log.applied_keys(), ["A0"]);
    assert_eq!(rt.registry().session_snapshot(SUBJECT).unwrap().elapsed_secs, 0.0);
}

#[test]
fn long_frames_are_clamped() {
    let (rt, log) = runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    rt.tick(5.0);
    assert_eq!(log.applied_keys(), ["A0"]);
    assert_eq!(rt.registry().session_snapshot(SUBJECT).unwrap().elapsed_secs, 0.25);
}

// ─── Events ─────────────────────────────────────────────────────────────────

#[test]
fn events_route_to_start_and_reset() {
    let text = format!("{GREET}\n[Group:Solo|Initiator]\n0.0 Scale_Head(2)\n[EventMap]\nWave = Solo\n");
    let (rt, log) = runtime(&text);
    let resolved = Cell::new(0);
    let resolver = |_: SubjectId, _: Handle| {
        resolved.set(resolved.get() + 1);
        Some(PARTNER)
    };

    assert_eq!(rt.handle_event(SUBJECT, INITIATOR, "Unknown", &resolver), EventOutcome::Ignored);

    let outcome = rt.handle_event(SUBJECT, INITIATOR, "HugStart", &resolver);
    assert!(matches!(outcome, EventOutcome::Started { ref timeline, .. } if timeline == "Greet"));
    assert_eq!(resolved.get(), 1);
    assert_eq!(rt.registry().partner_handle(SUBJECT), Some(PARTNER));

    rt.tick(0.25);
    let outcome = rt.handle_event(SUBJECT, INITIATOR, "PairEnd", &resolver);
    let EventOutcome::Reset(report) = outcome else {
        panic!("expected reset, got {outcome:?}");
    };
    assert_eq!(report.reverted, 2);
    assert_eq!(log.reverts().len(), 2);

    // Solo has no partner commands: the resolver is not consulted
    rt.tick(0.25);
    let outcome = rt.handle_event(SUBJECT, INITIATOR, "Wave", &resolver);
    assert!(matches!(outcome, EventOutcome::Started { .. }));
    assert_eq!(resolved.get(), 1);
    assert_eq!(rt.registry().partner_handle(SUBJECT), Some(PARTNER));
}

#[test]
fn missing_and_empty_timelines_are_reported() {
    let text = "[TriggerMap]\nLost = Nowhere\nHollow = Empty\n[Group:Empty|Initiator]\n";
    let out = parse(text, &ParseOptions::default());
    let (sinks, _log) = recording_sinks();
    let rt = TimelineRuntime::new(out.book, sinks);

    assert_eq!(
        rt.handle_event(SUBJECT, INITIATOR, "Lost", &FixedPartner(None)),
        EventOutcome::MissingTimeline("Nowhere".to_string())
    );
    assert_eq!(
        rt.handle_event(SUBJECT, INITIATOR, "Hollow", &FixedPartner(None)),
        EventOutcome::EmptyTimeline("Empty".to_string())
    );
    assert_eq!(rt.registry().live_sessions(), 0);
}

#[test]
fn disabled_timelines_ignore_everything() {
    let text = format!("[General]\nbEnableTimelines = false\n{GREET}");
    let (rt, _log) = runtime(&text);
    for tag in ["HugStart", "PairEnd"] {
        assert_eq!(
            rt.handle_event(SUBJECT, INITIATOR, tag, &FixedPartner(Some(PARTNER))),
            EventOutcome::Disabled
        );
    }
    assert_eq!(rt.registry().live_sessions(), 0);
}

#[test]
fn paired_stop_uses_its_own_policy() {
    let text = format!("[General]\nresetMorphsOnPairedStop = false\n{MIXED}\n[TriggerMap]\nGo = M\n");
    let (rt, log) = runtime(&text);
    rt.handle_event(SUBJECT, INITIATOR, "Go", &FixedPartner(Some(PARTNER)));
    rt.tick(0.25);

    let outcome = rt.handle_event(SUBJECT, INITIATOR, "NPCPairedStop", &FixedPartner(None));
    let EventOutcome::Reset(report) = outcome else {
        panic!("expected reset, got {outcome:?}");
    };
    assert_eq!(report.reverted, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(log.reverts(), [(EffectKind::Scale, INITIATOR, "Head".to_string())]);
}

#[test]
fn lifecycle_tag_without_reset_flag_is_not_a_reset() {
    let text = format!("[General]\nresetOnPairEnd = false\n{GREET}");
    let (rt, _log) = runtime(&text);
    assert_eq!(
        rt.handle_event(SUBJECT, INITIATOR, "PairEnd", &FixedPartner(None)),
        EventOutcome::Ignored
    );
}

// ─── Reload + threads ───────────────────────────────────────────────────────

#[test]
fn reload_keeps_running_sessions() {
    let (rt, log) = runtime(TWO_TIMELINES);
    start(&rt, "A", None);
    rt.reload(book("[Group:Other|Initiator]\n0 Scale_X(1)\n"));

    assert!(rt.book().timeline("A").is_none());
    ticks(&rt, 4);
    assert_eq!(log.applied_keys(), ["A0", "A1"]);
}

#[test]
fn runtime_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TimelineRuntime>();

    let (rt, _log) = runtime(TWO_TIMELINES);
    let a = timeline(&rt, "A");
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..50u64 {
                rt.start_timeline(SubjectId(i % 3), INITIATOR, None, Arc::clone(&a));
                rt.cancel_and_reset(SubjectId(i % 3), &ResetPolicy::ALL);
            }
        });
        for _ in 0..50 {
            rt.tick(0.05);
        }
    });
    assert!(rt.registry().live_sessions() <= 3);
}
