//! tandem-validate - check a timeline file and dry-run its timelines.
//!
//! Usage: tandem-validate <file> [--settings <toml>] [--strict]
//!        [--simulate <timeline> | --tag <tag>] [--duration <secs>] [--step <secs>]
//!
//! Exits non-zero when the file produced warnings or could not be read.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tandem_core::config::{load_book, load_settings};
use tandem_core::{
    EventOutcome, FixedPartner, Handle, IdentityResolver, ParseOptions, SinkSet, StartOutcome,
    SubjectId, TimelineBook, TimelineRuntime, ValueModel,
};
use tandem_types::Settings;
use tracing_subscriber::filter::EnvFilter;

const SUBJECT: SubjectId = SubjectId(0x14);
const INITIATOR: Handle = Handle(1);
const PARTNER: Handle = Handle(2);

#[derive(Parser)]
#[command(version, about = "Check a timeline file and simulate its timelines")]
struct Args {
    /// Timeline file to check
    file: PathBuf,

    /// TOML settings applied before the file's own [General] / [Debug]
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Report warnings even if the file turns strict mode off
    #[arg(long)]
    strict: bool,

    /// Run this timeline against in-memory sinks
    #[arg(long, conflicts_with = "tag")]
    simulate: Option<String>,

    /// Route this trigger tag as a host event and run the result
    #[arg(long)]
    tag: Option<String>,

    /// Simulated seconds
    #[arg(long, default_value_t = 5.0)]
    duration: f32,

    /// Seconds per simulated frame
    #[arg(long, default_value_t = 0.1)]
    step: f32,

    /// Simulate without a partner subject
    #[arg(long)]
    no_partner: bool,
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    // If TANDEM_LOG_PATH is set, append to that file
    if let Ok(path) = std::env::var("TANDEM_LOG_PATH")
        && let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(file)
            .init();
        return;
    }

    // Fallback to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => match load_settings(path) {
            Ok(settings) => settings,
            Err(e) => {
                report_error(&e);
                return ExitCode::from(2);
            }
        },
        None => Settings::default(),
    };

    let options = ParseOptions {
        settings,
        strict: args.strict.then_some(true),
        resolver: &IdentityResolver,
    };
    let output = match load_book(&args.file, &options) {
        Ok(output) => output,
        Err(e) => {
            report_error(&e);
            return ExitCode::from(2);
        }
    };

    print_book(&output.book);

    if output.warnings.is_empty() {
        println!("\nNo warnings.");
    } else {
        println!("\nWarnings ({}):", output.warnings.len());
        for warning in &output.warnings {
            println!("  {warning}");
        }
    }

    if args.simulate.is_some() || args.tag.is_some() {
        if !(args.step.is_finite() && args.step > 0.0) {
            tracing::error!(step = args.step, "--step must be a positive number of seconds");
            return ExitCode::from(2);
        }
        simulate(&args, output.book);
    }

    if output.warnings.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report_error(error: &dyn std::error::Error) {
    match error.source() {
        Some(source) => tracing::error!(error = %error, source = %source, "Validation aborted"),
        None => tracing::error!(error = %error, "Validation aborted"),
    }
}

fn print_book(book: &TimelineBook) {
    println!("Timelines ({}):", book.timeline_count());
    for name in book.timeline_names() {
        let Some(timeline) = book.timeline(name) else {
            continue;
        };
        println!(
            "  {name}: {} command(s), {:.2}s{}",
            timeline.len(),
            timeline.duration_secs(),
            if timeline.has_partner_commands() { ", uses partner" } else { "" }
        );
        for command in timeline.commands() {
            let tween = match command.tween_secs {
                Some(secs) => format!(" over {secs:.2}s ({:?})", command.tween_curve),
                None => String::new(),
            };
            println!(
                "    {:>6.2}  {:<9} {:<10} {} = {}{tween}",
                command.time_offset_secs,
                command.role.label(),
                command.kind.label(),
                command.key,
                command.magnitude,
            );
        }
    }

    println!("\nTriggers ({}):", book.trigger_count());
    for (tag, name) in book.triggers() {
        let marker = if book.timeline(name).is_some() { "" } else { "  (undefined)" };
        println!("  {tag} -> {name}{marker}");
    }

    if !book.vis_groups().is_empty() {
        let mut groups: Vec<_> = book.vis_groups().iter().collect();
        groups.sort_by(|a, b| a.0.cmp(b.0));
        println!("\nVisibility groups ({}):", groups.len());
        for (key, members) in groups {
            println!("  {key} = {}", members.join(", "));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulation
// ─────────────────────────────────────────────────────────────────────────────

fn simulate(args: &Args, book: TimelineBook) {
    let scale = Arc::new(ValueModel::scale());
    let morph = Arc::new(ValueModel::morph());
    let visibility = Arc::new(ValueModel::visibility(book.vis_groups().clone()));
    let sinks = SinkSet::new(scale.clone(), morph.clone(), visibility.clone());
    let partner = (!args.no_partner).then_some(PARTNER);
    let runtime = TimelineRuntime::new(book, sinks);

    println!();
    if let Some(name) = &args.simulate {
        let Some(timeline) = runtime.book().timeline(name) else {
            tracing::error!(timeline = %name, "No such timeline");
            return;
        };
        match runtime.start_timeline(SUBJECT, INITIATOR, partner, timeline) {
            StartOutcome::Started { generation } => {
                println!("Started '{name}' ({generation})");
            }
            StartOutcome::Debounced => println!("Start of '{name}' was debounced"),
        }
    } else if let Some(tag) = &args.tag {
        match runtime.handle_event(SUBJECT, INITIATOR, tag, &FixedPartner(partner)) {
            EventOutcome::Started { timeline, generation } => {
                println!("Tag '{tag}' started '{timeline}' ({generation})");
            }
            other => {
                println!("Tag '{tag}' did not start a timeline: {other:?}");
                return;
            }
        }
    }

    let frames = (args.duration / args.step).ceil().max(0.0) as usize;
    let mut elapsed = 0.0_f32;
    for _ in 0..frames {
        let report = runtime.tick(args.step);
        elapsed += args.step;
        if !report.completed.is_empty() {
            println!("  {elapsed:>6.2}s  session completed");
        }
        if runtime.registry().live_sessions() == 0 {
            // completion resets are dispatched one tick after completion
            runtime.tick(0.0);
            break;
        }
    }

    match runtime.registry().session_snapshot(SUBJECT) {
        Some(snapshot) => println!(
            "After {elapsed:.2}s: running, {} command(s) left, {} tween(s) active",
            snapshot.remaining_commands, snapshot.active_tweens
        ),
        None => println!(
            "After {elapsed:.2}s: {:?}",
            runtime.registry().session_state(SUBJECT)
        ),
    }

    for model in [&scale, &morph, &visibility] {
        let entries = model.snapshot();
        if entries.is_empty() {
            println!("  {}: untouched", model.name());
            continue;
        }
        println!("  {}:", model.name());
        for (handle, key, value) in entries {
            let role = if handle == INITIATOR { "initiator" } else { "partner" };
            println!("    {role:<9} {key} = {value:.3}");
        }
    }
}
