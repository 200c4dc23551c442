//! Two-pass timeline parser.
//!
//! Pass one reads settings, trigger mappings, visibility groups and key
//! aliases, so strictness and aliases are known before pass two parses the
//! timeline bodies.

use hashbrown::HashMap;

use super::sections::{apply_debug, apply_general};
use super::text::{parse_float, section_name, split_assignment, split_list, strip_comment};
use super::token::{parse_action, PARTNER_PREFIX};
use super::{KeyResolver, ParseOptions, ParseOutput, ParseWarning};
use crate::timeline::{Command, Role, Timeline, TimelineBook};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section<'a> {
    General,
    Debug,
    Triggers,
    VisGroups,
    KeyAliases,
    Timeline { name: &'a str, role: Role },
    /// Rejected header; body lines are ignored without further warnings
    Skipped,
}

struct Line<'a> {
    number: usize,
    text: &'a str,
}

struct Block<'a> {
    section: Section<'a>,
    lines: Vec<Line<'a>>,
}

#[derive(Default)]
struct Diagnostics {
    warnings: Vec<ParseWarning>,
}

impl Diagnostics {
    fn warn(&mut self, line: usize, message: impl Into<String>) {
        self.warnings.push(ParseWarning {
            line,
            message: message.into(),
        });
    }
}

/// Parse timeline text into a [`TimelineBook`]
pub fn parse(text: &str, options: &ParseOptions<'_>) -> ParseOutput {
    let mut diag = Diagnostics::default();
    let blocks = split_blocks(text, &mut diag);

    let mut book = TimelineBook::new(options.settings.clone());
    let mut aliases: HashMap<String, String> = HashMap::new();
    let mut trigger_lines: Vec<(usize, String)> = Vec::new();

    // ─── Pass 1: settings, mappings, groups, aliases ────────────────────────
    for block in &blocks {
        for line in &block.lines {
            let section = block.section;
            if matches!(section, Section::Timeline { .. } | Section::Skipped) {
                continue;
            }
            let Some((key, value)) = split_assignment(line.text) else {
                diag.warn(line.number, format!("expected 'key = value', got '{}'", line.text));
                continue;
            };
            match section {
                Section::General => {
                    if let Err(e) = apply_general(&mut book.settings.general, key, value) {
                        diag.warn(line.number, format!("[General] {e}"));
                    }
                }
                Section::Debug => {
                    if let Err(e) = apply_debug(&mut book.settings.debug, key, value) {
                        diag.warn(line.number, format!("[Debug] {e}"));
                    }
                }
                Section::Triggers => {
                    if value.is_empty() {
                        diag.warn(line.number, format!("trigger '{key}' maps to nothing"));
                        continue;
                    }
                    book.map_trigger(key, value);
                    trigger_lines.push((line.number, value.to_string()));
                }
                Section::VisGroups => {
                    let members = split_list(value);
                    if members.is_empty() {
                        diag.warn(line.number, format!("visibility group '{key}' is empty"));
                        continue;
                    }
                    book.insert_vis_group(key, members);
                }
                Section::KeyAliases => {
                    if value.is_empty() {
                        diag.warn(line.number, format!("alias '{key}' has no target"));
                        continue;
                    }
                    aliases.insert(key.to_ascii_lowercase(), value.to_string());
                }
                Section::Timeline { .. } | Section::Skipped => {}
            }
        }
    }

    // ─── Pass 2: timeline bodies ────────────────────────────────────────────
    let mut order: Vec<&str> = Vec::new();
    let mut commands: HashMap<&str, Vec<Command>> = HashMap::new();
    for block in &blocks {
        let Section::Timeline { name, role } = block.section else {
            continue;
        };
        let list = commands.entry(name).or_insert_with(|| {
            order.push(name);
            Vec::new()
        });
        for line in &block.lines {
            match parse_body_line(line.text, role, &aliases, options.resolver) {
                Ok(command) => list.push(command),
                Err(message) => diag.warn(line.number, format!("[{name}|{role}] {message}")),
            }
        }
    }
    for name in order {
        let list = commands.remove(name).unwrap_or_default();
        book.insert_timeline(Timeline::new(name, list));
    }

    for (line, name) in &trigger_lines {
        if book.timeline(name).is_none() {
            diag.warn(*line, format!("trigger maps to undefined timeline '{name}'"));
        }
    }

    let strict = options.strict.unwrap_or(book.settings.debug.strict);
    book.settings.debug.strict = strict;

    let warnings = if strict {
        for w in &diag.warnings {
            tracing::warn!(line = w.line, "{}", w.message);
        }
        diag.warnings
    } else {
        Vec::new()
    };

    if book.settings.debug.log_parse {
        tracing::info!(
            timelines = book.timeline_count(),
            triggers = book.trigger_count(),
            vis_groups = book.vis_groups().len(),
            warnings = warnings.len(),
            "Parsed timeline text"
        );
    }

    ParseOutput { book, warnings }
}

/// Group lines under their section headers
fn split_blocks<'a>(text: &'a str, diag: &mut Diagnostics) -> Vec<Block<'a>> {
    let mut blocks: Vec<Block<'a>> = Vec::new();
    let mut orphan_reported = false;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(header) = section_name(line) {
            let section = match classify(header) {
                Ok(section) => section,
                Err(message) => {
                    diag.warn(number, message);
                    Section::Skipped
                }
            };
            blocks.push(Block {
                section,
                lines: Vec::new(),
            });
            continue;
        }

        match blocks.last_mut() {
            Some(block) => block.lines.push(Line { number, text: line }),
            None if !orphan_reported => {
                diag.warn(number, "content before the first section is ignored");
                orphan_reported = true;
            }
            None => {}
        }
    }

    blocks
}

fn classify(header: &str) -> Result<Section<'_>, String> {
    const SIMPLE: [(&str, Section<'static>); 7] = [
        ("general", Section::General),
        ("debug", Section::Debug),
        ("triggermap", Section::Triggers),
        ("eventtotimeline", Section::Triggers),
        ("eventmap", Section::Triggers),
        ("visgroups", Section::VisGroups),
        ("keyaliases", Section::KeyAliases),
    ];

    if let Some((_, section)) = SIMPLE.iter().find(|(n, _)| header.eq_ignore_ascii_case(n)) {
        return Ok(*section);
    }

    let body = strip_prefix_ci(header, "group:")
        .or_else(|| strip_prefix_ci(header, "fb:"))
        .ok_or_else(|| format!("unknown section [{header}]"))?;

    let parts: Vec<&str> = body.split('|').map(str::trim).collect();
    let &[name, role] = parts.as_slice() else {
        return Err(format!("timeline header [{header}] needs exactly Name|Role"));
    };
    if name.is_empty() {
        return Err(format!("timeline header [{header}] has an empty name"));
    }
    let role = Role::from_name(role)
        .ok_or_else(|| format!("timeline header [{header}] has unknown role '{role}'"))?;

    Ok(Section::Timeline { name, role })
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn parse_body_line(
    text: &str,
    role: Role,
    aliases: &HashMap<String, String>,
    resolver: &dyn KeyResolver,
) -> Result<Command, String> {
    let (time_token, action) = text
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("expected '<time> <action>', got '{text}'"))?;
    let offset = parse_float(time_token).ok_or_else(|| format!("invalid time '{time_token}'"))?;
    let action = action.trim();

    let action = match role {
        Role::Partner => action
            .strip_prefix(PARTNER_PREFIX)
            .ok_or_else(|| format!("partner command '{action}' must start with {PARTNER_PREFIX}"))?,
        Role::Initiator if action.starts_with(PARTNER_PREFIX) => {
            return Err(format!(
                "initiator command '{action}' must not start with {PARTNER_PREFIX}"
            ));
        }
        Role::Initiator => action,
    };

    let token = parse_action(action).map_err(|e| format!("'{action}': {e}"))?;

    let authored = aliases
        .get(&token.key.to_ascii_lowercase())
        .map(String::as_str)
        .unwrap_or(&token.key);
    let key = resolver
        .resolve(token.kind, authored)
        .ok_or_else(|| format!("unresolved {} key '{authored}'", token.kind))?;

    let command = Command::new(token.kind, role, offset, key, token.magnitude);
    Ok(match token.tween {
        Some((secs, curve)) => command.with_tween(secs, curve),
        None => command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::TableResolver;
    use crate::timeline::{EffectKind, TweenCurve};

    fn parse_default(text: &str) -> ParseOutput {
        parse(text, &ParseOptions::default())
    }

    fn keys(book: &TimelineBook, name: &str) -> Vec<String> {
        book.timeline(name)
            .unwrap()
            .commands()
            .iter()
            .map(|c| c.key.clone())
            .collect()
    }

    #[test]
    fn equal_offsets_keep_parse_order() {
        let out = parse_default(
            "[Group:T|Initiator]\n\
             2.0 Scale_Late(1)\n\
             0.0 Scale_First(1)\n\
             0.0 Scale_Second(1)\n",
        );
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(keys(&out.book, "T"), ["First", "Second", "Late"]);
    }

    #[test]
    fn role_prefix_is_enforced_both_ways() {
        let out = parse_default(
            "[Group:T|Initiator]\n\
             0.0 2_Scale_Head(1)\n\
             0.0 Scale_Hand(1)\n\
             [Group:T|Partner]\n\
             0.0 Scale_Head(1)\n\
             0.0 2_Scale_Foot(1)\n",
        );
        assert_eq!(keys(&out.book, "T"), ["Hand", "Foot"]);
        let lines: Vec<usize> = out.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, [2, 5]);

        let timeline = out.book.timeline("T").unwrap();
        assert_eq!(timeline.commands()[0].role, Role::Initiator);
        assert_eq!(timeline.commands()[1].role, Role::Partner);
    }

    #[test]
    fn sections_merge_into_one_timeline() {
        let out = parse_default(
            "[Group:Greet|Caster]\n\
             0.0 Scale_Head(0.5)\n\
             [FB:Greet|Target]\n\
             0.0 2_Scale_Head(0.8)\n\
             1.0 2_Morph_Belly(40, 2.0)\n",
        );
        let greet = out.book.timeline("Greet").unwrap();
        assert_eq!(greet.len(), 3);
        assert!(greet.has_partner_commands());
        let morph = &greet.commands()[2];
        assert_eq!(morph.kind, EffectKind::Morph);
        assert_eq!(morph.tween_secs, Some(2.0));
        assert_eq!(morph.tween_curve, TweenCurve::Linear);
    }

    #[test]
    fn negative_times_clamp_and_bad_times_reject() {
        let out = parse_default(
            "[Group:T|Initiator]\n\
             -1.5 Scale_Head(1)\n\
             soon Scale_Hand(1)\n",
        );
        let t = out.book.timeline("T").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.commands()[0].time_offset_secs, 0.0);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 3);
    }

    #[test]
    fn magnitudes_are_clamped() {
        let out = parse_default(
            "[Group:T|Initiator]\n\
             0 Scale_Head(12)\n\
             0 Morph_Belly(-2500)\n",
        );
        let t = out.book.timeline("T").unwrap();
        assert_eq!(t.commands()[0].magnitude, 5.0);
        assert_eq!(t.commands()[1].magnitude, -1000.0);
    }

    #[test]
    fn bad_headers_skip_their_body() {
        let out = parse_default(
            "[Group:T]\n\
             0 Scale_Head(1)\n\
             [Group:|Initiator]\n\
             0 Scale_Head(1)\n\
             [Group:T|Both]\n\
             0 Scale_Head(1)\n\
             [Mystery]\n\
             a = b\n",
        );
        assert_eq!(out.book.timeline_count(), 0);
        let lines: Vec<usize> = out.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, [1, 3, 5, 7]);
    }

    #[test]
    fn settings_and_trigger_aliases() {
        let out = parse_default(
            "[general]\n\
             bEnableTimelines = false\n\
             resetScalesOnPairEnd = 0\n\
             startDebounceSeconds = 0.5\n\
             [EventToTimeline]\n\
             HugStart = Greet\n\
             [EventMap]\n\
             Wave = Greet\n\
             [Group:Greet|Initiator]\n\
             0 Scale_Head(1)\n",
        );
        let general = &out.book.settings.general;
        assert!(!general.enable_timelines);
        assert!(!general.reset_scales_on_pair_end);
        assert_eq!(general.debounce_secs, 0.5);
        assert_eq!(out.book.triggers(), [("HugStart", "Greet"), ("Wave", "Greet")]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn strict_mode_off_suppresses_warnings() {
        let text = "[Debug]\n\
                    bStrictIni = false\n\
                    [Group:T|Initiator]\n\
                    0 Scale_Head(nope)\n";
        let out = parse_default(text);
        assert!(out.warnings.is_empty());
        assert!(!out.book.settings.debug.strict);
        assert!(out.book.timeline("T").unwrap().is_empty());

        let forced = parse(
            text,
            &ParseOptions {
                strict: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(forced.warnings.len(), 1);
        assert!(forced.book.settings.debug.strict);
    }

    #[test]
    fn strictness_declared_after_timelines_still_applies() {
        let out = parse_default(
            "[Group:T|Initiator]\n\
             0 Bogus\n\
             [Debug]\n\
             bStrictIni = false\n",
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn undefined_trigger_target_is_reported() {
        let out = parse_default(
            "[TriggerMap]\n\
             HugStart = Nowhere\n",
        );
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 2);
        assert!(out.warnings[0].message.contains("Nowhere"));
    }

    #[test]
    fn vis_groups_and_key_aliases() {
        let resolver = TableResolver::new()
            .with(EffectKind::Morph, "Vore Prey Belly", "Vore Prey Belly")
            .closed(EffectKind::Morph);
        let out = parse(
            "[VisGroups]\n\
             Outfit = Hat, Cape\n\
             [KeyAliases]\n\
             VorePreyBelly = Vore Prey Belly\n\
             [Group:T|Partner]\n\
             0 2_Morph_VorePreyBelly(10)\n\
             0 2_Morph_Cheeks(10)\n\
             0 2_Vis_Outfit(false)\n",
            &ParseOptions::with_resolver(&resolver),
        );
        assert_eq!(
            out.book.vis_groups().get("Outfit"),
            Some(&vec!["Hat".to_string(), "Cape".to_string()])
        );
        assert_eq!(keys(&out.book, "T"), ["Vore Prey Belly", "Outfit"]);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("Cheeks"));
    }

    #[test]
    fn comments_and_orphan_content() {
        let out = parse_default(
            "stray = line\n\
             ; comment\n\
             [Group:T|Initiator] ; trailing\n\
             0.5 Scale_Head(2) # note\n",
        );
        assert_eq!(out.book.timeline("T").unwrap().len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 1);
    }

    #[test]
    fn spaces_after_commas_are_allowed() {
        let out = parse_default(
            "[Group:T|Initiator]\n\
             1.0   Morph_Belly( 40 ,  2.0 , EaseInOut )\n",
        );
        let timeline = out.book.timeline("T").unwrap();
        let cmd = &timeline.commands()[0];
        assert_eq!(cmd.magnitude, 40.0);
        assert_eq!(cmd.tween_secs, Some(2.0));
        assert_eq!(cmd.tween_curve, TweenCurve::EaseInOut);
    }
}
