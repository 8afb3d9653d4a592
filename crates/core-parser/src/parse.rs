//! Two-pass line-oriented text-to-graph reconciler.
//!
//! Pass 1 walks every line once to discover task names (any line containing
//! `{` opens a task). Pass 2 walks the lines again to apply properties,
//! close tasks, garbage-collect unvisited users, and resolve the cursor's
//! entity inline. A task still open at end-of-buffer (the user is mid-type)
//! gets the same close-time cleanup so it never retains stale user links.

use core_state::{Constraints, EntityRef, TaskId, World};

/// Diagnostics collected during a parse. Never surfaced as an `Err` — per
/// the error-handling design, parse and schedule record status on their
/// output rather than raising.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub warnings: Vec<String>,
    pub lookup_misses: Vec<String>,
}

impl ParseReport {
    fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::warn!(%msg, "parse warning");
        self.warnings.push(msg);
    }

    fn lookup_miss(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::debug!(%msg, "parse lookup miss");
        self.lookup_misses.push(msg);
    }
}

/// Trim non-alphanumeric characters from both ends of `s`. Applied to task
/// names, property values, and date text identically.
pub fn strip_borders(s: &str) -> &str {
    s.trim_matches(|c: char| !c.is_alphanumeric())
}

pub fn parse_text(world: &mut World) -> ParseReport {
    let mut report = ParseReport::default();
    let line_count = world.buffer.line_count();
    let lines: Vec<String> = (0..line_count)
        .map(|i| world.buffer.line(i).unwrap_or_default())
        .collect();

    world.tasks.reset_visited();
    world.users.reset_visited();
    let edit_mode_tasks: Vec<TaskId> = world
        .tasks
        .for_each_live()
        .filter(|(_, t)| t.mode_edit)
        .map(|(id, _)| id)
        .collect();
    for id in edit_mode_tasks {
        world.tasks.task_mut(id).prereqs.clear();
    }

    // Pass 1: task detection.
    for line in &lines {
        if let Some(brace) = line.find('{') {
            let name = strip_borders(&line[..brace]);
            if !name.is_empty() {
                world.tasks.find_or_create(name);
            }
        }
    }

    world.line_task = vec![None; line_count];

    // Pass 2: properties, cursor resolution, task close cleanup.
    let cursor_pos = world.cursors.primary().map(|c| (c.row, c.column));
    let mut active: Option<TaskId> = None;
    for (row, line) in lines.iter().enumerate() {
        let line_body = line.strip_suffix('\n').unwrap_or(line);
        if let Some(brace) = line_body.find('{') {
            let name = strip_borders(&line_body[..brace]);
            let id = world.tasks.get(name).or_else(|| {
                if name.is_empty() {
                    None
                } else {
                    Some(world.tasks.find_or_create(name))
                }
            });
            active = id;
            world.line_task[row] = active;
            if let (Some(id), Some((cr, cc))) = (active, cursor_pos) {
                if cr == row && cc <= brace {
                    world.resolved_entity = EntityRef::Task(id);
                }
            }
            continue;
        }
        if line_body.trim() == "}" {
            world.line_task[row] = active;
            if let Some(id) = active.take() {
                close_task(world, id, &mut report);
            }
            continue;
        }
        if let Some(colon) = line_body.find(':') {
            world.line_task[row] = active;
            let Some(id) = active else {
                continue;
            };
            let prop = line_body[..colon].trim();
            let values_start = colon + 1;
            let rest = &line_body[values_start..];
            dispatch_property(world, id, prop, rest, row, values_start, cursor_pos, &mut report);
            continue;
        }
        world.line_task[row] = active;
    }
    if let Some(id) = active.take() {
        close_task(world, id, &mut report);
    }

    // Post-pass sweep.
    world.tasks.sweep_unvisited_edit_mode(&mut world.users);
    world.users.sweep_empty();
    world.tasks.rebuild_dependents();
    report
}

fn close_task(world: &mut World, id: TaskId, _report: &mut ParseReport) {
    finalize_task_dates(world, id);
    let unvisited: Vec<_> = world
        .tasks
        .task(id)
        .users
        .iter()
        .copied()
        .filter(|uid| !world.users.is_visited(*uid))
        .collect();
    for uid in unvisited {
        world.tasks.task_mut(id).users.remove(uid);
        world.users.user_mut(uid).tasks.remove(id);
    }
}

fn finalize_task_dates(world: &mut World, id: TaskId) {
    let task = world.tasks.task_mut(id);
    let has_dur = task.constraints.contains(Constraints::HAS_DURATION);
    let has_start = task.constraints.contains(Constraints::HAS_FIXED_START);
    let has_end = task.constraints.contains(Constraints::HAS_FIXED_END);
    if has_dur && has_start {
        task.day_end = task.day_start + task.day_duration - 1;
    } else if has_dur && has_end {
        task.day_start = task.day_end - task.day_duration + 1;
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch_property(
    world: &mut World,
    task_id: TaskId,
    prop: &str,
    values: &str,
    row: usize,
    values_start: usize,
    cursor_pos: Option<(usize, usize)>,
    report: &mut ParseReport,
) {
    match prop {
        "user" => {
            for (name, byte_range) in split_values_with_spans(values, values_start) {
                let name = strip_borders(name);
                if name.is_empty() {
                    continue;
                }
                let uid = world.users.find_or_create(name);
                if let Err(e) = world.tasks.task_mut(task_id).users.insert(uid, "users") {
                    report.warn(format!("{} on task users bag", e));
                    continue;
                }
                let _ = world.users.user_mut(uid).tasks.insert(task_id, "tasks");
                if let Some((cr, cc)) = cursor_pos {
                    if cr == row && byte_range.contains(&cc) {
                        world.resolved_entity = EntityRef::User(uid);
                    }
                }
            }
        }
        "prereq" => {
            for (name, byte_range) in split_values_with_spans(values, values_start) {
                let name = strip_borders(name);
                if name.is_empty() {
                    continue;
                }
                match world.tasks.get(name) {
                    Some(p) => {
                        if let Err(e) =
                            world.tasks.task_mut(task_id).prereqs.insert(p, "prereqs")
                        {
                            report.warn(format!("{} on task prereqs bag", e));
                        } else if let Some((cr, cc)) = cursor_pos {
                            if cr == row && byte_range.contains(&cc) {
                                world.resolved_entity = EntityRef::Prereq(p);
                            }
                        }
                    }
                    None => report.lookup_miss(format!("prereq {:?} not found", name)),
                }
            }
        }
        "duration" => {
            let raw = strip_borders(values.trim());
            match raw.parse::<i64>() {
                Ok(n) => {
                    let task = world.tasks.task_mut(task_id);
                    task.day_duration = n;
                    task.constraints.insert(Constraints::HAS_DURATION);
                }
                Err(_) => report.warn(format!("unparseable duration {:?}", raw)),
            }
        }
        "fixed_start" => {
            let raw = values.trim();
            match crate::date::parse_date(raw) {
                Some(day) => {
                    let task = world.tasks.task_mut(task_id);
                    task.day_start = day;
                    task.constraints.insert(Constraints::HAS_FIXED_START);
                }
                None => report.warn(format!("unparseable fixed_start {:?}", raw)),
            }
        }
        "fixed_end" => {
            let raw = values.trim();
            match crate::date::parse_date(raw) {
                Some(day) => {
                    let task = world.tasks.task_mut(task_id);
                    task.day_end = day;
                    task.constraints.insert(Constraints::HAS_FIXED_END);
                }
                None => report.warn(format!("unparseable fixed_end {:?}", raw)),
            }
        }
        "color" => {
            let raw = strip_borders(values.trim());
            let n: i64 = raw.parse().unwrap_or(-1);
            let clamped = if (0..=9).contains(&n) { n as u8 } else { 0 };
            world.tasks.task_mut(task_id).status_color = clamped;
        }
        other => report.warn(format!("unknown property {:?}", other)),
    }
}

/// Split a comma-separated value list, yielding each trimmed token paired
/// with its absolute byte range within the owning line (used for inline
/// cursor-entity resolution).
fn split_values_with_spans(
    values: &str,
    base_offset: usize,
) -> Vec<(&str, std::ops::Range<usize>)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for part in values.split(',') {
        let piece_start = base_offset + start;
        let piece_end = piece_start + part.len();
        out.push((part, piece_start..piece_end));
        start += part.len() + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::World;
    use core_text::Buffer;

    fn world_from(text: &str) -> World {
        World::new(Buffer::from_str("t", text).unwrap())
    }

    #[test]
    fn s1_minimum_feasible_inputs_parse_into_graph() {
        let mut w = world_from(
            "A {\n  duration: 3\n  fixed_start: 2024-01-01\n}\nB {\n  duration: 2\n  prereq: A\n}\n",
        );
        parse_text(&mut w);
        let a = w.tasks.get("A").unwrap();
        let b = w.tasks.get("B").unwrap();
        assert!(w.tasks.task(b).prereqs.contains(a));
        assert_eq!(w.tasks.task(a).day_duration, 3);
    }

    #[test]
    fn s5_mid_edit_resilience_keeps_both_users_when_unclosed() {
        let mut w = world_from("A {\n  user: alice\n  user: bob\n");
        parse_text(&mut w);
        let a = w.tasks.get("A").unwrap();
        assert_eq!(w.tasks.task(a).users.len(), 2);
    }

    #[test]
    fn s5_removing_a_user_line_destroys_that_user_only() {
        let mut w = world_from("A {\n  user: alice\n  user: bob\n}\n");
        parse_text(&mut w);
        w.buffer = Buffer::from_str("t", "A {\n  user: alice\n}\n").unwrap();
        let report = parse_text(&mut w);
        assert!(report.warnings.is_empty());
        let a = w.tasks.get("A").unwrap();
        assert_eq!(w.tasks.task(a).users.len(), 1);
        assert!(w.users.get("bob").is_none());
        assert!(w.users.get("alice").is_some());
    }

    #[test]
    fn s6_zero_user_garbage_collected_after_property_removed() {
        let mut w = world_from("A {\n  user: alice\n}\n");
        parse_text(&mut w);
        assert!(w.users.get("alice").is_some());
        w.buffer = Buffer::from_str("t", "A {\n}\n").unwrap();
        parse_text(&mut w);
        let a = w.tasks.get("A").unwrap();
        assert!(w.tasks.task(a).users.is_empty());
        assert!(w.users.get("alice").is_none());
    }

    #[test]
    fn unknown_property_warns_and_leaves_task_intact() {
        let mut w = world_from("A {\n  bogus: 1\n}\n");
        let report = parse_text(&mut w);
        assert_eq!(report.warnings.len(), 1);
        assert!(w.tasks.get("A").is_some());
    }

    #[test]
    fn missing_prereq_is_silently_skipped() {
        let mut w = world_from("A {\n  prereq: ghost\n}\n");
        let report = parse_text(&mut w);
        assert_eq!(report.lookup_misses.len(), 1);
        let a = w.tasks.get("A").unwrap();
        assert!(w.tasks.task(a).prereqs.is_empty());
    }

    #[test]
    fn p8_idempotent_reparse_creates_nothing_new() {
        let mut w = world_from("A {\n  user: alice\n  prereq: B\n}\nB {\n}\n");
        parse_text(&mut w);
        let before_tasks: Vec<_> = w.tasks.for_each_live().map(|(id, _)| id).collect();
        let before_users: Vec<_> = w.users.for_each_live().map(|(id, _)| id).collect();
        parse_text(&mut w);
        let after_tasks: Vec<_> = w.tasks.for_each_live().map(|(id, _)| id).collect();
        let after_users: Vec<_> = w.users.for_each_live().map(|(id, _)| id).collect();
        assert_eq!(before_tasks, after_tasks);
        assert_eq!(before_users, after_users);
    }

    #[test]
    fn duplicate_task_name_merges_silently() {
        let mut w = world_from("A {\n  duration: 1\n}\nA {\n  duration: 2\n}\n");
        parse_text(&mut w);
        assert_eq!(w.tasks.for_each_live().count(), 1);
        let a = w.tasks.get("A").unwrap();
        assert_eq!(w.tasks.task(a).day_duration, 2);
    }

    #[test]
    fn dependents_are_rebuilt_after_parse() {
        let mut w = world_from("A {\n}\nB {\n  prereq: A\n}\n");
        parse_text(&mut w);
        let a = w.tasks.get("A").unwrap();
        let b = w.tasks.get("B").unwrap();
        assert!(w.tasks.task(a).dependents.contains(b));
    }
}
