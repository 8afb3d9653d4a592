//! Graph → text emitter. Produces the canonical on-disk/editable projection
//! of the live tasks matching a caller-supplied filter, and records which
//! task owns each emitted line.

use core_state::{Constraints, TaskId, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionFilter {
    /// Only tasks with `mode_edit` or `mode_edit_temp` set.
    EditMode,
    /// Every live task, regardless of edit-mode flags. Used for save-to-file.
    AllTasks,
}

/// Text plus the `line_task` mapping produced while writing it.
pub struct Serialized {
    pub text: String,
    pub line_task: Vec<Option<TaskId>>,
}

pub fn serialize(world: &World, filter: ProjectionFilter) -> Serialized {
    let mut text = String::new();
    let mut line_task = Vec::new();

    let mut tasks: Vec<(TaskId, &core_state::Task)> = world.tasks.for_each_live().collect();
    tasks.sort_by_key(|(id, _)| id.0);

    for (id, task) in tasks {
        let selected = match filter {
            ProjectionFilter::EditMode => task.mode_edit || task.mode_edit_temp,
            ProjectionFilter::AllTasks => true,
        };
        if !selected {
            continue;
        }
        push_line(&mut text, &mut line_task, id, format!("{} {{", task.name));

        if task.constraints.contains(Constraints::HAS_DURATION) {
            push_line(
                &mut text,
                &mut line_task,
                id,
                format!("  duration: {}", task.day_duration),
            );
        }
        if !task.prereqs.is_empty() {
            let names: Vec<&str> = task
                .prereqs
                .iter()
                .filter_map(|p| world.tasks.try_task(*p))
                .map(|t| t.name.as_str())
                .collect();
            push_line(
                &mut text,
                &mut line_task,
                id,
                format!("  prereq: {}", names.join(", ")),
            );
        }
        if !task.users.is_empty() {
            let names: Vec<&str> = task
                .users
                .iter()
                .filter_map(|u| world.users.try_user(*u))
                .map(|u| u.name.as_str())
                .collect();
            push_line(
                &mut text,
                &mut line_task,
                id,
                format!("  user: {}", names.join(", ")),
            );
        }
        if task.constraints.contains(Constraints::HAS_FIXED_START) {
            push_line(
                &mut text,
                &mut line_task,
                id,
                format!("  fixed_start: {}", crate::date::format_date(task.day_start)),
            );
        }
        if task.constraints.contains(Constraints::HAS_FIXED_END) {
            push_line(
                &mut text,
                &mut line_task,
                id,
                format!("  fixed_end: {}", crate::date::format_date(task.day_end)),
            );
        }
        push_line(
            &mut text,
            &mut line_task,
            id,
            format!("  color: {}", task.status_color),
        );
        push_line(&mut text, &mut line_task, id, "}".to_string());
    }

    if text.is_empty() {
        text.push(' ');
        line_task.push(None);
    }

    Serialized { text, line_task }
}

fn push_line(text: &mut String, line_task: &mut Vec<Option<TaskId>>, owner: TaskId, line: String) {
    text.push_str(&line);
    text.push('\n');
    line_task.push(Some(owner));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_text;
    use core_state::World;
    use core_text::Buffer;

    #[test]
    fn p7_serialize_then_parse_round_trips_isomorphically() {
        let mut w = World::new(
            Buffer::from_str(
                "t",
                "A {\n  duration: 3\n  fixed_start: 2024-01-01\n}\nB {\n  duration: 2\n  prereq: A\n  user: alice\n}\n",
            )
            .unwrap(),
        );
        parse_text(&mut w);
        let ids: Vec<TaskId> = w.tasks.for_each_live().map(|(id, _)| id).collect();
        for id in ids {
            w.tasks.task_mut(id).mode_edit = true;
        }
        let serialized = serialize(&w, ProjectionFilter::AllTasks);

        let mut reparsed = World::new(Buffer::from_str("t2", &serialized.text).unwrap());
        parse_text(&mut reparsed);

        let mut original_names: Vec<_> = w
            .tasks
            .for_each_live()
            .map(|(_, t)| t.name.clone())
            .collect();
        let mut new_names: Vec<_> = reparsed
            .tasks
            .for_each_live()
            .map(|(_, t)| t.name.clone())
            .collect();
        original_names.sort();
        new_names.sort();
        assert_eq!(original_names, new_names);

        let b_orig = w.tasks.get("B").unwrap();
        let b_new = reparsed.tasks.get("B").unwrap();
        assert_eq!(w.tasks.task(b_orig).prereqs.len(), 1);
        assert_eq!(reparsed.tasks.task(b_new).prereqs.len(), 1);
        assert_eq!(w.tasks.task(b_orig).users.len(), 1);
        assert_eq!(reparsed.tasks.task(b_new).users.len(), 1);
    }

    #[test]
    fn empty_projection_serializes_to_single_space() {
        let w = World::new(Buffer::from_str("t", " ").unwrap());
        let serialized = serialize(&w, ProjectionFilter::EditMode);
        assert_eq!(serialized.text, " ");
    }
}
