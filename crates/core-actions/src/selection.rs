//! Selection propagation between the editor and display views, and the
//! symbol-rename command, per §4.H.
//!
//! The editor and display halves of the workbench share one underlying task
//! graph but look at it through different cursors (`world.cursors` into the
//! text buffer vs. a display-cursor's focused `TaskId`). After every parse
//! the editor cursor's resolved entity retargets the display cursor; after
//! every display-side navigation the display cursor's task retargets the
//! editor cursor to that task's first line. Symbol rename fans out from
//! whichever side the cursor was on to every task that textually references
//! the renamed name, then re-deploys a multi-cursor over the regenerated
//! text.

use core_parser::serialize::{serialize, ProjectionFilter};
use core_state::{EntityRef, TaskId, World};
use core_text::cursor::{Cursor, CursorList};
use core_text::Buffer;

/// Resolve the editor cursor's entity to the task its display-side
/// counterpart should now focus. Returns `None` for a `User` or unresolved
/// cursor — neither has a single task-display to retarget onto.
pub fn editor_cursor_to_display_task(world: &World) -> Option<TaskId> {
    match world.resolved_entity {
        EntityRef::Task(id) | EntityRef::Prereq(id) => Some(id),
        EntityRef::User(_) | EntityRef::None => None,
    }
}

/// After a display-side arrow navigation lands on `display_task`, reposition
/// the editor cursor to the first line whose `line_task` names it. A miss
/// (task has no line, e.g. it's on a collapsed/non-edit-mode block) leaves
/// the editor cursor untouched.
pub fn display_navigate_to_editor(world: &mut World, display_task: TaskId) {
    let Some(row) = world
        .line_task
        .iter()
        .position(|lt| *lt == Some(display_task))
    else {
        return;
    };
    let offset = world.buffer.offset_of(core_text::Position::new(row, 0));
    let cursor = Cursor::at_offset(&world.buffer, offset);
    world.cursors.clear_to_single(cursor);
}

/// The entity's own name: a task's or a prereq-reference's task name, or a
/// user's name.
fn entity_name(world: &World, entity: EntityRef) -> Option<String> {
    match entity {
        EntityRef::Task(id) | EntityRef::Prereq(id) => {
            world.tasks.try_task(id).map(|t| t.name.clone())
        }
        EntityRef::User(uid) => world.users.try_user(uid).map(|u| u.name.clone()),
        EntityRef::None => None,
    }
}

/// Every task that textually references `entity`: a task (or a prereq
/// reference to one) reaches itself and its dependents; a user reaches
/// every task it's assigned to.
fn referencing_tasks(world: &World, entity: EntityRef) -> Vec<TaskId> {
    match entity {
        EntityRef::Task(id) | EntityRef::Prereq(id) => {
            let mut tasks = vec![id];
            if let Some(task) = world.tasks.try_task(id) {
                tasks.extend(task.dependents.iter().copied());
            }
            tasks
        }
        EntityRef::User(uid) => world
            .users
            .try_user(uid)
            .map(|u| u.tasks.iter().copied().collect())
            .unwrap_or_default(),
        EntityRef::None => Vec::new(),
    }
}

/// Find every non-overlapping occurrence of `needle` in `haystack`, scanning
/// left to right and advancing past each match.
fn find_all_occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        match haystack[start..].find(needle) {
            Some(pos) => {
                let abs = start + pos;
                out.push(abs);
                start = abs + needle.len();
            }
            None => break,
        }
    }
    out
}

/// Regenerate `world.buffer` (and `world.line_task`) from the current
/// edit-mode projection of the task graph. Any command that changes which
/// tasks are edit-mode, or creates a task that should appear in the editor,
/// must call this before the next reparse — otherwise the reparse runs
/// against the stale buffer, never visits the newly edit-mode task(s), and
/// `core-parser`'s unvisited-edit-mode sweep destroys them as abandoned.
pub fn regenerate_edit_mode_text(world: &mut World) -> anyhow::Result<()> {
    let serialized = serialize(world, ProjectionFilter::EditMode);
    world.buffer = Buffer::from_str(world.buffer.name.clone(), &serialized.text)?;
    world.line_task = serialized.line_task;
    Ok(())
}

/// Run the symbol-rename command (§4.H): resolve the cursor entity, mark
/// every referencing task edit-mode, regenerate the edit-mode text
/// projection, then deploy one cursor at the end of every occurrence of the
/// entity's name in the regenerated text. Falls back to a single reset
/// cursor when the entity doesn't resolve to a name, or when no occurrence
/// is found, mirroring the original's `editor_cursor_reset` fallback.
pub fn symbol_rename(world: &mut World) -> anyhow::Result<()> {
    let entity = world.resolved_entity;
    let Some(name) = entity_name(world, entity) else {
        world.cursors.reset(&world.buffer);
        return Ok(());
    };

    for id in referencing_tasks(world, entity) {
        if world.tasks.try_task(id).is_some() {
            world.tasks.task_mut(id).mode_edit = true;
        }
    }

    regenerate_edit_mode_text(world)?;

    let haystack = world.buffer.slice_bytes(0, world.buffer.len_bytes());
    let occurrences = find_all_occurrences(&haystack, &name);

    if occurrences.is_empty() {
        world.cursors.reset(&world.buffer);
        return Ok(());
    }
    let mut rebuilt = CursorList::new();
    for start in occurrences {
        let end = start + name.len();
        rebuilt.push(Cursor::at_offset(&world.buffer, end));
    }
    world.cursors = rebuilt;
    Ok(())
}
