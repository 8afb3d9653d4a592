//! Display command group (§6): selection toggling, one-hop prereq/dependent
//! selection, deselect-all, and the two task-creation shortcuts. Camera
//! pan/zoom and display-cursor navigation are pure viewport state owned by
//! the display driver (`ox-bin`) — they never touch `World` and aren't
//! modeled here.
//!
//! Selection uses `Task::mode_edit`, the same flag `core-parser`'s
//! `ProjectionFilter::EditMode` reads to decide which tasks get written back
//! out to text. A display-selected task is, by construction, a task the
//! editor view is currently showing.

use core_state::{Constraints, TaskId, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCommand {
    SelectionToggle,
    SelectPrereqOne,
    SelectDependentOne,
    SelectNone,
    TaskCreateSplit,
    TaskCreateSuccessor,
}

/// Apply a display command. `focus` is the task currently under the
/// display-cursor, if any; it's consulted by `SelectionToggle` and the two
/// creation commands, and used as a selection seed when nothing is selected
/// yet.
pub fn apply_display_command(world: &mut World, cmd: DisplayCommand, focus: Option<TaskId>) {
    match cmd {
        DisplayCommand::SelectionToggle => {
            if let Some(id) = focus {
                if world.tasks.try_task(id).is_some() {
                    let task = world.tasks.task_mut(id);
                    task.mode_edit = !task.mode_edit;
                }
            }
        }
        DisplayCommand::SelectPrereqOne => hop_select(world, focus, Hop::Prereq),
        DisplayCommand::SelectDependentOne => hop_select(world, focus, Hop::Dependent),
        DisplayCommand::SelectNone => {
            let live: Vec<TaskId> = world.tasks.for_each_live().map(|(id, _)| id).collect();
            for id in live {
                world.tasks.task_mut(id).mode_edit = false;
            }
        }
        DisplayCommand::TaskCreateSplit => selected_or_focus(world, focus, task_create_split),
        DisplayCommand::TaskCreateSuccessor => {
            selected_or_focus(world, focus, task_create_successor)
        }
    }
}

enum Hop {
    Prereq,
    Dependent,
}

/// Select one hop of prereqs/dependents out of every currently-selected
/// task, seeding from `focus` when nothing is selected yet. Mirrors the
/// original's `keybind_display_select_prereq`/`select_dependent` handlers,
/// which mark a `dependents`/`prereqs` edge's tasks edit-mode from a
/// snapshot of the current selection.
fn hop_select(world: &mut World, focus: Option<TaskId>, hop: Hop) {
    let mut base: Vec<TaskId> = world
        .tasks
        .for_each_live()
        .filter(|(_, t)| t.mode_edit)
        .map(|(id, _)| id)
        .collect();
    if base.is_empty() {
        base.extend(focus);
    }
    let mut newly_selected = Vec::new();
    for id in base {
        let Some(task) = world.tasks.try_task(id) else {
            continue;
        };
        match hop {
            Hop::Prereq => newly_selected.extend(task.prereqs.iter().copied()),
            Hop::Dependent => newly_selected.extend(task.dependents.iter().copied()),
        }
    }
    for id in newly_selected {
        if world.tasks.try_task(id).is_some() {
            world.tasks.task_mut(id).mode_edit = true;
        }
    }
}

/// Run `f` over every currently-selected task, or over `focus` alone if
/// nothing is selected, matching the original's "snapshot `mode_edit`, then
/// act on each snapshotted task" shape used by the split/successor handlers.
fn selected_or_focus(world: &mut World, focus: Option<TaskId>, f: fn(&mut World, TaskId)) {
    let mut selected: Vec<TaskId> = world
        .tasks
        .for_each_live()
        .filter(|(_, t)| t.mode_edit)
        .map(|(id, _)| id)
        .collect();
    if selected.is_empty() {
        selected.extend(focus);
    }
    for id in selected {
        f(world, id);
    }
}

/// Generate an unused name `"{base}1"`, `"{base}2"`, ... for a task spawned
/// from `base`, mirroring `task_name_generate`'s numeric-suffix probing.
fn generate_task_name(world: &World, base: &str) -> String {
    let mut i: u32 = 1;
    loop {
        let candidate = format!("{base}{i}");
        if world.tasks.get(&candidate).is_none() {
            return candidate;
        }
        i += 1;
    }
}

/// Split `id` into two sequential tasks: halve its duration, create a new
/// task covering the remainder with the same users and status color, and
/// repoint every dependent that prereq'd `id` onto the new task instead (so
/// the new task sits between `id` and what used to depend on it). Mirrors
/// the original's `task_create_split`.
fn task_create_split(world: &mut World, id: TaskId) {
    let Some(base) = world.tasks.try_task(id) else {
        return;
    };
    let base_name = base.name.clone();
    let base_users: Vec<_> = base.users.iter().copied().collect();
    let base_duration = base.day_duration;
    let base_status = base.status_color;
    let base_had_fixed_end = base.constraints.contains(Constraints::HAS_FIXED_END);
    let base_day_end = base.day_end;
    let base_dependents: Vec<TaskId> = base.dependents.iter().copied().collect();

    let new_name = generate_task_name(world, &base_name);
    let new_id = world.tasks.find_or_create(&new_name);

    let mut new_duration = base_duration / 2;
    if new_duration <= 0 {
        new_duration = 1;
    }

    {
        let new_task = world.tasks.task_mut(new_id);
        new_task.mode_edit = true;
        new_task.schedule_done = false;
        new_task.status_color = base_status;
        new_task.constraints |= Constraints::HAS_DURATION;
        new_task.day_duration = new_duration;
        for user in &base_users {
            let _ = new_task.users.insert(*user, "users");
        }
        if base_had_fixed_end {
            new_task.constraints |= Constraints::HAS_FIXED_END;
            new_task.day_end = base_day_end;
        }
        let _ = new_task.prereqs.insert(id, "prereqs");
    }

    {
        let base_mut = world.tasks.task_mut(id);
        base_mut.day_duration = new_duration;
        if base_had_fixed_end {
            base_mut.constraints.remove(Constraints::HAS_FIXED_END);
        }
    }

    for dep_id in base_dependents {
        if let Some(dep) = world.tasks.try_task(dep_id) {
            if dep.prereqs.contains(id) {
                let dep_mut = world.tasks.task_mut(dep_id);
                dep_mut.prereqs.remove(id);
                let _ = dep_mut.prereqs.insert(new_id, "prereqs");
            }
        }
    }

    world.tasks.rebuild_dependents();
}

/// Create a new task whose only prereq is `id`, named after it and carrying
/// its users/status color/duration forward. Mirrors the original's
/// `task_create_successor`.
fn task_create_successor(world: &mut World, id: TaskId) {
    let Some(base) = world.tasks.try_task(id) else {
        return;
    };
    let base_name = base.name.clone();
    let base_users: Vec<_> = base.users.iter().copied().collect();
    let base_duration = base.day_duration;
    let base_status = base.status_color;

    let new_name = generate_task_name(world, &base_name);
    let new_id = world.tasks.find_or_create(&new_name);
    {
        let new_task = world.tasks.task_mut(new_id);
        new_task.mode_edit = true;
        new_task.schedule_done = false;
        new_task.status_color = base_status;
        new_task.constraints |= Constraints::HAS_DURATION;
        new_task.day_duration = base_duration;
        for user in &base_users {
            let _ = new_task.users.insert(*user, "users");
        }
        let _ = new_task.prereqs.insert(id, "prereqs");
    }
    world.tasks.rebuild_dependents();
}
