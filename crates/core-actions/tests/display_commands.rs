use core_actions::{apply_display_command, regenerate_edit_mode_text, DisplayCommand};
use core_parser::parse::parse_text;
use core_state::{Constraints, World};
use core_text::Buffer;

fn world_from(text: &str) -> World {
    World::new(Buffer::from_str("t", text).unwrap())
}

#[test]
fn selection_toggle_flips_mode_edit_on_the_focused_task() {
    let mut w = world_from("A {\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();
    assert!(!w.tasks.task(a).mode_edit);

    apply_display_command(&mut w, DisplayCommand::SelectionToggle, Some(a));
    assert!(w.tasks.task(a).mode_edit);

    apply_display_command(&mut w, DisplayCommand::SelectionToggle, Some(a));
    assert!(!w.tasks.task(a).mode_edit);
}

#[test]
fn select_prereq_one_hop_selects_immediate_prereqs_of_the_focused_task() {
    let mut w = world_from("A {\n}\nB {\n  prereq: A\n}\nC {\n  prereq: B\n}\n");
    parse_text(&mut w);
    let (a, b, c) = (
        w.tasks.get("A").unwrap(),
        w.tasks.get("B").unwrap(),
        w.tasks.get("C").unwrap(),
    );

    apply_display_command(&mut w, DisplayCommand::SelectPrereqOne, Some(c));

    assert!(w.tasks.task(b).mode_edit, "one-hop prereq of C must select");
    assert!(!w.tasks.task(a).mode_edit, "two-hop prereq must not select");
    assert!(!w.tasks.task(c).mode_edit, "focused task itself isn't auto-selected");
}

#[test]
fn select_dependent_one_hop_selects_immediate_dependents_of_the_focused_task() {
    let mut w = world_from("A {\n}\nB {\n  prereq: A\n}\n");
    parse_text(&mut w);
    let (a, b) = (w.tasks.get("A").unwrap(), w.tasks.get("B").unwrap());

    apply_display_command(&mut w, DisplayCommand::SelectDependentOne, Some(a));

    assert!(w.tasks.task(b).mode_edit);
}

#[test]
fn select_none_clears_every_selection() {
    let mut w = world_from("A {\n}\nB {\n}\n");
    parse_text(&mut w);
    let (a, b) = (w.tasks.get("A").unwrap(), w.tasks.get("B").unwrap());
    w.tasks.task_mut(a).mode_edit = true;
    w.tasks.task_mut(b).mode_edit = true;

    apply_display_command(&mut w, DisplayCommand::SelectNone, None);

    assert!(!w.tasks.task(a).mode_edit);
    assert!(!w.tasks.task(b).mode_edit);
}

#[test]
fn task_create_split_halves_duration_and_rewires_dependents_to_the_new_task() {
    let mut w = world_from("A {\n  duration: 4\n}\nB {\n  prereq: A\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();
    let b = w.tasks.get("B").unwrap();

    apply_display_command(&mut w, DisplayCommand::TaskCreateSplit, Some(a));

    let new_name = "A1".to_string();
    let new_id = w.tasks.get(&new_name).expect("split creates A1");
    assert_eq!(w.tasks.task(a).day_duration, 2);
    assert_eq!(w.tasks.task(new_id).day_duration, 2);
    assert!(w.tasks.task(new_id).prereqs.contains(a));
    assert!(
        w.tasks.task(b).prereqs.contains(new_id),
        "B must now prereq the split successor, not A directly"
    );
    assert!(!w.tasks.task(b).prereqs.contains(a));
}

#[test]
fn task_create_split_never_produces_a_zero_duration_task() {
    let mut w = world_from("A {\n  duration: 1\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();

    apply_display_command(&mut w, DisplayCommand::TaskCreateSplit, Some(a));

    let new_id = w.tasks.get("A1").unwrap();
    assert_eq!(w.tasks.task(new_id).day_duration, 1);
}

#[test]
fn task_create_successor_adds_a_task_prereqd_on_the_focused_task() {
    let mut w = world_from("A {\n  duration: 3\n  user: alice\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();

    apply_display_command(&mut w, DisplayCommand::TaskCreateSuccessor, Some(a));

    let new_id = w.tasks.get("A1").expect("successor creates A1");
    assert!(w.tasks.task(new_id).prereqs.contains(a));
    assert!(w.tasks.task(a).dependents.contains(new_id));
    assert_eq!(w.tasks.task(new_id).day_duration, 3);
    assert!(w.tasks.task(new_id).constraints.contains(Constraints::HAS_DURATION));
}

/// A task created by a display command only survives the reparse that
/// follows it if the editor buffer is regenerated from the edit-mode
/// projection first — otherwise the reparse's unvisited-edit-mode sweep
/// destroys it as abandoned.
#[test]
fn split_created_task_survives_the_reparse_that_follows_it() {
    let mut w = world_from("A {\n  duration: 4\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();

    apply_display_command(&mut w, DisplayCommand::TaskCreateSplit, Some(a));
    regenerate_edit_mode_text(&mut w).unwrap();
    parse_text(&mut w);

    assert!(w.tasks.get("A1").is_some(), "split successor must survive reparse");
}

#[test]
fn successor_created_task_survives_the_reparse_that_follows_it() {
    let mut w = world_from("A {\n  duration: 3\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();

    apply_display_command(&mut w, DisplayCommand::TaskCreateSuccessor, Some(a));
    regenerate_edit_mode_text(&mut w).unwrap();
    parse_text(&mut w);

    assert!(w.tasks.get("A1").is_some(), "successor must survive reparse");
}

/// Selection changes made in the display must show up in the editor's
/// edit-mode text projection once it's regenerated — the two views share
/// one `mode_edit` flag per task.
#[test]
fn selection_toggle_change_is_reflected_in_regenerated_editor_text() {
    let mut w = world_from("A {\n}\nB {\n}\n");
    parse_text(&mut w);
    let a = w.tasks.get("A").unwrap();

    apply_display_command(&mut w, DisplayCommand::SelectionToggle, Some(a));
    regenerate_edit_mode_text(&mut w).unwrap();

    let text = w.buffer.slice_bytes(0, w.buffer.len_bytes());
    assert!(text.contains("A {"), "selected task must appear in editor text");
    assert!(!text.contains("B {"), "unselected task must not appear in editor text");
}
