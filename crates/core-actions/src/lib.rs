//! Command application layer: turns the flat Editor/Display command surface
//! from the external-interfaces contract into mutations on a `World`.
//!
//! This crate has no notion of a mode stack or a key grammar — those live in
//! `core-keymap`/`core-events` upstream of here, and in `ox-bin`'s viewport
//! state for the camera-only Display commands (zoom/pan). What lands here is
//! exactly the subset of commands that mutate domain state: text editing,
//! cursor motion, selection propagation between the editor and display
//! views, symbol rename, and the two task-creation shortcuts.

pub mod display;
pub mod editor;
pub mod io_ops;
pub mod selection;

pub use display::{apply_display_command, DisplayCommand};
pub use editor::{apply_editor_command, EditorCommand};
pub use selection::{
    display_navigate_to_editor, editor_cursor_to_display_task, regenerate_edit_mode_text,
    symbol_rename,
};
