//! Flat key-to-command mapping for the workbench's two viewport focuses
//! (editor text pane, display Gantt pane), per the external-interfaces
//! command surface (§6).
//!
//! Unlike a modal editor's keymap, this domain has no operator/count/register
//! grammar and no multi-key sequences to disambiguate: every command is one
//! keypress, so resolution is a single table lookup rather than a trie walk.
//! `resolve` is pure and deterministic — it consults only the key event and
//! the current `ViewportFocus`, never hidden state.

use core_events::{KeyCode, KeyEvent, KeyModifiers};
use core_text::cursor::MoveDir;

/// Which pane currently owns keyboard focus. `ox-bin` tracks this and flips
/// it on `GlobalCommand::ViewportModeToggle`; it's the only piece of state
/// `resolve` depends on besides the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportFocus {
    Editor,
    Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalCommand {
    Quit,
    FileSave,
    FileReload,
    ViewportModeToggle,
}

/// Mirrors `core_actions::EditorCommand` plus `symbol_rename`, which
/// `core-actions` exposes as a free function rather than a command variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    InsertChar(char),
    Return,
    Backspace,
    Delete,
    Move(MoveDir),
    MulticursorDeselect,
    SymbolRename,
}

/// Mirrors `core_actions::DisplayCommand` plus the camera and display-cursor
/// commands that `core-actions` deliberately leaves to the driver (§6: "Camera
/// pan/zoom and display-cursor navigation are pure viewport state... they
/// never touch `World`"). `SelectPrereqAll`/`SelectDependentAll` aren't
/// separate `World` mutations either — the driver realizes them by calling
/// `apply_display_command` with the One variant repeatedly until the
/// selection set stops growing, since `hop_select` is idempotent-extending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayAction {
    SelectionToggle,
    SelectPrereqOne,
    SelectPrereqAll,
    SelectDependentOne,
    SelectDependentAll,
    SelectNone,
    TaskCreateSplit,
    TaskCreateSuccessor,
    CursorNavigate(MoveDir),
    ZoomIn,
    ZoomOut,
    ZoomAll,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Global(GlobalCommand),
    Editor(EditorAction),
    Display(DisplayAction),
}

const CTRL: KeyModifiers = KeyModifiers::CTRL;
const SHIFT: KeyModifiers = KeyModifiers::SHIFT;

/// Resolve one key event to a command, or `None` if it has no binding under
/// the current focus. Global bindings take priority over focus-specific ones
/// since quit/save/reload/toggle must work from either pane.
pub fn resolve(focus: ViewportFocus, key: KeyEvent) -> Option<Command> {
    if let Some(g) = resolve_global(key) {
        return Some(Command::Global(g));
    }
    match focus {
        ViewportFocus::Editor => resolve_editor(key).map(Command::Editor),
        ViewportFocus::Display => resolve_display(key).map(Command::Display),
    }
}

fn resolve_global(key: KeyEvent) -> Option<GlobalCommand> {
    match (key.code, key.mods) {
        (KeyCode::Char('q'), m) if m == CTRL => Some(GlobalCommand::Quit),
        (KeyCode::Char('s'), m) if m == CTRL => Some(GlobalCommand::FileSave),
        (KeyCode::Char('r'), m) if m == CTRL => Some(GlobalCommand::FileReload),
        (KeyCode::Tab, m) if m.is_empty() => Some(GlobalCommand::ViewportModeToggle),
        _ => None,
    }
}

fn resolve_editor(key: KeyEvent) -> Option<EditorAction> {
    match (key.code, key.mods) {
        (KeyCode::Char(c), m) if m.is_empty() || m == SHIFT => Some(EditorAction::InsertChar(c)),
        (KeyCode::Enter, m) if m.is_empty() => Some(EditorAction::Return),
        (KeyCode::Backspace, m) if m.is_empty() => Some(EditorAction::Backspace),
        (KeyCode::Char('d'), m) if m == CTRL => Some(EditorAction::Delete),
        (KeyCode::Left, m) if m.is_empty() => Some(EditorAction::Move(MoveDir::Left)),
        (KeyCode::Right, m) if m.is_empty() => Some(EditorAction::Move(MoveDir::Right)),
        (KeyCode::Up, m) if m.is_empty() => Some(EditorAction::Move(MoveDir::Up)),
        (KeyCode::Down, m) if m.is_empty() => Some(EditorAction::Move(MoveDir::Down)),
        (KeyCode::Char('a'), m) if m == CTRL => Some(EditorAction::Move(MoveDir::LineStart)),
        (KeyCode::Char('e'), m) if m == CTRL => Some(EditorAction::Move(MoveDir::LineEnd)),
        (KeyCode::Esc, m) if m.is_empty() => Some(EditorAction::MulticursorDeselect),
        (KeyCode::Char('n'), m) if m == CTRL => Some(EditorAction::SymbolRename),
        _ => None,
    }
}

fn resolve_display(key: KeyEvent) -> Option<DisplayAction> {
    match (key.code, key.mods) {
        (KeyCode::Left, m) if m.is_empty() => {
            Some(DisplayAction::CursorNavigate(MoveDir::Left))
        }
        (KeyCode::Right, m) if m.is_empty() => {
            Some(DisplayAction::CursorNavigate(MoveDir::Right))
        }
        (KeyCode::Up, m) if m.is_empty() => Some(DisplayAction::CursorNavigate(MoveDir::Up)),
        (KeyCode::Down, m) if m.is_empty() => Some(DisplayAction::CursorNavigate(MoveDir::Down)),
        (KeyCode::Char('h'), m) if m.is_empty() => {
            Some(DisplayAction::CursorNavigate(MoveDir::Left))
        }
        (KeyCode::Char('l'), m) if m.is_empty() => {
            Some(DisplayAction::CursorNavigate(MoveDir::Right))
        }
        (KeyCode::Char('k'), m) if m.is_empty() => {
            Some(DisplayAction::CursorNavigate(MoveDir::Up))
        }
        (KeyCode::Char('j'), m) if m.is_empty() => {
            Some(DisplayAction::CursorNavigate(MoveDir::Down))
        }
        (KeyCode::Char(' '), m) if m.is_empty() => Some(DisplayAction::SelectionToggle),
        (KeyCode::Char('['), m) if m.is_empty() => Some(DisplayAction::SelectPrereqOne),
        (KeyCode::Char('{'), m) if m == SHIFT => Some(DisplayAction::SelectPrereqAll),
        (KeyCode::Char(']'), m) if m.is_empty() => Some(DisplayAction::SelectDependentOne),
        (KeyCode::Char('}'), m) if m == SHIFT => Some(DisplayAction::SelectDependentAll),
        (KeyCode::Esc, m) if m.is_empty() => Some(DisplayAction::SelectNone),
        (KeyCode::Char('s'), m) if m.is_empty() => Some(DisplayAction::TaskCreateSplit),
        (KeyCode::Char('n'), m) if m.is_empty() => Some(DisplayAction::TaskCreateSuccessor),
        (KeyCode::Char('+'), m) if m.is_empty() => Some(DisplayAction::ZoomIn),
        (KeyCode::Char('='), m) if m.is_empty() => Some(DisplayAction::ZoomIn),
        (KeyCode::Char('-'), m) if m.is_empty() => Some(DisplayAction::ZoomOut),
        (KeyCode::Char('0'), m) if m.is_empty() => Some(DisplayAction::ZoomAll),
        (KeyCode::Up, m) if m == CTRL => Some(DisplayAction::ScrollUp),
        (KeyCode::Down, m) if m == CTRL => Some(DisplayAction::ScrollDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent { code, mods }
    }

    #[test]
    fn global_quit_wins_over_focus_bindings() {
        let k = key(KeyCode::Char('q'), KeyModifiers::CTRL);
        assert_eq!(
            resolve(ViewportFocus::Editor, k),
            Some(Command::Global(GlobalCommand::Quit))
        );
        assert_eq!(
            resolve(ViewportFocus::Display, k),
            Some(Command::Global(GlobalCommand::Quit))
        );
    }

    #[test]
    fn editor_plain_char_inserts() {
        let k = key(KeyCode::Char('x'), KeyModifiers::empty());
        assert_eq!(
            resolve(ViewportFocus::Editor, k),
            Some(Command::Editor(EditorAction::InsertChar('x')))
        );
    }

    #[test]
    fn editor_arrow_moves_cursor() {
        let k = key(KeyCode::Left, KeyModifiers::empty());
        assert_eq!(
            resolve(ViewportFocus::Editor, k),
            Some(Command::Editor(EditorAction::Move(MoveDir::Left)))
        );
    }

    #[test]
    fn display_hjkl_navigates() {
        let k = key(KeyCode::Char('j'), KeyModifiers::empty());
        assert_eq!(
            resolve(ViewportFocus::Display, k),
            Some(Command::Display(DisplayAction::CursorNavigate(MoveDir::Down)))
        );
    }

    #[test]
    fn display_bracket_selects_one_hop() {
        let k = key(KeyCode::Char('['), KeyModifiers::empty());
        assert_eq!(
            resolve(ViewportFocus::Display, k),
            Some(Command::Display(DisplayAction::SelectPrereqOne))
        );
    }

    #[test]
    fn unbound_key_resolves_to_none() {
        let k = key(KeyCode::Char('z'), KeyModifiers::ALT);
        assert_eq!(resolve(ViewportFocus::Editor, k), None);
        assert_eq!(resolve(ViewportFocus::Display, k), None);
    }

    #[test]
    fn viewport_toggle_is_global() {
        let k = key(KeyCode::Tab, KeyModifiers::empty());
        assert_eq!(
            resolve(ViewportFocus::Display, k),
            Some(Command::Global(GlobalCommand::ViewportModeToggle))
        );
    }
}
