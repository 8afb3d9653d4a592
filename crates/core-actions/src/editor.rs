//! Editor command group (§6): character insert, backspace, forward delete,
//! return, cursor motion, and multi-cursor deselect. Every command operates
//! directly on `world.buffer`/`world.cursors`; callers are expected to
//! re-parse the buffer afterward to keep `world.line_task` and the resolved
//! entity in sync (parsing isn't triggered here — it's a `core-parser`
//! concern, not an editing concern).

use core_state::World;
use core_text::cursor::{Cursor, CursorList, MoveDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    InsertChar(char),
    Return,
    Backspace,
    Delete,
    Move(MoveDir),
    MulticursorDeselect,
}

/// Apply one editor command to every active cursor, left-to-right, keeping
/// every other cursor's offset consistent with the edits that precede it.
pub fn apply_editor_command(world: &mut World, cmd: EditorCommand) {
    match cmd {
        EditorCommand::InsertChar(ch) => {
            let mut buf = [0u8; 4];
            insert_text_at_every_cursor(world, ch.encode_utf8(&mut buf));
        }
        EditorCommand::Return => insert_newline_at_every_cursor(world),
        EditorCommand::Backspace => delete_before_at_every_cursor(world),
        EditorCommand::Delete => delete_at_every_cursor(world),
        EditorCommand::Move(dir) => {
            for idx in 0..world.cursors.len() {
                world.cursors.move_one(idx, dir, &world.buffer);
            }
        }
        EditorCommand::MulticursorDeselect => {
            if let Some(primary) = world.cursors.primary().copied() {
                world.cursors.clear_to_single(primary);
            }
        }
    }
}

fn insert_text_at_every_cursor(world: &mut World, text: &str) {
    world.cursors.sort();
    for idx in 0..world.cursors.len() {
        let Some(offset) = world.cursors.get(idx).map(|c| c.offset) else {
            continue;
        };
        let mut pos = world.buffer.position_of(offset);
        world.buffer.insert_grapheme(&mut pos, text);
        world
            .cursors
            .shift_after_insert(offset, text.len(), &world.buffer);
    }
}

fn insert_newline_at_every_cursor(world: &mut World) {
    world.cursors.sort();
    for idx in 0..world.cursors.len() {
        let Some(offset) = world.cursors.get(idx).map(|c| c.offset) else {
            continue;
        };
        let mut pos = world.buffer.position_of(offset);
        world.buffer.insert_newline(&mut pos);
        world.cursors.shift_after_insert(offset, 1, &world.buffer);
    }
}

fn delete_before_at_every_cursor(world: &mut World) {
    world.cursors.sort();
    for idx in 0..world.cursors.len() {
        let Some(offset) = world.cursors.get(idx).map(|c| c.offset) else {
            continue;
        };
        let before_len = world.buffer.len_bytes();
        let mut pos = world.buffer.position_of(offset);
        world.buffer.delete_grapheme_before(&mut pos);
        let removed = before_len - world.buffer.len_bytes();
        if removed > 0 {
            reposition_after_delta(world, offset, -(removed as i64));
        }
    }
}

fn delete_at_every_cursor(world: &mut World) {
    world.cursors.sort();
    for idx in 0..world.cursors.len() {
        let Some(offset) = world.cursors.get(idx).map(|c| c.offset) else {
            continue;
        };
        let before_len = world.buffer.len_bytes();
        let mut pos = world.buffer.position_of(offset);
        world.buffer.delete_grapheme_at(&mut pos);
        let removed = before_len - world.buffer.len_bytes();
        if removed > 0 {
            reposition_after_delta(world, offset + 1, -(removed as i64));
        }
    }
}

/// Rebuild every cursor's `(offset, column, row)` after a deletion shifted
/// the bytes at or beyond `threshold` by `delta` (negative). There's no
/// `shift_after_insert` counterpart for shrinking edits in `core-text`, so
/// this reconstructs the list from scratch instead of mutating in place.
fn reposition_after_delta(world: &mut World, threshold: usize, delta: i64) {
    let snapshot: Vec<usize> = world.cursors.iter().map(|c| c.offset).collect();
    let mut rebuilt = CursorList::new();
    for offset in snapshot {
        let shifted = if offset >= threshold {
            (offset as i64 + delta).max(0) as usize
        } else {
            offset
        };
        rebuilt.push(Cursor::at_offset(&world.buffer, shifted));
    }
    world.cursors = rebuilt;
}
