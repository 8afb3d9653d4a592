//! Multi-cursor positions over a [`Buffer`]: offset/column/row tracking,
//! boundary-respecting movement, and batch-edit offset reconciliation.
//!
//! Entity resolution (tying a cursor to a domain object) is deliberately not
//! modeled here — this module only knows about text coordinates. Callers that
//! need a cursor-to-entity mapping layer it on top after each parse.

use crate::{Buffer, Position};

/// A single cursor: an absolute byte `offset` plus its `(column, row)`
/// decomposition relative to the owning buffer. `row` is a line index,
/// `column` a byte offset within that line (mirrors [`Position`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub offset: usize,
    pub column: usize,
    pub row: usize,
}

impl Cursor {
    pub fn at_offset(buffer: &Buffer, offset: usize) -> Self {
        let pos = buffer.position_of(offset);
        Self {
            offset: buffer.offset_of(pos),
            column: pos.byte,
            row: pos.line,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.row, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
}

/// Ordered collection of cursors over one buffer. Index 0 is the primary
/// cursor; its resolved entity (tracked by a higher layer) governs the
/// cursor-wide resolved-entity slot described by the cursor model contract.
#[derive(Debug, Clone, Default)]
pub struct CursorList {
    cursors: Vec<Cursor>,
    /// Desired column remembered across UP/DOWN so that moving through a
    /// short line and back to a long one restores the original column.
    desired_column: Vec<usize>,
}

impl CursorList {
    pub fn new() -> Self {
        Self {
            cursors: Vec::new(),
            desired_column: Vec::new(),
        }
    }

    pub fn reset(&mut self, buffer: &Buffer) {
        self.cursors.clear();
        self.desired_column.clear();
        let c = Cursor::at_offset(buffer, 0);
        self.desired_column.push(c.column);
        self.cursors.push(c);
    }

    pub fn push(&mut self, cursor: Cursor) {
        self.desired_column.push(cursor.column);
        self.cursors.push(cursor);
    }

    pub fn clear_to_single(&mut self, cursor: Cursor) {
        self.cursors.clear();
        self.desired_column.clear();
        self.push(cursor);
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Cursor> {
        self.cursors.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cursor> {
        self.cursors.iter()
    }

    pub fn primary(&self) -> Option<&Cursor> {
        self.cursors.first()
    }

    /// Move cursor `idx` in `dir`. Motion never crosses buffer boundaries:
    /// at the first/last line, UP/DOWN clamp instead of wrapping; at offset
    /// 0 or buffer end, LEFT/RIGHT clamp instead of wrapping.
    pub fn move_one(&mut self, idx: usize, dir: MoveDir, buffer: &Buffer) {
        let Some(cur) = self.cursors.get(idx).copied() else {
            return;
        };
        let line_count = buffer.line_count();
        let new = match dir {
            MoveDir::Right => {
                let line_len = buffer.line_byte_len(cur.row);
                if cur.column < line_len {
                    let line = buffer.line(cur.row).unwrap_or_default();
                    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
                    let next = crate::grapheme::next_boundary(trimmed, cur.column);
                    Cursor::at_offset(buffer, buffer.offset_of(Position::new(cur.row, next)))
                } else if cur.row + 1 < line_count {
                    Cursor::at_offset(buffer, buffer.offset_of(Position::new(cur.row + 1, 0)))
                } else {
                    cur
                }
            }
            MoveDir::Left => {
                if cur.column > 0 {
                    let line = buffer.line(cur.row).unwrap_or_default();
                    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
                    let prev = crate::grapheme::prev_boundary(trimmed, cur.column);
                    Cursor::at_offset(buffer, buffer.offset_of(Position::new(cur.row, prev)))
                } else if cur.row > 0 {
                    let prev_len = buffer.line_byte_len(cur.row - 1);
                    Cursor::at_offset(
                        buffer,
                        buffer.offset_of(Position::new(cur.row - 1, prev_len)),
                    )
                } else {
                    cur
                }
            }
            MoveDir::Up => {
                let desired = self.desired_column.get(idx).copied().unwrap_or(cur.column);
                if cur.row == 0 {
                    cur
                } else {
                    let target_row = cur.row - 1;
                    let clamped = desired.min(buffer.line_byte_len(target_row));
                    Cursor::at_offset(buffer, buffer.offset_of(Position::new(target_row, clamped)))
                }
            }
            MoveDir::Down => {
                let desired = self.desired_column.get(idx).copied().unwrap_or(cur.column);
                if cur.row + 1 >= line_count {
                    cur
                } else {
                    let target_row = cur.row + 1;
                    let clamped = desired.min(buffer.line_byte_len(target_row));
                    Cursor::at_offset(buffer, buffer.offset_of(Position::new(target_row, clamped)))
                }
            }
            MoveDir::LineStart => {
                Cursor::at_offset(buffer, buffer.offset_of(Position::new(cur.row, 0)))
            }
            MoveDir::LineEnd => {
                let len = buffer.line_byte_len(cur.row);
                Cursor::at_offset(buffer, buffer.offset_of(Position::new(cur.row, len)))
            }
        };
        self.cursors[idx] = new;
        if !matches!(dir, MoveDir::Up | MoveDir::Down) {
            if let Some(slot) = self.desired_column.get_mut(idx) {
                *slot = new.column;
            }
        }
    }

    /// Apply an insertion of `len` bytes at cursor `source_idx`'s offset to
    /// every other cursor whose offset lies at or after the insertion point,
    /// so multi-cursor edits applied left-to-right stay locally consistent.
    pub fn shift_after_insert(&mut self, insert_offset: usize, len: usize, buffer: &Buffer) {
        for c in self.cursors.iter_mut() {
            if c.offset >= insert_offset {
                let shifted = Cursor::at_offset(buffer, c.offset + len);
                *c = shifted;
            }
        }
    }

    /// Sort cursors by ascending offset using an explicit Hoare-partition
    /// quicksort, matching the reference scan/partition shape rather than a
    /// library sort. Each cursor's remembered `desired_column` travels with
    /// it (swapped in lockstep) so a sort never misattributes one cursor's
    /// UP/DOWN memory to another. Cursors with equal offsets are a caller
    /// error (the cursor model disallows ties); duplicates collapse during
    /// re-resolve.
    pub fn sort(&mut self) {
        let len = self.cursors.len();
        if len < 2 {
            return;
        }
        let mut items: Vec<(Cursor, usize)> = self
            .cursors
            .drain(..)
            .zip(self.desired_column.drain(..))
            .collect();
        quicksort(&mut items, 0, len - 1);
        for (cursor, desired) in items {
            self.cursors.push(cursor);
            self.desired_column.push(desired);
        }
    }
}

fn quicksort(items: &mut [(Cursor, usize)], lo: usize, hi: usize) {
    if lo >= hi {
        return;
    }
    let p = partition(items, lo, hi);
    if p > lo {
        quicksort(items, lo, p - 1);
    }
    quicksort(items, p + 1, hi);
}

/// Hoare partition scheme using the midpoint element as pivot, returning the
/// final resting index of the pivot value.
fn partition(items: &mut [(Cursor, usize)], lo: usize, hi: usize) -> usize {
    let pivot = items[lo + (hi - lo) / 2].0.offset;
    let mut i = lo;
    let mut j = hi;
    loop {
        while items[i].0.offset < pivot {
            i += 1;
        }
        while items[j].0.offset > pivot {
            j -= 1;
        }
        if i >= j {
            return j;
        }
        items.swap(i, j);
        i += 1;
        if j == 0 {
            return i - 1;
        }
        j -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_wraps_to_next_line() {
        let b = Buffer::from_str("t", "ab\ncd").unwrap();
        let mut list = CursorList::new();
        list.reset(&b);
        list.move_one(0, MoveDir::Right, &b);
        list.move_one(0, MoveDir::Right, &b);
        list.move_one(0, MoveDir::Right, &b);
        let c = list.get(0).unwrap();
        assert_eq!((c.row, c.column), (1, 0));
    }

    #[test]
    fn left_wraps_to_prev_line_end() {
        let b = Buffer::from_str("t", "ab\ncd").unwrap();
        let mut list = CursorList::new();
        list.reset(&b);
        list.move_one(0, MoveDir::Down, &b);
        list.move_one(0, MoveDir::Left, &b);
        let c = list.get(0).unwrap();
        assert_eq!((c.row, c.column), (0, 2));
    }

    #[test]
    fn up_down_preserve_desired_column() {
        let b = Buffer::from_str("t", "abcdef\nxy\nqrstuv").unwrap();
        let mut list = CursorList::new();
        list.reset(&b);
        for _ in 0..4 {
            list.move_one(0, MoveDir::Right, &b);
        }
        list.move_one(0, MoveDir::Down, &b); // short line clamps
        assert_eq!(list.get(0).unwrap().column, 2);
        list.move_one(0, MoveDir::Down, &b); // long line restores desired column
        assert_eq!(list.get(0).unwrap().column, 4);
    }

    #[test]
    fn motion_never_crosses_buffer_start_or_end() {
        let b = Buffer::from_str("t", "ab").unwrap();
        let mut list = CursorList::new();
        list.reset(&b);
        list.move_one(0, MoveDir::Left, &b);
        assert_eq!(list.get(0).unwrap().offset, 0);
        for _ in 0..5 {
            list.move_one(0, MoveDir::Right, &b);
        }
        assert_eq!(list.get(0).unwrap().offset, 2);
    }

    #[test]
    fn sort_orders_by_ascending_offset() {
        let b = Buffer::from_str("t", "abcdef").unwrap();
        let mut list = CursorList::new();
        list.push(Cursor::at_offset(&b, 4));
        list.push(Cursor::at_offset(&b, 1));
        list.push(Cursor::at_offset(&b, 3));
        list.sort();
        let offsets: Vec<_> = list.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![1, 3, 4]);
    }

    #[test]
    fn sort_carries_desired_column_with_its_cursor() {
        let b = Buffer::from_str("t", "abcdef\nxy\nqrstuv").unwrap();
        let mut list = CursorList::new();
        // Cursor at row 2 col 4 (out of push order) with a distinctive desired
        // column baked in via a Right move before sorting scrambles order.
        list.push(Cursor::at_offset(&b, 12)); // row 2, col 2
        list.move_one(0, MoveDir::Right, &b);
        list.move_one(0, MoveDir::Right, &b); // desired_column now 4 for this cursor
        list.push(Cursor::at_offset(&b, 0)); // row 0, col 0, desired_column 0

        let tracked_offset = list.get(0).unwrap().offset;
        let tracked_desired = list.desired_column[0];

        list.sort();

        let idx = list
            .iter()
            .position(|c| c.offset == tracked_offset)
            .expect("tracked cursor survives sort");
        assert_eq!(list.desired_column[idx], tracked_desired);
    }
}
