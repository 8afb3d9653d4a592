//! Terminal rendering: a Unicode-aware cell grid (`Frame`), a thin batched
//! writer around `crossterm`, and two paint passes — one for the editor text
//! pane, one for the Gantt display pane built from `core-layout::Layout`.
//!
//! `core-layout` already computes every pixel rect and curve point a
//! renderer needs (§4.G); this crate's job is strictly the last mile of
//! turning that data, plus the text buffer, into terminal cells and
//! `crossterm` commands. It repaints the whole frame every cycle rather than
//! diffing against a previous one — partial/dirty-region repainting is
//! rasterization-engine territory the spec explicitly keeps out of scope,
//! and at this domain's scale (a project plan, not a full-screen editor of
//! arbitrary files) a full repaint per ~10ms cycle is cheap enough not to
//! need it.
//!
//! Cell clusters are full grapheme clusters (not single `char`s) so
//! multi-byte/wide glyphs in task and user names never get split across
//! cells; continuation cells (`width == 0`) hold the remaining columns of a
//! wide cluster and are never printed.

use bitflags::bitflags;

pub mod paint;
pub mod timing;
pub mod viewport;
pub mod writer;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u8 {
        const REVERSE = 0b0000_0001; // reverse-video (software cursor / selection)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Full grapheme cluster string (leader cells only). Empty for continuation cells.
    pub cluster: String,
    /// Visual width in terminal columns. `0` designates a continuation cell.
    pub width: u8,
    pub flags: CellFlags,
    /// Foreground RGB, used to approximate a task's status color (§6 palette)
    /// in the display pane. `None` paints with the terminal's default color.
    pub fg: Option<(u8, u8, u8)>,
}

impl Cell {
    #[inline]
    pub fn leader(cluster: &str, width: u16, flags: CellFlags, fg: Option<(u8, u8, u8)>) -> Self {
        Self {
            cluster: cluster.to_string(),
            width: width.max(1) as u8,
            flags,
            fg,
        }
    }
    #[inline]
    pub fn continuation(flags: CellFlags) -> Self {
        Self {
            cluster: String::new(),
            width: 0,
            flags,
            fg: None,
        }
    }
    #[inline]
    pub fn is_leader(&self) -> bool {
        self.width > 0
    }
    #[inline]
    pub fn visual_width(&self) -> u16 {
        self.width as u16
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            cluster: " ".to_string(),
            width: 1,
            flags: CellFlags::empty(),
            fg: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        }
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Set a full cluster at (x,y) and populate continuation cells for its width.
    pub fn set_cluster(
        &mut self,
        x: u16,
        y: u16,
        cluster: &str,
        width: u16,
        flags: CellFlags,
        fg: Option<(u8, u8, u8)>,
    ) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = width.max(1).min(self.width - x);
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = Cell::leader(cluster, w, flags, fg);
        }
        for dx in 1..w {
            if let Some(c_idx) = self.index(x + dx, y) {
                self.cells[c_idx] = Cell::continuation(flags);
            }
        }
    }

    /// Write a plain ASCII/Unicode string starting at (x,y), one grapheme
    /// cluster per advancing cell, clipped to the frame width.
    pub fn set_str(&mut self, x: u16, y: u16, s: &str, flags: CellFlags, fg: Option<(u8, u8, u8)>) {
        let mut cursor = x;
        for g in core_text::grapheme::iter(s) {
            if cursor >= self.width {
                break;
            }
            let w = core_text::grapheme::cluster_width(g).max(1) as u16;
            self.set_cluster(cursor, y, g, w, flags, fg);
            cursor = cursor.saturating_add(w);
        }
    }

    pub fn apply_flags_span(&mut self, x: u16, y: u16, span_width: u16, flags: CellFlags) {
        let span = span_width.min(self.width.saturating_sub(x));
        for dx in 0..span {
            if let Some(idx) = self.index(x + dx, y) {
                self.cells[idx].flags |= flags;
            }
        }
    }

    /// Iterate leader cells of a row, yielding (&str, width, flags, fg, start_x).
    pub fn row_leaders(
        &self,
        y: u16,
    ) -> impl Iterator<Item = (&str, u16, CellFlags, Option<(u8, u8, u8)>, u16)> + '_ {
        let width = self.width;
        let start = y as usize * width as usize;
        let mut x = 0u16;
        std::iter::from_fn(move || {
            while x < width {
                let idx = start + x as usize;
                let cell = &self.cells[idx];
                if cell.is_leader() {
                    let w = cell.visual_width();
                    let out = (cell.cluster.as_str(), w, cell.flags, cell.fg, x);
                    x = x.saturating_add(w);
                    return Some(out);
                } else {
                    x += 1;
                }
            }
            None
        })
    }
}

/// Emit a `Frame` as a batch of `writer::Command`s starting at screen row
/// `origin_y`. Each row is cleared, then its leader clusters are printed in
/// column order, switching foreground color only at color-run boundaries.
pub fn emit_frame(w: &mut writer::Writer, frame: &Frame, origin_y: u16) {
    for row in 0..frame.height {
        w.move_to(0, origin_y + row);
        w.clear_line(0, origin_y + row);
        let mut current_fg: Option<(u8, u8, u8)> = None;
        let mut run = String::new();
        let mut run_start: Option<u16> = None;
        for (cluster, _width, _flags, fg, x) in frame.row_leaders(row) {
            if fg != current_fg {
                if let Some(start) = run_start.take() {
                    w.move_to(start, origin_y + row);
                    if let Some(rgb) = current_fg {
                        w.set_foreground(rgb);
                    }
                    w.print(std::mem::take(&mut run));
                    if current_fg.is_some() {
                        w.reset_foreground();
                    }
                }
                current_fg = fg;
                run_start = Some(x);
            }
            run.push_str(cluster);
        }
        if let Some(start) = run_start {
            w.move_to(start, origin_y + row);
            if let Some(rgb) = current_fg {
                w.set_foreground(rgb);
            }
            w.print(run);
            if current_fg.is_some() {
                w.reset_foreground();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_str_advances_by_cluster_width() {
        let mut f = Frame::new(10, 1);
        f.set_str(0, 0, "hi", CellFlags::empty(), None);
        let leaders: Vec<&str> = f.row_leaders(0).map(|(c, ..)| c).collect();
        assert_eq!(leaders, vec!["h", "i"]);
    }

    #[test]
    fn set_str_clips_at_frame_width() {
        let mut f = Frame::new(3, 1);
        f.set_str(0, 0, "abcdef", CellFlags::empty(), None);
        let leaders: Vec<&str> = f.row_leaders(0).map(|(c, ..)| c).collect();
        assert_eq!(leaders, vec!["a", "b", "c"]);
    }

    #[test]
    fn apply_flags_span_marks_leader_and_continuation() {
        let mut f = Frame::new(4, 1);
        f.set_cluster(0, 0, "x", 1, CellFlags::empty(), None);
        f.apply_flags_span(0, 0, 1, CellFlags::REVERSE);
        assert!(f.cells[0].flags.contains(CellFlags::REVERSE));
    }
}
