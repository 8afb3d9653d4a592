//! Paint passes: buffer + cursors -> editor `Frame`, `core_layout::Layout` ->
//! display `Frame`, and a one-line status bar. Each function is pure (world
//! in, `Frame` out); `ox-bin` owns deciding which pane is active and when to
//! call these.

use core_layout::Layout;
use core_state::World;
use core_text::Buffer;

use crate::viewport::Viewport;
use crate::{Cell, CellFlags, Frame};

/// Paint the visible slice of `buffer` starting at `viewport.first_line`,
/// with every live cursor's grapheme reverse-videoed. `viewport.height` rows
/// are available for text; the caller reserves a separate row for the
/// status line.
pub fn paint_editor(
    buffer: &Buffer,
    cursors: &[core_text::Position],
    viewport: Viewport,
    width: u16,
) -> Frame {
    let mut frame = Frame::new(width, viewport.height as u16);
    for row in 0..viewport.height {
        let line_idx = viewport.first_line + row;
        let Some(line) = buffer.line(line_idx) else {
            break;
        };
        let line = line.trim_end_matches('\n');
        frame.set_str(0, row as u16, line, CellFlags::empty(), None);
    }
    for pos in cursors {
        if pos.line < viewport.first_line || pos.line >= viewport.first_line + viewport.height {
            continue;
        }
        let row = (pos.line - viewport.first_line) as u16;
        let line_text = buffer.line(pos.line).unwrap_or_default();
        let col = core_text::grapheme::visual_col(&line_text, pos.byte) as u16;
        frame.apply_flags_span(col, row, 1, CellFlags::REVERSE);
    }
    frame
}

/// Paint the Gantt display pane: each task-display's rect becomes a labeled
/// block of cells at `(rect.x / px_per_col, rect.y / px_per_row)`, colored by
/// its status color; selected tasks get a reverse-video label.
pub fn paint_display(
    layout: &Layout,
    world: &World,
    width: u16,
    height: u16,
    px_per_col: f64,
    px_per_row: f64,
) -> Frame {
    let mut frame = Frame::new(width, height);
    for td in &layout.task_displays {
        let x = (td.rect.x / px_per_col).round().max(0.0) as u16;
        let y = (td.rect.y / px_per_row).round().max(0.0) as u16;
        if y >= height || x >= width {
            continue;
        }
        let name = world
            .tasks
            .try_task(td.task)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        let flags = if td.selected {
            CellFlags::REVERSE
        } else {
            CellFlags::empty()
        };
        let (r, g, b, _a) = td.color;
        frame.set_str(x, y, &name, flags, Some((r, g, b)));
    }
    frame
}

/// Build a single status row's cells: buffer name, cursor count, and an
/// optional ephemeral message (e.g. a save confirmation or parse warning).
pub fn paint_status(width: u16, buffer_name: &str, cursor_count: usize, message: Option<&str>) -> Vec<Cell> {
    let mut frame = Frame::new(width, 1);
    let text = match message {
        Some(m) => format!("{buffer_name}  [{cursor_count} cursor(s)]  {m}"),
        None => format!("{buffer_name}  [{cursor_count} cursor(s)]"),
    };
    frame.set_str(0, 0, &text, CellFlags::REVERSE, None);
    frame.apply_flags_span(0, 0, width, CellFlags::REVERSE);
    frame.cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_row_is_fully_reversed() {
        let cells = paint_status(20, "plan.txt", 1, None);
        assert!(cells.iter().all(|c| c.flags.contains(CellFlags::REVERSE)));
    }

    #[test]
    fn editor_paint_renders_visible_lines() {
        let buf = Buffer::from_str("t", "a{\n}\n b {\n}\n").unwrap();
        let viewport = Viewport::new(0, 2);
        let frame = paint_editor(&buf, &[], viewport, 10);
        let row0: String = frame.row_leaders(0).map(|(c, ..)| c).collect();
        assert!(row0.starts_with("a{"));
    }
}
