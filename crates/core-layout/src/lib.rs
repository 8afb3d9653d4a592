//! Pure-data Gantt layout: per-user column assignment, per-(task, user)
//! pixel rectangles, and cubic-Bezier dependency-curve sample points.
//!
//! Grounded in the viewport-layout section of `original_source/main.c`
//! (column assignment, task-display rect derivation) and
//! `draw_dependency_curve`/`task_draw_box`. Nothing here touches a
//! framebuffer or a windowing surface — every function returns plain data a
//! renderer would consume, matching the exclusion of rasterization from
//! scope (§1) without excluding the geometry a renderer needs.

use anyhow::{bail, Result};
use core_state::{TaskId, UserId, World};

/// Matches the original's `TASK_DISPLAY_LIMIT`. Exceeding it is a hard
/// error, not a silently-dropped tail: a caller asking to lay out more
/// task-displays than this has a graph too large for this layout engine's
/// contract, not a recoverable warning.
pub const TASK_DISPLAY_LIMIT: usize = 1024;

/// Margin subtracted from each column's width so adjacent task boxes never
/// touch, carried over verbatim from the original's column-width formula.
pub const COLUMN_MARGIN_PX: f64 = 30.0;

/// Vertical control-point offset for the dependency-curve Bezier, in pixels.
pub const CURVE_CONTROL_OFFSET_PX: f64 = 80.0;

/// Number of Bezier segments sampled per curve (49 points, `t` from 0 to 1).
pub const CURVE_RESOLUTION: usize = 48;

/// Ten-entry status-color palette, reproduced exactly from
/// `schedule.h::status_color_init` (alpha always 255).
pub const STATUS_PALETTE: [(u8, u8, u8, u8); 10] = [
    (150, 150, 150, 255),
    (192, 0, 0, 255),
    (255, 0, 0, 255),
    (255, 192, 0, 255),
    (255, 255, 0, 255),
    (146, 208, 80, 255),
    (0, 176, 80, 255),
    (0, 176, 240, 255),
    (0, 112, 192, 255),
    (112, 48, 160, 255),
];

/// Resolve a task's `status_color` index against `STATUS_PALETTE`, falling
/// back to index 0 (unknown/grey) for an out-of-range value rather than
/// panicking — a malformed color byte is bad input, not a structural bug.
pub fn status_rgba(status_color: u8) -> (u8, u8, u8, u8) {
    STATUS_PALETTE
        .get(status_color as usize)
        .copied()
        .unwrap_or(STATUS_PALETTE[0])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn top_center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y)
    }

    pub fn bottom_center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h)
    }
}

/// One (task, user) pixel box, or a single no-user box for a task with no
/// assigned users. A task with N users produces N entries, one per column.
#[derive(Debug, Clone)]
pub struct TaskDisplay {
    pub task: TaskId,
    pub user: Option<UserId>,
    pub rect: Rect,
    pub color: (u8, u8, u8, u8),
    pub selected: bool,
}

/// Column geometry computed once per layout pass.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    pub user_centers: Vec<(UserId, f64)>,
    pub nouser_center: Option<f64>,
    pub column_width: f64,
}

/// Complete layout output: column geometry, every task-display box, and the
/// sampled dependency curves connecting a prereq's box to each dependent's.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub columns: Columns,
    pub task_displays: Vec<TaskDisplay>,
    pub dependency_curves: Vec<Vec<(f64, f64)>>,
}

/// Build the full display layout for `world` against a viewport of
/// `viewport_width` pixels, scaling days to pixels by `pixels_per_day`.
///
/// Returns `Err` if the live task set would produce more than
/// `TASK_DISPLAY_LIMIT` (task, user) boxes.
pub fn build(world: &World, viewport_width: f64, pixels_per_day: f64) -> Result<Layout> {
    let _span = tracing::debug_span!("layout").entered();

    let live_users: Vec<UserId> = {
        let mut ids: Vec<UserId> = world.users.for_each_live().map(|(id, _)| id).collect();
        ids.sort_by_key(|id| id.0);
        ids
    };
    let orphaned = world
        .tasks
        .for_each_live()
        .any(|(_, t)| t.users.is_empty());

    let column_count = live_users.len() + if orphaned { 1 } else { 0 };
    let columns = assign_columns(&live_users, orphaned, column_count, viewport_width);

    let day_project_start = world
        .tasks
        .for_each_live()
        .map(|(_, t)| t.day_start)
        .min()
        .unwrap_or(0);

    let mut task_displays = Vec::new();
    for (task_id, task) in world.tasks.for_each_live() {
        let color = status_rgba(task.status_color);
        let selected = task.mode_edit;
        if task.users.is_empty() {
            let column_px = columns
                .nouser_center
                .expect("a task with no users implies the no-user column was allocated");
            task_displays.push(TaskDisplay {
                task: task_id,
                user: None,
                rect: task_rect(
                    column_px,
                    columns.column_width,
                    task.day_start,
                    task.day_duration,
                    day_project_start,
                    pixels_per_day,
                ),
                color,
                selected,
            });
        } else {
            for uid in task.users.iter().copied() {
                let column_px = columns
                    .user_centers
                    .iter()
                    .find(|(id, _)| *id == uid)
                    .map(|(_, px)| *px)
                    .unwrap_or(0.0);
                task_displays.push(TaskDisplay {
                    task: task_id,
                    user: Some(uid),
                    rect: task_rect(
                        column_px,
                        columns.column_width,
                        task.day_start,
                        task.day_duration,
                        day_project_start,
                        pixels_per_day,
                    ),
                    color,
                    selected,
                });
            }
        }
        if task_displays.len() > TASK_DISPLAY_LIMIT {
            bail!(
                "task display count exceeds limit of {} (layout cannot represent this graph)",
                TASK_DISPLAY_LIMIT
            );
        }
    }

    let dependency_curves = build_dependency_curves(world, &task_displays);

    Ok(Layout {
        columns,
        task_displays,
        dependency_curves,
    })
}

fn task_rect(
    column_px: f64,
    width: f64,
    day_start: i64,
    day_duration: i64,
    day_project_start: i64,
    pixels_per_day: f64,
) -> Rect {
    Rect {
        x: column_px - width / 2.0,
        y: pixels_per_day * (day_start - day_project_start) as f64,
        w: width,
        h: pixels_per_day * day_duration as f64,
    }
}

/// Assign each live user a column center, reserving a leading no-user column
/// when any live task has zero users. Mirrors the original's
/// `user_column_increment`/`nouser_column_center_px`/`column_index` loop.
fn assign_columns(
    live_users: &[UserId],
    orphaned: bool,
    column_count: usize,
    viewport_width: f64,
) -> Columns {
    if column_count == 0 {
        return Columns {
            user_centers: Vec::new(),
            nouser_center: None,
            column_width: viewport_width,
        };
    }
    let increment = viewport_width / column_count as f64;
    let nouser_center = orphaned.then_some(increment / 2.0);
    let base = if orphaned {
        increment + increment / 2.0
    } else {
        increment / 2.0
    };
    let user_centers = live_users
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, base + i as f64 * increment))
        .collect();
    let column_width = (viewport_width / column_count as f64) - COLUMN_MARGIN_PX;
    Columns {
        user_centers,
        nouser_center,
        column_width,
    }
}

fn build_dependency_curves(world: &World, task_displays: &[TaskDisplay]) -> Vec<Vec<(f64, f64)>> {
    let mut curves = Vec::new();
    for td in task_displays {
        let task = world.tasks.task(td.task);
        for dependent in task.dependents.iter().copied() {
            for dep_td in task_displays.iter().filter(|d| d.task == dependent) {
                let start = td.rect.bottom_center();
                let end = dep_td.rect.top_center();
                curves.push(dependency_curve_points(start, end));
            }
        }
    }
    curves
}

/// Sample a cubic Bezier curve from `start` to `end` whose control points
/// are offset vertically by `CURVE_CONTROL_OFFSET_PX` on each side — i.e.
/// the curve leaves `start` heading straight down and arrives at `end`
/// heading straight down, producing the original's characteristic S-curve
/// between a task's bottom edge and a dependent's top edge. Returns
/// `CURVE_RESOLUTION + 1` points (`t` stepped from 0 to 1 inclusive).
pub fn dependency_curve_points(start: (f64, f64), end: (f64, f64)) -> Vec<(f64, f64)> {
    let (sx, sy) = start;
    let (ex, ey) = end;
    let steps = CURVE_RESOLUTION;
    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let mt = 1.0 - t;
        let x = mt.powi(3) * sx + 3.0 * mt.powi(2) * t * sx + 3.0 * mt * t.powi(2) * ex + t.powi(3) * ex;
        let y = mt.powi(3) * sy
            + 3.0 * mt.powi(2) * t * (sy + CURVE_CONTROL_OFFSET_PX)
            + 3.0 * mt * t.powi(2) * (ey - CURVE_CONTROL_OFFSET_PX)
            + t.powi(3) * ey;
        points.push((x, y));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_parser::parse::parse_text;
    use core_text::Buffer;

    fn world_from(text: &str) -> World {
        let mut w = World::new(Buffer::from_str("t", text).unwrap());
        parse_text(&mut w);
        w
    }

    #[test]
    fn column_assignment_reserves_nouser_column_when_orphans_present() {
        let mut w = world_from("A {\n  duration: 1\n  user: alice\n}\nB {\n  duration: 1\n}\n");
        w.tasks.task_mut(w.tasks.get("A").unwrap()).day_start = 0;
        let layout = build(&w, 900.0, 10.0).unwrap();
        assert_eq!(layout.columns.user_centers.len(), 1);
        assert!(layout.columns.nouser_center.is_some());
        let nouser_box = layout
            .task_displays
            .iter()
            .find(|td| td.user.is_none())
            .unwrap();
        assert_eq!(nouser_box.rect.x + nouser_box.rect.w / 2.0, layout.columns.nouser_center.unwrap());
    }

    #[test]
    fn no_orphans_means_no_nouser_column() {
        let w = world_from("A {\n  duration: 1\n  user: alice\n}\n");
        let layout = build(&w, 900.0, 10.0).unwrap();
        assert!(layout.columns.nouser_center.is_none());
        assert!(layout.task_displays.iter().all(|td| td.user.is_some()));
    }

    #[test]
    fn task_rect_reflects_schedule_and_duration() {
        let mut w = world_from(
            "A {\n  duration: 1\n}\nB {\n  duration: 5\n  user: alice\n}\n",
        );
        let b = w.tasks.get("B").unwrap();
        w.tasks.task_mut(b).day_start = 3;
        let layout = build(&w, 900.0, 10.0).unwrap();
        let td = layout
            .task_displays
            .iter()
            .find(|td| td.task == b)
            .unwrap();
        assert_eq!(td.rect.y, 30.0); // pixels_per_day(10) * (day_start(3) - project_start(0))
        assert_eq!(td.rect.h, 50.0); // pixels_per_day(10) * duration(5)
    }

    #[test]
    fn dependency_curve_has_expected_sample_count_and_endpoints() {
        let points = dependency_curve_points((0.0, 0.0), (100.0, 200.0));
        assert_eq!(points.len(), CURVE_RESOLUTION + 1);
        assert_eq!(points.first().copied().unwrap(), (0.0, 0.0));
        let last = points.last().copied().unwrap();
        assert!((last.0 - 100.0).abs() < 1e-9);
        assert!((last.1 - 200.0).abs() < 1e-9);
    }

    #[test]
    fn overflow_past_display_limit_is_a_hard_error() {
        let mut text = String::new();
        for i in 0..(TASK_DISPLAY_LIMIT + 5) {
            text.push_str(&format!("T{i} {{\n  duration: 1\n}}\n"));
        }
        let w = world_from(&text);
        let result = build(&w, 900.0, 10.0);
        assert!(result.is_err());
    }

    #[test]
    fn status_rgba_falls_back_to_grey_for_out_of_range_index() {
        assert_eq!(status_rgba(255), STATUS_PALETTE[0]);
        assert_eq!(status_rgba(3), (255, 192, 0, 255));
    }
}
