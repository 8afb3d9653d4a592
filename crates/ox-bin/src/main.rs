//! `planwb`: interactive project-planning workbench entrypoint.
//!
//! Wires every domain crate together per the external-interfaces and
//! concurrency-model sections of the spec: a single positional CLI argument
//! names the plan file, a `core-terminal` raw-mode session drives an async
//! `core-input` key stream, `core-keymap` turns key events into commands,
//! `core-actions`/`core-parser`/`core-schedule`/`core-layout` mutate and
//! derive from a single `core-state::World`, and `core-render` paints the
//! result. The loop cycles at `core-config`'s configured throttle: drain
//! pending input, re-parse the buffer if it changed, re-solve the schedule,
//! rebuild the display layout, propagate selection between panes, repaint.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use core_actions::{apply_display_command, apply_editor_command, io_ops, DisplayCommand};
use core_events::{CommandEvent, Event, InputEvent};
use core_keymap::{Command as KeymapCommand, DisplayAction, EditorAction, GlobalCommand, ViewportFocus};
use core_render::paint;
use core_render::viewport::Viewport;
use core_render::writer::Writer;
use core_state::World;
use core_terminal::CrosstermBackend;

#[derive(Debug, Parser)]
#[command(name = "planwb", about = "Interactive project-planning workbench")]
struct Args {
    /// Path to the plan file to load (created with a single space if missing).
    path: PathBuf,
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", "planwb.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    guard
}

struct Session {
    world: World,
    path: PathBuf,
    focus: ViewportFocus,
    pixels_per_day: f64,
    status_message: Option<String>,
    should_quit: bool,
}

impl Session {
    fn load(path: PathBuf, pixels_per_day: f64) -> Result<Self> {
        let buffer = io_ops::load_or_create(&path)?;
        let mut world = World::new(buffer);
        let report = core_parser::parse::parse_text(&mut world);
        for w in &report.warnings {
            tracing::warn!(%w, "initial parse warning");
        }
        // The freshly loaded buffer is, by definition, the all-tasks
        // projection: every task it yields starts in edit mode so later
        // edits that delete a task's block actually destroy the task
        // (core_parser::parse::parse_text only sweeps edit-mode tasks).
        let loaded: Vec<core_state::TaskId> =
            world.tasks.for_each_live().map(|(id, _)| id).collect();
        for id in loaded {
            world.tasks.task_mut(id).mode_edit = true;
        }
        let _ = core_schedule::solve(&mut world);
        Ok(Self {
            world,
            path,
            focus: ViewportFocus::Editor,
            pixels_per_day,
            status_message: None,
            should_quit: false,
        })
    }

    fn reparse_and_reschedule(&mut self) {
        let report = core_parser::parse::parse_text(&mut self.world);
        if !report.warnings.is_empty() {
            self.status_message = report.warnings.last().cloned();
        }
        let outcome = core_schedule::solve(&mut self.world);
        if !outcome.solved {
            self.status_message = Some("schedule unsatisfiable: graph unchanged".to_string());
        }
    }

    /// Regenerate the editor buffer from the current edit-mode projection,
    /// then reparse and reschedule against it. Any command that changes
    /// which tasks are edit-mode (selection) or creates a task meant to
    /// appear in the editor must route through this rather than
    /// `reparse_and_reschedule` alone, or the new/changed tasks are invisible
    /// to the reparse and get swept as abandoned.
    fn regenerate_and_reparse(&mut self) {
        if let Err(e) = core_actions::regenerate_edit_mode_text(&mut self.world) {
            self.status_message = Some(format!("projection rebuild failed: {e}"));
            return;
        }
        self.reparse_and_reschedule();
    }

    fn handle_global(&mut self, cmd: GlobalCommand) {
        match cmd {
            GlobalCommand::Quit => self.should_quit = true,
            GlobalCommand::FileSave => {
                match io_ops::save(&self.world, &self.path) {
                    Ok(()) => self.status_message = Some("saved".to_string()),
                    Err(e) => self.status_message = Some(format!("save failed: {e}")),
                }
            }
            GlobalCommand::FileReload => match io_ops::load_or_create(&self.path) {
                Ok(buffer) => {
                    self.world.buffer = buffer;
                    self.world.cursors.reset(&self.world.buffer);
                    self.reparse_and_reschedule();
                    self.status_message = Some("reloaded".to_string());
                }
                Err(e) => self.status_message = Some(format!("reload failed: {e}")),
            },
            GlobalCommand::ViewportModeToggle => {
                self.focus = match self.focus {
                    ViewportFocus::Editor => ViewportFocus::Display,
                    ViewportFocus::Display => ViewportFocus::Editor,
                };
            }
        }
    }

    fn handle_editor(&mut self, action: EditorAction) {
        match action {
            EditorAction::SymbolRename => {
                if let Err(e) = core_actions::symbol_rename(&mut self.world) {
                    self.status_message = Some(format!("rename failed: {e}"));
                }
            }
            EditorAction::InsertChar(c) => apply_editor_command(
                &mut self.world,
                core_actions::editor::EditorCommand::InsertChar(c),
            ),
            EditorAction::Return => {
                apply_editor_command(&mut self.world, core_actions::editor::EditorCommand::Return)
            }
            EditorAction::Backspace => apply_editor_command(
                &mut self.world,
                core_actions::editor::EditorCommand::Backspace,
            ),
            EditorAction::Delete => {
                apply_editor_command(&mut self.world, core_actions::editor::EditorCommand::Delete)
            }
            EditorAction::Move(dir) => apply_editor_command(
                &mut self.world,
                core_actions::editor::EditorCommand::Move(dir),
            ),
            EditorAction::MulticursorDeselect => apply_editor_command(
                &mut self.world,
                core_actions::editor::EditorCommand::MulticursorDeselect,
            ),
        }
        self.reparse_and_reschedule();
    }

    fn focused_display_task(&self) -> Option<core_state::TaskId> {
        core_actions::editor_cursor_to_display_task(&self.world)
    }

    fn handle_display(&mut self, action: DisplayAction) {
        let focus = self.focused_display_task();
        match action {
            DisplayAction::SelectionToggle => {
                apply_display_command(&mut self.world, DisplayCommand::SelectionToggle, focus);
                self.regenerate_and_reparse();
            }
            DisplayAction::SelectPrereqOne => {
                apply_display_command(&mut self.world, DisplayCommand::SelectPrereqOne, focus);
                self.regenerate_and_reparse();
            }
            DisplayAction::SelectPrereqAll => {
                loop {
                    let before = selected_count(&self.world);
                    apply_display_command(&mut self.world, DisplayCommand::SelectPrereqOne, focus);
                    if selected_count(&self.world) == before {
                        break;
                    }
                }
                self.regenerate_and_reparse();
            }
            DisplayAction::SelectDependentOne => {
                apply_display_command(&mut self.world, DisplayCommand::SelectDependentOne, focus);
                self.regenerate_and_reparse();
            }
            DisplayAction::SelectDependentAll => {
                loop {
                    let before = selected_count(&self.world);
                    apply_display_command(&mut self.world, DisplayCommand::SelectDependentOne, focus);
                    if selected_count(&self.world) == before {
                        break;
                    }
                }
                self.regenerate_and_reparse();
            }
            DisplayAction::SelectNone => {
                apply_display_command(&mut self.world, DisplayCommand::SelectNone, focus);
                self.regenerate_and_reparse();
            }
            DisplayAction::TaskCreateSplit => {
                apply_display_command(&mut self.world, DisplayCommand::TaskCreateSplit, focus);
                self.regenerate_and_reparse();
            }
            DisplayAction::TaskCreateSuccessor => {
                apply_display_command(&mut self.world, DisplayCommand::TaskCreateSuccessor, focus);
                self.regenerate_and_reparse();
            }
            DisplayAction::CursorNavigate(dir) => {
                if let Some(task) = navigate_task(&self.world, focus, dir) {
                    core_actions::display_navigate_to_editor(&mut self.world, task);
                }
            }
            DisplayAction::ZoomIn => self.pixels_per_day = (self.pixels_per_day * 1.25).min(400.0),
            DisplayAction::ZoomOut => self.pixels_per_day = (self.pixels_per_day / 1.25).max(2.0),
            DisplayAction::ZoomAll => self.pixels_per_day = 40.0,
            DisplayAction::ScrollUp | DisplayAction::ScrollDown => {
                // Camera pan is pure viewport state with no World representation
                // yet (no scrollable display-viewport struct exists); a future
                // display-camera type would track an offset here.
            }
        }
    }

    fn handle_command(&mut self, cmd: KeymapCommand) {
        match cmd {
            KeymapCommand::Global(g) => self.handle_global(g),
            KeymapCommand::Editor(a) => self.handle_editor(a),
            KeymapCommand::Display(a) => self.handle_display(a),
        }
    }

    fn render(&self, writer: &mut Writer, width: u16, height: u16) {
        let text_rows = height.saturating_sub(1);
        match self.focus {
            ViewportFocus::Editor => {
                let cursor_positions: Vec<core_text::Position> = self
                    .world
                    .cursors
                    .iter()
                    .map(|c| self.world.buffer.position_of(c.offset))
                    .collect();
                let viewport = Viewport::new(0, text_rows as usize);
                let frame =
                    paint::paint_editor(&self.world.buffer, &cursor_positions, viewport, width);
                core_render::emit_frame(writer, &frame, 0);
            }
            ViewportFocus::Display => {
                if let Ok(layout) = core_layout::build(&self.world, width as f64, self.pixels_per_day)
                {
                    let frame = paint::paint_display(
                        &layout,
                        &self.world,
                        width,
                        text_rows,
                        1.0,
                        1.0,
                    );
                    core_render::emit_frame(writer, &frame, 0);
                }
            }
        }
        let cells = paint::paint_status(
            width,
            &self.world.buffer.name,
            self.world.cursors.len(),
            self.status_message.as_deref(),
        );
        let status_frame = core_render::Frame {
            width,
            height: 1,
            cells,
        };
        core_render::emit_frame(writer, &status_frame, text_rows);
    }
}

fn selected_count(world: &World) -> usize {
    world
        .tasks
        .for_each_live()
        .filter(|(_, t)| t.mode_edit)
        .count()
}

/// Move the display focus one task in `dir`'s direction, ordered by the
/// task's schedule start day (so left/right reads as earlier/later in time,
/// up/down as the next/previous task at roughly the same time).
fn navigate_task(
    world: &World,
    focus: Option<core_state::TaskId>,
    dir: core_text::cursor::MoveDir,
) -> Option<core_state::TaskId> {
    use core_text::cursor::MoveDir;
    let mut ordered: Vec<core_state::TaskId> = world.tasks.for_each_live().map(|(id, _)| id).collect();
    ordered.sort_by_key(|id| world.tasks.task(*id).day_start);
    let current_idx = focus.and_then(|f| ordered.iter().position(|id| *id == f));
    let idx = match (current_idx, dir) {
        (Some(i), MoveDir::Right | MoveDir::Down) => (i + 1).min(ordered.len().saturating_sub(1)),
        (Some(i), MoveDir::Left | MoveDir::Up) => i.saturating_sub(1),
        (None, _) => 0,
        _ => return focus,
    };
    ordered.get(idx).copied()
}

async fn run(args: Args) -> Result<()> {
    let cfg = core_config::load_from(None)?;

    let mut session = Session::load(args.path, cfg.file.display.pixels_per_day)?;

    let mut backend = CrosstermBackend::new();
    let _guard = backend.enter_guard()?;

    let (tx, mut rx) = mpsc::channel::<Event>(256);
    let (input_handle, input_shutdown) = core_input::spawn_async_input(tx.clone());

    let (mut width, mut height) = crossterm::terminal::size().unwrap_or((80, 24));
    let throttle = Duration::from_millis(cfg.file.loop_.throttle_ms);

    loop {
        let cycle_deadline = tokio::time::Instant::now() + throttle;

        while let Ok(event) = rx.try_recv() {
            match event {
                Event::Input(InputEvent::Key(key)) => {
                    if let Some(cmd) = core_keymap::resolve(session.focus, key) {
                        session.handle_command(cmd);
                    }
                }
                Event::Input(InputEvent::KeyPress(ext)) => {
                    if let Some(key) = core_input::key_token_to_key_event(&ext.token) {
                        if let Some(cmd) = core_keymap::resolve(session.focus, key) {
                            session.handle_command(cmd);
                        }
                    }
                }
                Event::Input(InputEvent::Resize(w, h)) => {
                    width = w;
                    height = h;
                }
                Event::Input(InputEvent::CtrlC) => session.should_quit = true,
                Event::Command(CommandEvent::Quit) => session.should_quit = true,
                Event::Shutdown => session.should_quit = true,
                _ => {}
            }
        }

        if session.should_quit {
            break;
        }

        let start = std::time::Instant::now();
        let mut writer = Writer::new();
        session.render(&mut writer, width, height);
        writer.flush()?;
        core_render::timing::record_last_render_ns(start.elapsed().as_nanos() as u64);

        tokio::time::sleep_until(cycle_deadline).await;
    }

    io_ops::save(&session.world, &session.path)?;
    input_shutdown.signal();
    let _ = input_handle.await;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(run(args)) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            std::process::exit(-1);
        }
    }
}
