//! Terminal writer abstraction: batches primitive terminal operations
//! (cursor motion, line clears, styled prints) so a whole frame flushes in
//! one `stdout` write rather than many small ones.
//!
//! Design invariants:
//! * Commands preserve ordering; no flushing mid-frame.
//! * All positions are absolute (0,0) origin; caller ensures bounds.
//! * Writer owns no global state; it's a short-lived object per frame.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{stdout, Write};

#[derive(Debug)]
pub enum Command {
    MoveTo(u16, u16),
    ClearLine(u16, u16),
    Print(String),
    SetForeground(u8, u8, u8),
    ResetForeground,
}

#[derive(Default)]
pub struct Writer {
    cmds: Vec<Command>,
}

impl Writer {
    pub fn new() -> Self {
        Self { cmds: Vec::new() }
    }
    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cmds.push(Command::MoveTo(x, y));
    }
    pub fn clear_line(&mut self, x: u16, y: u16) {
        self.cmds.push(Command::ClearLine(x, y));
    }
    pub fn print<S: Into<String>>(&mut self, s: S) {
        let s: String = s.into();
        if !s.is_empty() {
            self.cmds.push(Command::Print(s));
        }
    }
    pub fn set_foreground(&mut self, rgb: (u8, u8, u8)) {
        self.cmds.push(Command::SetForeground(rgb.0, rgb.1, rgb.2));
    }
    pub fn reset_foreground(&mut self) {
        self.cmds.push(Command::ResetForeground);
    }
    pub fn flush(self) -> Result<()> {
        let mut out = stdout();
        for c in self.cmds {
            match c {
                Command::MoveTo(x, y) => {
                    queue!(out, MoveTo(x, y))?;
                }
                Command::ClearLine(_, _) => {
                    queue!(out, Clear(ClearType::CurrentLine))?;
                }
                Command::Print(s) => {
                    queue!(out, Print(s))?;
                }
                Command::SetForeground(r, g, b) => {
                    queue!(out, SetForegroundColor(crossterm::style::Color::Rgb { r, g, b }))?;
                }
                Command::ResetForeground => {
                    queue!(out, ResetColor)?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}
