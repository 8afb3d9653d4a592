//! Configuration loading and parsing.
//!
//! Parses `plan.toml` (or an override path provided by the binary),
//! extracting `[scroll.margin] vertical = <u16>` (editor-pane vertical
//! scroll margin, default 0), `[loop] throttle_ms` (main-loop cycle period,
//! §5), and `[display] pixels_per_day` (initial Gantt zoom level, §4.G).
//! The scroll margin is clamped to `(h - 2) / 2` where `h` is the current
//! viewport height, supplied by the caller via `ConfigContext` at apply time;
//! the raw parsed value is retained so a later resize can re-clamp.
//!
//! Unknown fields are ignored (TOML deserialization tolerance) to allow
//! forward evolution without immediate warnings.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigPlatformTraits {
    pub is_windows: bool,
    pub supports_scroll_region: bool,
}

impl ConfigPlatformTraits {
    pub const fn new(is_windows: bool, supports_scroll_region: bool) -> Self {
        Self {
            is_windows,
            supports_scroll_region,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub viewport_columns: u16,
    pub viewport_rows: u16,
    pub status_rows: u16,
    pub overlay_rows: u16,
    pub platform: ConfigPlatformTraits,
}

impl ConfigContext {
    pub fn new(
        viewport_columns: u16,
        viewport_rows: u16,
        status_rows: u16,
        overlay_rows: u16,
        platform: ConfigPlatformTraits,
    ) -> Self {
        Self {
            viewport_columns,
            viewport_rows,
            status_rows,
            overlay_rows,
            platform,
        }
    }

    pub fn text_rows(&self) -> u16 {
        let reserved = self.status_rows.saturating_add(self.overlay_rows);
        self.viewport_rows.saturating_sub(reserved)
    }

    pub fn from_viewport_height(viewport_rows: u16) -> Self {
        Self {
            viewport_columns: 0,
            viewport_rows,
            status_rows: 0,
            overlay_rows: 0,
            platform: ConfigPlatformTraits::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MarginConfig {
    #[serde(default)]
    pub vertical: u16,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScrollConfig {
    #[serde(default)]
    pub margin: MarginConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default, rename = "loop")]
    pub loop_: LoopConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,            // original file string (optional)
    pub file: ConfigFile,               // parsed (or default) data
    pub effective_vertical_margin: u16, // clamped to viewport semantics
}

/// Main-loop cycle period (§5: "input drain -> parse if dirty -> schedule ->
/// layout -> render", throttled to roughly one cycle per `throttle_ms`).
#[derive(Debug, Deserialize, Clone)]
pub struct LoopConfig {
    #[serde(default = "LoopConfig::default_throttle_ms")]
    pub throttle_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            throttle_ms: Self::default_throttle_ms(),
        }
    }
}

impl LoopConfig {
    const fn default_throttle_ms() -> u64 {
        10
    }
}

/// Initial Gantt-pane geometry (§4.G); the user can still zoom/pan at
/// runtime via the display camera commands.
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_pixels_per_day")]
    pub pixels_per_day: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            pixels_per_day: Self::default_pixels_per_day(),
        }
    }
}

impl DisplayConfig {
    const fn default_pixels_per_day() -> f64 {
        40.0
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("plan.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("plan-workbench").join("plan.toml");
    }
    PathBuf::from("plan.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(Config {
                raw: Some(content),
                file,
                effective_vertical_margin: 0, // computed later
            }),
            Err(_e) => {
                // On parse error fallback to defaults (breadth-first resilience).
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Apply viewport + platform context to compute clamped vertical margin.
    /// Returns the effective (possibly clamped) value.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> u16 {
        let raw = self.file.scroll.margin.vertical;
        let text_rows = ctx.text_rows();
        let (clamped, max) = if text_rows <= 3 {
            (0, 0)
        } else {
            let max = (text_rows.saturating_sub(2)) / 2; // (h - 2)/2 using text rows
            (raw.min(max), max)
        };

        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                max,
                text_rows,
                viewport_rows = ctx.viewport_rows,
                overlay_rows = ctx.overlay_rows,
                status_rows = ctx.status_rows,
                supports_scroll_region = ctx.platform.supports_scroll_region,
                is_windows = ctx.platform.is_windows,
                "scroll_margin_vertical_clamped"
            );
        }
        self.effective_vertical_margin = clamped;
        clamped
    }

    /// Back-compat wrapper for pre-context API: apply viewport height only.
    pub fn apply_viewport_height(&mut self, viewport_height: u16) -> u16 {
        self.apply_context(ConfigContext::from_viewport_height(viewport_height))
    }

    /// Recompute effective vertical margin on a viewport or platform change. Returns
    /// `Some(new_margin)` when the effective value changed, else `None`.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<u16> {
        let prev = self.effective_vertical_margin;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }

    /// Back-compat wrapper using viewport height only.
    pub fn recompute_after_resize(&mut self, new_viewport_height: u16) -> Option<u16> {
        self.recompute_with_context(ConfigContext::from_viewport_height(new_viewport_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    fn ctx_with_text_rows(rows: u16) -> ConfigContext {
        ConfigContext::new(80, rows, 0, 0, ConfigPlatformTraits::default())
    }

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file.scroll.margin.vertical, 0);
    }

    #[test]
    fn parses_vertical_margin_value() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[scroll.margin]\nvertical = 3\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.scroll.margin.vertical, 3);
        cfg.apply_context(ctx_with_text_rows(40)); // ample height, no clamp
        assert_eq!(cfg.effective_vertical_margin, 3);
    }

    #[test]
    fn clamps_when_value_exceeds_half_minus_one() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[scroll.margin]\nvertical = 50\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        // viewport height 20 -> max = (20 - 2)/2 = 9
        let eff = cfg.apply_context(ctx_with_text_rows(20));
        assert_eq!(eff, 9);
        assert_eq!(cfg.effective_vertical_margin, 9);
    }

    #[test]
    fn recompute_with_context_changes_when_height_shrinks() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[scroll.margin]\nvertical = 10\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        cfg.apply_context(ctx_with_text_rows(50)); // plenty of room, margin=10
        assert_eq!(cfg.effective_vertical_margin, 10);
        // Shrink height so max decreases below 10: text rows reduce to 10 -> max=(10-2)/2=4
        let changed = cfg.recompute_with_context(ctx_with_text_rows(10));
        assert_eq!(changed, Some(4));
        assert_eq!(cfg.effective_vertical_margin, 4);
        // Another resize to slightly larger but same cap should keep value stable
        let changed2 = cfg.recompute_with_context(ctx_with_text_rows(11)); // max=(11-2)/2=4
        assert_eq!(changed2, None);
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[scroll.margin]\nvertical = 8\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            // Text rows small enough to force clamp: rows=6 -> max=(6-2)/2 = 2
            cfg.apply_context(ConfigContext::new(
                80,
                7,
                1,
                0,
                ConfigPlatformTraits::new(false, true),
            ));
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("scroll_margin_vertical_clamped"));
        assert_eq!(cfg.effective_vertical_margin, 2);
    }

    #[test]
    fn loop_and_display_defaults_present() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_loop__.toml"))).unwrap();
        assert_eq!(cfg.file.loop_.throttle_ms, 10);
        assert_eq!(cfg.file.display.pixels_per_day, 40.0);
    }

    #[test]
    fn parses_loop_and_display_fields() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[loop]\nthrottle_ms = 25\n[display]\npixels_per_day = 60.0\n[scroll.margin]\nvertical = 3\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.loop_.throttle_ms, 25);
        assert_eq!(cfg.file.display.pixels_per_day, 60.0);
        assert_eq!(cfg.file.scroll.margin.vertical, 3);
    }
}
