//! On-disk load/save (§6): missing file on load is created containing a
//! single space; save always regenerates the all-tasks projection, never
//! whatever partial edit-mode text happens to be on screen, mirroring the
//! original's separate `save_buffer` used only for `text_buffer_save`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use core_parser::serialize::{serialize, ProjectionFilter};
use core_state::World;
use core_text::Buffer;

/// Load `path` into a fresh buffer, creating it with a single space if it
/// doesn't exist. Every task starts in edit mode so the first parse renders
/// the whole file, matching `editor_load_text`'s initial
/// `mode_edit = TRUE` sweep.
pub fn load_or_create(path: &Path) -> Result<Buffer> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "file does not exist, creating it");
            fs::write(path, " ")
                .with_context(|| format!("creating {}", path.display()))?;
            " ".to_string()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", path.display()));
        }
    };
    Buffer::from_str(path.display().to_string(), &content)
}

/// Write the all-tasks projection of `world` to `path`, overwriting
/// whatever was there.
pub fn save(world: &World, path: &Path) -> Result<()> {
    let serialized = serialize(world, ProjectionFilter::AllTasks);
    fs::write(path, serialized.text).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "save successful");
    Ok(())
}
