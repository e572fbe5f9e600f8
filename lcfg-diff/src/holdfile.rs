//! Hold-file output
//!
//! The hold file is the reviewable record of a pending profile change:
//! one block per changed component, a four-line entry per changed
//! resource, and the new profile signature on the last line. The file is
//! written through a temp file in the target directory and atomically
//! renamed into place; the temp file is removed on any failure.

use crate::diff::{DiffProfile, ResourceChange};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Hold-file writer errors.
#[derive(Debug, Error)]
pub enum HoldFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to publish hold file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Render a profile diff to the hold-file text.
///
/// Components appear sorted by name, each introduced by a
/// `component: <name> (<change>)` header; every changed resource
/// contributes four lines: the change marker (`+`, `-` or `~`), the
/// qualified resource name, the old value and the new value. The final
/// line is `signature: <hex>`.
pub fn format_holdfile(diff: &DiffProfile, signature: &str) -> String {
    let mut out = String::new();
    for component in diff.components() {
        out.push_str(&format!(
            "component: {} ({})\n",
            component.name(),
            component.change()
        ));
        for entry in component.entries() {
            if entry.change() == ResourceChange::None {
                continue;
            }
            out.push(entry.change().marker());
            out.push('\n');
            out.push_str(&format!("{}.{}\n", component.name(), entry.name()));
            out.push_str(entry.old_value().unwrap_or(""));
            out.push('\n');
            out.push_str(entry.new_value().unwrap_or(""));
            out.push('\n');
        }
    }
    out.push_str(&format!("signature: {}\n", signature));
    out
}

/// Write the hold file atomically.
///
/// The temp file lives in the destination directory so the final rename
/// never crosses a filesystem boundary.
pub fn write_holdfile(
    diff: &DiffProfile,
    path: &Path,
    signature: &str,
) -> Result<(), HoldFileError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(format_holdfile(diff, signature).as_bytes())?;
    temp.flush()?;

    match temp.persist(path) {
        Ok(_) => {
            debug!(path = %path.display(), components = diff.len(), "hold file written");
            Ok(())
        }
        Err(e) => {
            // NamedTempFile unlinks itself when the persist handle drops
            warn!(path = %path.display(), error = %e, "hold file publish failed");
            Err(e.into())
        }
    }
}
