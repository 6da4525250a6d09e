//! Output directory layout and JSON writing.
//!
//! ```text
//! <root>/
//! ├── index.json
//! ├── grades/{sheet_key}.json
//! ├── lessons/{lesson_id}.json
//! └── images/            (created, not written to)
//! ```
//!
//! Files are pure ASCII: every non-ASCII character is written as a `\uXXXX`
//! escape, with surrogate pairs above U+FFFF.

use std::path::{Path, PathBuf};

use tracing::debug;

use opds_export_shared::{OpdsExportError, Result};

/// Paths inside the output tree.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grades_dir(&self) -> PathBuf {
        self.root.join("grades")
    }

    pub fn lessons_dir(&self) -> PathBuf {
        self.root.join("lessons")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    pub fn grade_path(&self, key: &str) -> PathBuf {
        self.grades_dir().join(format!("{key}.json"))
    }

    pub fn lesson_path(&self, lesson_id: &str) -> PathBuf {
        self.lessons_dir().join(format!("{lesson_id}.json"))
    }

    /// Create the root and its `grades/`, `lessons/` and `images/` directories.
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [self.grades_dir(), self.lessons_dir(), self.images_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| OpdsExportError::io(&dir, e))?;
        }
        debug!(path = %self.root.display(), "directory structure created");
        Ok(())
    }
}

/// Write a JSON file (pretty-printed, two-space indent), replacing any existing file.
pub fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = escape_non_ascii(&serde_json::to_string_pretty(data)?);
    std::fs::write(path, json).map_err(|e| OpdsExportError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

/// Replace non-ASCII characters with `\uXXXX` escapes.
///
/// serde_json only emits non-ASCII inside string literals, where an escape
/// decodes to the same character.
fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }
    let mut out = String::with_capacity(json.len() + json.len() / 2);
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}
