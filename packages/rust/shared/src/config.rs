//! Export configuration.
//!
//! Settings live in an optional `opds-export.toml` next to where the tool runs.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OpdsExportError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "opds-export.toml";

// ---------------------------------------------------------------------------
// Config structs (matching opds-export.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input workbook and output tree.
    #[serde(default)]
    pub export: ExportSection,

    /// Link resolution, media types and metadata defaults.
    #[serde(default)]
    pub catalog: CatalogSection,
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    /// Spreadsheet to read.
    #[serde(default = "default_input")]
    pub input: String,

    /// Root of the generated catalog tree.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Sheets that never become grades.
    #[serde(default = "default_skip_sheets")]
    pub skip_sheets: Vec<String>,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
            skip_sheets: default_skip_sheets(),
        }
    }
}

fn default_input() -> String {
    "Respect Course Latest All Course Details From dashboard.xlsx".into()
}
fn default_output_dir() -> String {
    "output_opds_combined".into()
}
fn default_skip_sheets() -> Vec<String> {
    vec!["All Courses".into(), "Sheet4".into(), "Sheet5".into()]
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Base URL every self link, image and identifier is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Title of the top-level index.
    #[serde(default = "default_title")]
    pub title: String,

    /// Media type of the index and grade catalogs.
    #[serde(default = "default_catalog_type")]
    pub catalog_type: String,

    /// Media type of lesson publications.
    #[serde(default = "default_publication_type")]
    pub publication_type: String,

    /// Author used when a row has none.
    #[serde(default = "default_author")]
    pub default_author: String,

    /// Language used when a row has none.
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            title: default_title(),
            catalog_type: default_catalog_type(),
            publication_type: default_publication_type(),
            default_author: default_author(),
            default_language: default_language(),
        }
    }
}

fn default_base_url() -> String {
    "http://chimple.cc/opds/".into()
}
fn default_title() -> String {
    "Chimple Learning".into()
}
fn default_catalog_type() -> String {
    "application/opds+json".into()
}
fn default_publication_type() -> String {
    "application/opds-publication+json".into()
}
fn default_author() -> String {
    "Chimple".into()
}
fn default_language() -> String {
    "en".into()
}

// ---------------------------------------------------------------------------
// Export config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Immutable runtime configuration handed to the catalog and publication builders.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Spreadsheet to read.
    pub input: PathBuf,
    /// Root of the generated catalog tree.
    pub output_dir: PathBuf,
    /// Validated base URL, always ending in `/`.
    pub base_url: Url,
    /// Sheets excluded from the index and from processing.
    pub skip_sheets: BTreeSet<String>,
    /// Title of the top-level index.
    pub catalog_title: String,
    /// Media type of the index and grade catalogs.
    pub catalog_type: String,
    /// Media type of lesson publications.
    pub publication_type: String,
    /// Author used when a row has none.
    pub default_author: String,
    /// Language used when a row has none.
    pub default_language: String,
}

impl ExportConfig {
    /// Whether `sheet` is in the skip-set.
    pub fn is_skipped(&self, sheet: &str) -> bool {
        self.skip_sheets.contains(sheet)
    }

    /// Append a relative path to the base URL.
    ///
    /// The path is copied as is: spaces and non-ASCII text are not
    /// percent-encoded.
    pub fn resolve(&self, relative: &str) -> String {
        format!("{}{relative}", self.base_url.as_str())
    }
}

impl TryFrom<&AppConfig> for ExportConfig {
    type Error = OpdsExportError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let raw = config.catalog.base_url.trim();
        if !raw.ends_with('/') {
            return Err(OpdsExportError::config(format!(
                "base_url '{raw}' must end with '/' so relative links stay under it"
            )));
        }
        let base_url = Url::parse(raw)
            .map_err(|e| OpdsExportError::config(format!("invalid base_url '{raw}': {e}")))?;

        Ok(Self {
            input: PathBuf::from(&config.export.input),
            output_dir: PathBuf::from(&config.export.output_dir),
            base_url,
            skip_sheets: config.export.skip_sheets.iter().cloned().collect(),
            catalog_title: config.catalog.title.clone(),
            catalog_type: config.catalog.catalog_type.clone(),
            publication_type: config.catalog.publication_type.clone(),
            default_author: config.catalog.default_author.clone(),
            default_language: config.catalog.default_language.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the application config.
///
/// With an explicit path the file must exist. Without one, `./opds-export.toml`
/// is used when present and defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config_from(path);
    }

    let path = Path::new(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OpdsExportError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        OpdsExportError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file to `path`. Refuses to overwrite an existing file.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(OpdsExportError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| OpdsExportError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| OpdsExportError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}
