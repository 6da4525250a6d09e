//! Shared types, error model, and configuration for opds-export.
//!
//! This crate is the foundation depended on by the other opds-export crates.
//! It provides:
//! - [`OpdsExportError`], the unified error type
//! - Catalog document types ([`Index`], [`GradeCatalog`], [`LessonManifest`])
//! - Configuration ([`AppConfig`], [`ExportConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, CatalogSection, ExportConfig, ExportSection, init_config,
    load_config, load_config_from,
};
pub use error::{OpdsExportError, Result};
pub use types::{
    ARCHIVE_MEDIA_TYPE, CatalogMetadata, GAME_SCHEMA_TYPE, GradeCatalog, ImageDescriptor, Index,
    LessonManifest, Link, NavigationEntry, PublicationMetadata, PublicationSummary, Resource,
};
