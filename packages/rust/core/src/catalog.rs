//! Index navigation built from sheet names.

use opds_export_shared::{CatalogMetadata, ExportConfig, Index, Link, NavigationEntry};

/// Filename stem of a grade: spaces removed, lowercased.
pub fn sheet_key(sheet_name: &str) -> String {
    sheet_name.replace(' ', "").to_lowercase()
}

/// One navigation entry per non-skipped sheet, in source order.
pub fn navigation<'a>(
    sheet_names: impl IntoIterator<Item = &'a str>,
    config: &ExportConfig,
) -> Vec<NavigationEntry> {
    sheet_names
        .into_iter()
        .filter(|name| !config.is_skipped(name))
        .map(|name| NavigationEntry {
            href: format!("{}.json", sheet_key(name)),
            title: name.to_string(),
            media_type: config.catalog_type.clone(),
        })
        .collect()
}

/// The top-level `index.json` document.
pub fn build_index(navigation: Vec<NavigationEntry>, config: &ExportConfig) -> Index {
    Index {
        metadata: CatalogMetadata {
            title: config.catalog_title.clone(),
        },
        links: vec![Link::self_link(
            config.resolve("index.json"),
            config.catalog_type.clone(),
        )],
        navigation,
    }
}
