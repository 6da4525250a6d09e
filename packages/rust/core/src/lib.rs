//! Catalog export for opds-export.
//!
//! Turns a loaded [`Workbook`](opds_export_workbook::Workbook) into the index,
//! grade catalogs and lesson manifests, and writes them to the output tree.

pub mod catalog;
pub mod output;
pub mod pipeline;
pub mod publication;
