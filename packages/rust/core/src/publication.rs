//! Lesson publications built from sheet rows.
//!
//! Each field is resolved through an ordered [`FieldRule`]: the first listed
//! column with a non-blank value wins, and the caller applies the default or
//! drops the row when nothing resolves.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use opds_export_shared::{
    CatalogMetadata, ExportConfig, GAME_SCHEMA_TYPE, GradeCatalog, ImageDescriptor,
    LessonManifest, Link, PublicationMetadata, PublicationSummary,
};
use opds_export_workbook::{Cell, RowRecord, Sheet, isoformat};

use crate::catalog::sheet_key;

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Where a publication field comes from.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Columns to try, highest priority first.
    pub keys: &'static [&'static str],
    /// Treat the text `nan` (any case) as a missing value.
    pub nan_is_missing: bool,
}

pub const LESSON_ID: FieldRule = FieldRule {
    keys: &["lesson_id"],
    nan_is_missing: true,
};
/// The first key keeps its trailing space. Headers are stored trimmed, so it
/// never matches and `lesson_name` supplies the title.
pub const TITLE: FieldRule = FieldRule {
    keys: &["title ", "lesson_name"],
    nan_is_missing: true,
};
pub const ASSET: FieldRule = FieldRule {
    keys: &["Asset Link"],
    nan_is_missing: true,
};
pub const LESSON_CODE: FieldRule = FieldRule {
    keys: &["cocos_lesson_code", "id"],
    nan_is_missing: false,
};
pub const AUTHOR: FieldRule = FieldRule {
    keys: &["author"],
    nan_is_missing: false,
};
pub const IDENTIFIER: FieldRule = FieldRule {
    keys: &["identifier_url"],
    nan_is_missing: false,
};
pub const LANGUAGE: FieldRule = FieldRule {
    keys: &["language_id"],
    nan_is_missing: false,
};
pub const MODIFIED: FieldRule = FieldRule {
    keys: &["modified"],
    nan_is_missing: false,
};

/// Icon name used when a row has neither a lesson code nor an id.
pub const DEFAULT_LESSON_CODE: &str = "default";

impl FieldRule {
    /// The first non-blank cell among `keys`.
    pub fn resolve<'r>(&self, record: &'r RowRecord) -> Option<&'r Cell> {
        let cell = self
            .keys
            .iter()
            .filter_map(|key| record.get(key))
            .find(|cell| !cell.is_blank())?;
        if self.nan_is_missing && cell.as_text().eq_ignore_ascii_case("nan") {
            return None;
        }
        Some(cell)
    }

    /// The resolved value as text.
    pub fn text(&self, record: &RowRecord) -> Option<String> {
        self.resolve(record).map(Cell::as_text)
    }
}

// ---------------------------------------------------------------------------
// Lessons
// ---------------------------------------------------------------------------

/// Why a row produced no lesson.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowSkip {
    #[error("missing lesson_id")]
    MissingLessonId,
    #[error("lesson_id '{0}' is not a valid file name")]
    InvalidLessonId(String),
    #[error("missing asset link")]
    MissingAsset,
}

/// A row that was dropped, by 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: RowSkip,
}

/// A valid row turned into its catalog entry and manifest.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub lesson_id: String,
    pub summary: PublicationSummary,
    pub manifest: LessonManifest,
}

/// Build the publication for one row.
///
/// `run_time` stands in for `modified` when the row has no usable date.
pub fn build_lesson(
    record: &RowRecord,
    config: &ExportConfig,
    run_time: &NaiveDateTime,
) -> Result<Lesson, RowSkip> {
    let lesson_id = LESSON_ID.text(record).ok_or(RowSkip::MissingLessonId)?;
    if !is_plain_file_name(&lesson_id) {
        return Err(RowSkip::InvalidLessonId(lesson_id));
    }

    let title = TITLE.text(record).unwrap_or_else(|| {
        let title = format!("Lesson {lesson_id}");
        info!(row = record.number(), %title, "using default title");
        title
    });

    let asset = ASSET.text(record).ok_or(RowSkip::MissingAsset)?;

    let code = LESSON_CODE
        .text(record)
        .unwrap_or_else(|| DEFAULT_LESSON_CODE.to_string());

    let modified = MODIFIED
        .resolve(record)
        .and_then(Cell::as_datetime)
        .unwrap_or(*run_time);

    let metadata = PublicationMetadata {
        schema_type: GAME_SCHEMA_TYPE.into(),
        title,
        author: AUTHOR
            .text(record)
            .unwrap_or_else(|| config.default_author.clone()),
        identifier: IDENTIFIER
            .text(record)
            .unwrap_or_else(|| config.resolve(&format!("id/{lesson_id}"))),
        language: LANGUAGE
            .text(record)
            .unwrap_or_else(|| config.default_language.clone()),
        modified: isoformat(&modified),
    };

    let summary = PublicationSummary {
        metadata,
        links: vec![Link::self_link(
            config.resolve(&format!("{lesson_id}.json")),
            config.publication_type.clone(),
        )],
        images: vec![ImageDescriptor::lesson_icon(
            config.resolve(&format!("images/icons/{code}.jpg")),
        )],
    };
    let manifest = LessonManifest::from_summary(&summary, asset);

    Ok(Lesson {
        lesson_id,
        summary,
        manifest,
    })
}

/// Lesson ids become file names under `lessons/`; reject anything that
/// would leave that directory.
fn is_plain_file_name(id: &str) -> bool {
    !(id.contains('/') || id.contains('\\') || id == "." || id == "..")
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

/// Everything produced from one sheet.
#[derive(Debug, Clone)]
pub struct GradeBuild {
    /// Filename stem, see [`sheet_key`].
    pub key: String,
    /// Data rows seen.
    pub rows: usize,
    pub catalog: GradeCatalog,
    /// Valid lessons in row order.
    pub lessons: Vec<Lesson>,
    pub skipped: Vec<SkippedRow>,
}

/// Build the grade catalog and lesson manifests for one sheet.
pub fn build_grade(sheet: &Sheet, config: &ExportConfig, run_time: &NaiveDateTime) -> GradeBuild {
    let key = sheet_key(sheet.name());
    let mut lessons = Vec::new();
    let mut skipped = Vec::new();
    let mut rows = 0;

    for record in sheet.records() {
        rows += 1;
        match build_lesson(&record, config, run_time) {
            Ok(lesson) => {
                debug!(lesson_id = %lesson.lesson_id, title = %lesson.summary.metadata.title, "built lesson");
                lessons.push(lesson);
            }
            Err(reason) => {
                warn!(sheet = sheet.name(), row = record.number(), %reason, "skipping row");
                skipped.push(SkippedRow {
                    row: record.number(),
                    reason,
                });
            }
        }
    }

    let catalog = GradeCatalog {
        metadata: CatalogMetadata {
            title: sheet.name().to_string(),
        },
        links: vec![Link::self_link(
            config.resolve(&format!("{key}.json")),
            config.catalog_type.clone(),
        )],
        publications: lessons.iter().map(|l| l.summary.clone()).collect(),
    };

    GradeBuild {
        key,
        rows,
        catalog,
        lessons,
        skipped,
    }
}
