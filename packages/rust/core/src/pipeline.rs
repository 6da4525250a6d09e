//! End-to-end export: workbook → index → grade catalogs → lesson manifests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, instrument};

use opds_export_shared::{ExportConfig, Result};
use opds_export_workbook::Workbook;

use crate::catalog::{build_index, navigation};
use crate::output::{OutputLayout, write_json};
use crate::publication::{SkippedRow, build_grade};

/// Outcome of one sheet.
#[derive(Debug, Clone)]
pub struct GradeReport {
    /// Original sheet name.
    pub sheet: String,
    /// Filename stem of the grade catalog.
    pub key: String,
    /// Data rows read.
    pub rows: usize,
    /// Lesson manifests written.
    pub lessons: usize,
    /// Rows dropped and why.
    pub skipped: Vec<SkippedRow>,
}

/// Result of a full export.
#[derive(Debug)]
pub struct ExportReport {
    /// Root of the written tree.
    pub output_dir: PathBuf,
    /// Path of the written `index.json`.
    pub index_path: PathBuf,
    /// One entry per processed sheet, in sheet order.
    pub grades: Vec<GradeReport>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl ExportReport {
    pub fn lesson_count(&self) -> usize {
        self.grades.iter().map(|g| g.lessons).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.grades.iter().map(|g| g.skipped.len()).sum()
    }
}

/// Progress callback for reporting export status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a sheet is processed (`current` is 1-based).
    fn sheet_started(&self, sheet: &str, current: usize, total: usize);
    /// Called after a lesson manifest is written.
    fn lesson_written(&self, lesson_id: &str);
    /// Called when the export completes.
    fn done(&self, report: &ExportReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn sheet_started(&self, _sheet: &str, _current: usize, _total: usize) {}
    fn lesson_written(&self, _lesson_id: &str) {}
    fn done(&self, _report: &ExportReport) {}
}

/// Open the configured workbook and export it.
///
/// Rows without a `modified` date are stamped with the current local time.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub fn export(config: &ExportConfig, progress: &dyn ProgressReporter) -> Result<ExportReport> {
    progress.phase("Loading workbook");
    let mut workbook = Workbook::open(&config.input)?;
    export_workbook(&mut workbook, config, Local::now().naive_local(), progress)
}

/// Export an opened workbook.
///
/// 1. Create the output tree
/// 2. Write `index.json`
/// 3. Per non-skipped sheet: load it, write each lesson manifest, then the grade catalog
///
/// Skipped sheets are never loaded.
#[instrument(skip_all, fields(output = %config.output_dir.display()))]
pub fn export_workbook(
    workbook: &mut Workbook,
    config: &ExportConfig,
    run_time: NaiveDateTime,
    progress: &dyn ProgressReporter,
) -> Result<ExportReport> {
    let start = Instant::now();
    let layout = OutputLayout::new(&config.output_dir);

    progress.phase("Preparing output directory");
    layout.create_dirs()?;

    // --- Index ---
    progress.phase("Writing index");
    let names: Vec<String> = workbook.sheet_names().iter().map(|s| s.to_string()).collect();
    let nav = navigation(names.iter().map(String::as_str), config);
    let grade_total = nav.len();
    let index = build_index(nav, config);
    let index_path = layout.index_path();
    write_json(&index_path, &index)?;
    info!(grades = grade_total, "generated index.json");

    // --- Grades ---
    let mut grades = Vec::with_capacity(grade_total);
    let mut seen_ids = HashSet::new();

    for name in names.iter().filter(|n| !config.is_skipped(n)) {
        progress.sheet_started(name, grades.len() + 1, grade_total);
        let sheet = workbook.load_sheet(name)?;
        info!(sheet = %name, columns = ?sheet.headers(), "processing sheet");

        let grade = build_grade(&sheet, config, &run_time);

        for lesson in &grade.lessons {
            if !seen_ids.insert(lesson.lesson_id.clone()) {
                debug!(lesson_id = %lesson.lesson_id, "duplicate lesson_id, overwriting earlier manifest");
            }
            write_json(&layout.lesson_path(&lesson.lesson_id), &lesson.manifest)?;
            progress.lesson_written(&lesson.lesson_id);
        }

        write_json(&layout.grade_path(&grade.key), &grade.catalog)?;
        info!(
            file = %format!("{}.json", grade.key),
            lessons = grade.lessons.len(),
            skipped = grade.skipped.len(),
            "generated grade catalog"
        );

        grades.push(GradeReport {
            sheet: name.clone(),
            key: grade.key,
            rows: grade.rows,
            lessons: grade.lessons.len(),
            skipped: grade.skipped,
        });
    }

    let report = ExportReport {
        output_dir: layout.root().to_path_buf(),
        index_path,
        grades,
        elapsed: start.elapsed(),
    };

    info!(
        grades = report.grades.len(),
        lessons = report.lesson_count(),
        skipped = report.skipped_count(),
        "export complete"
    );
    progress.done(&report);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use opds_export_shared::{AppConfig, GradeCatalog, Index, LessonManifest, OpdsExportError};
    use opds_export_workbook::{Cell, Sheet, SheetSource};

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("opds-pipeline-test-{}", uuid::Uuid::now_v7()))
    }

    fn make_config(output_dir: &std::path::Path) -> ExportConfig {
        let mut app = AppConfig::default();
        app.export.output_dir = output_dir.to_string_lossy().into_owned();
        ExportConfig::try_from(&app).unwrap()
    }

    fn run_time(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    fn headers() -> Vec<String> {
        ["lesson_id", "lesson_name", "Asset Link", "cocos_lesson_code", "modified"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn make_workbook() -> Workbook {
        Workbook::from_sheets(vec![
            Sheet::new("All Courses", headers(), vec![row(&["X1", "", "http://x/x.zip", "", ""])]),
            Sheet::new(
                "Grade 1",
                headers(),
                vec![
                    row(&["L1", "", "http://x/a.zip", "en0001", "2024-03-01T09:30:00"]),
                    row(&["", "No id", "http://x/b.zip", "", ""]),
                    row(&["L3", "No asset", "nan", "", ""]),
                    row(&["L4", "Shapes", "http://x/d.zip", "en0004", "2024-03-02T10:00:00"]),
                ],
            ),
            Sheet::new(
                "Grade 2",
                headers(),
                vec![row(&["L5", "Words", "http://x/e.zip", "", ""])],
            ),
        ])
    }

    fn read<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> T {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn export_writes_index_grades_and_lessons() {
        let tmp = temp_dir();
        let config = make_config(&tmp);

        let report = export_workbook(&mut make_workbook(), &config, run_time(12), &SilentProgress).unwrap();

        let index: Index = read(&tmp.join("index.json"));
        let hrefs: Vec<_> = index.navigation.iter().map(|n| n.href.as_str()).collect();
        assert_eq!(hrefs, ["grade1.json", "grade2.json"]);

        let grade1: GradeCatalog = read(&tmp.join("grades/grade1.json"));
        assert_eq!(grade1.publications.len(), 2);
        assert!(tmp.join("grades/grade2.json").exists());
        assert!(!tmp.join("grades/allcourses.json").exists());

        for id in ["L1", "L4", "L5"] {
            assert!(tmp.join(format!("lessons/{id}.json")).exists(), "missing {id}");
        }
        assert!(!tmp.join("lessons/L3.json").exists());
        assert!(!tmp.join("lessons/X1.json").exists());
        assert!(tmp.join("images").is_dir());

        assert_eq!(report.grades.len(), 2);
        assert_eq!(report.lesson_count(), 3);
        assert_eq!(report.skipped_count(), 2);
        assert_eq!(report.grades[0].rows, 4);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manifest_matches_grade_summary() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        export_workbook(&mut make_workbook(), &config, run_time(12), &SilentProgress).unwrap();

        let grade1: GradeCatalog = read(&tmp.join("grades/grade1.json"));
        let l1: LessonManifest = read(&tmp.join("lessons/L1.json"));

        assert_eq!(l1.metadata, grade1.publications[0].metadata);
        assert_eq!(l1.images, grade1.publications[0].images);
        assert_eq!(l1.metadata.title, "Lesson L1");
        assert_eq!(l1.resources[0].href, "http://x/a.zip");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_modified_is_byte_identical_across_runs() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let mut wb = make_workbook();

        export_workbook(&mut wb, &config, run_time(12), &SilentProgress).unwrap();
        let first = std::fs::read(tmp.join("lessons/L1.json")).unwrap();
        let first_index = std::fs::read(tmp.join("index.json")).unwrap();

        export_workbook(&mut wb, &config, run_time(13), &SilentProgress).unwrap();
        assert_eq!(std::fs::read(tmp.join("lessons/L1.json")).unwrap(), first);
        assert_eq!(std::fs::read(tmp.join("index.json")).unwrap(), first_index);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_modified_differs_only_in_modified() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let mut wb = make_workbook();

        export_workbook(&mut wb, &config, run_time(12), &SilentProgress).unwrap();
        let first: serde_json::Value = read(&tmp.join("lessons/L5.json"));

        export_workbook(&mut wb, &config, run_time(13), &SilentProgress).unwrap();
        let mut second: serde_json::Value = read(&tmp.join("lessons/L5.json"));

        assert_ne!(first["metadata"]["modified"], second["metadata"]["modified"]);
        second["metadata"]["modified"] = first["metadata"]["modified"].clone();
        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn duplicate_lesson_id_last_write_wins() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let mut wb = Workbook::from_sheets(vec![
            Sheet::new("Grade 1", headers(), vec![row(&["D1", "First", "http://x/1.zip", "", ""])]),
            Sheet::new("Grade 2", headers(), vec![row(&["D1", "Second", "http://x/2.zip", "", ""])]),
        ]);

        let report = export_workbook(&mut wb, &config, run_time(12), &SilentProgress).unwrap();
        let manifest: LessonManifest = read(&tmp.join("lessons/D1.json"));
        assert_eq!(manifest.metadata.title, "Second");
        assert_eq!(report.lesson_count(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    /// A source whose "All Courses" sheet cannot be read.
    struct BrokenSummarySource(Vec<Sheet>);

    impl SheetSource for BrokenSummarySource {
        fn sheet_names(&self) -> Vec<String> {
            vec!["All Courses".into(), "Grade 1".into()]
        }

        fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
            if name == "All Courses" {
                return Err(OpdsExportError::workbook(
                    "courses.xlsx",
                    "corrupt sheet",
                ));
            }
            self.0.read_sheet(name)
        }
    }

    #[test]
    fn skipped_sheet_is_never_loaded() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let mut wb = Workbook::from_source(BrokenSummarySource(vec![Sheet::new(
            "Grade 1",
            headers(),
            vec![row(&["L1", "Counting", "http://x/a.zip", "", ""])],
        )]));

        let report = export_workbook(&mut wb, &config, run_time(12), &SilentProgress).unwrap();
        assert_eq!(report.grades.len(), 1);
        assert_eq!(report.grades[0].sheet, "Grade 1");
        assert!(tmp.join("lessons/L1.json").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unreadable_grade_sheet_is_fatal() {
        let tmp = temp_dir();
        let mut app = AppConfig::default();
        app.export.output_dir = tmp.to_string_lossy().into_owned();
        app.export.skip_sheets.clear();
        let config = ExportConfig::try_from(&app).unwrap();
        let mut wb = Workbook::from_source(BrokenSummarySource(vec![]));

        let err = export_workbook(&mut wb, &config, run_time(12), &SilentProgress).unwrap_err();
        assert!(matches!(err, OpdsExportError::Workbook { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
