//! The slow-test sensor.
//!
//! One run reads the performance report, keeps the tests slower than the
//! threshold, resolves each to a source file, finds the line declaring the
//! test and saves one issue per test:
//!
//! ```text
//! report.json ──► TestResult list ──► threshold filter ──► FileAssociation
//!                                                               │
//!                                     IssueSink ◄── locate_line ◄┘
//! ```
//!
//! Report and configuration failures abort the run before anything is
//! saved. Everything after parsing degrades per test: an unmatched class is
//! dropped and an unmatched or unreadable line falls back to line 1.

use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::aggregator::FileAssociation;
use crate::config::{Configuration, DEFAULT_THRESHOLD_MS, REPORT_PATH_KEY, THRESHOLD_MS_KEY};
use crate::errors::SensorError;
use crate::fs::{FileSystem, InputFile, Language};
use crate::issues::{DEFAULT_GAP, Issue, IssueSink};
use crate::report::{filter_by_threshold, load_report};
use crate::rules::{REPOSITORY, RuleKey, SensorDescriptor, TEST_PERFORMANCE_RULE};

/// Anchor used when the test name is not found in its file.
pub const FALLBACK_LINE: u32 = 1;

/// Host collaborators for one run.
pub struct SensorContext<'a> {
    pub config: &'a dyn Configuration,
    pub fs: &'a dyn FileSystem,
    pub sink: &'a mut dyn IssueSink,
}

/// Counts from one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Results parsed from the report
    pub total: usize,
    /// Results above the threshold
    pub slow: usize,
    /// Slow results with no matching source file
    pub unresolved: usize,
    /// Distinct files with at least one slow test
    pub files: usize,
    /// Issues saved
    pub issues: usize,
}

/// Raises one issue per test slower than the configured threshold.
#[derive(Debug, Clone)]
pub struct TestPerformanceSensor {
    language: Language,
    rule: RuleKey,
    gap: f64,
}

impl Default for TestPerformanceSensor {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl TestPerformanceSensor {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            rule: TEST_PERFORMANCE_RULE,
            gap: DEFAULT_GAP,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn describe(&self) -> SensorDescriptor {
        SensorDescriptor {
            name: "Check performance time of individual tests",
            only_on_language: self.language,
            rule_repositories: vec![REPOSITORY],
        }
    }

    /// Run the sensor, logging instead of returning failures.
    ///
    /// An aborted run saves no issues and returns an empty summary.
    pub fn execute(&self, ctx: &mut SensorContext<'_>) -> RunSummary {
        match self.try_execute(ctx) {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Test performance analysis aborted");
                RunSummary::default()
            }
        }
    }

    /// Run the sensor, returning the reason for an aborted run.
    pub fn try_execute(&self, ctx: &mut SensorContext<'_>) -> Result<RunSummary, SensorError> {
        let report_path = ctx
            .config
            .get(REPORT_PATH_KEY)
            .map(PathBuf::from)
            .ok_or_else(|| SensorError::ConfigMissing {
                key: REPORT_PATH_KEY.to_string(),
            })?;

        let results = load_report(&report_path)?;
        let total = results.len();

        let threshold_ms = threshold_ms(ctx.config);
        let slow = filter_by_threshold(results, threshold_ms);
        let slow_count = slow.len();
        debug!(total, slow = slow_count, threshold_ms, "Filtered test results");

        let files = ctx.fs.input_files(self.language);
        let mut association = FileAssociation::new();
        for result in slow {
            association.associate(&files, result);
        }
        let unresolved = association.unresolved();

        let groups = association.into_groups();
        let mut issues = 0;
        for group in &groups {
            let file = group.file();
            debug!(
                file = file.relative_path(),
                tests = group.results().len(),
                "Reporting slow tests"
            );
            for result in group.results() {
                let line = locate_line(&**file, result.name());
                let message = format!("Test execution took {} ms", result.duration_ms());
                ctx.sink.save(
                    Issue::new(self.rule, file.relative_path(), line, message).with_gap(self.gap),
                );
                issues += 1;
            }
        }

        let summary = RunSummary {
            total,
            slow: slow_count,
            unresolved,
            files: groups.len(),
            issues,
        };
        info!(
            total = summary.total,
            slow = summary.slow,
            issues = summary.issues,
            threshold_ms,
            "Test performance analysis complete"
        );
        Ok(summary)
    }
}

/// Configured threshold, or [`DEFAULT_THRESHOLD_MS`] if absent or unparseable.
pub fn threshold_ms(config: &dyn Configuration) -> i64 {
    match config.get_int(THRESHOLD_MS_KEY) {
        Some(threshold) => threshold,
        None => {
            if let Some(raw) = config.get(THRESHOLD_MS_KEY) {
                warn!(
                    value = raw,
                    default = DEFAULT_THRESHOLD_MS,
                    "Ignoring unparseable {}",
                    THRESHOLD_MS_KEY
                );
            }
            DEFAULT_THRESHOLD_MS
        }
    }
}

/// 1-based number of the first line containing `needle`.
///
/// Falls back to [`FALLBACK_LINE`] when no line matches or the file can't be
/// read.
pub fn locate_line(file: &dyn InputFile, needle: &str) -> u32 {
    let mut reader = match file.open() {
        Ok(reader) => reader,
        Err(e) => {
            debug!(file = file.relative_path(), error = %e, "Failed to open file, using line 1");
            return FALLBACK_LINE;
        }
    };

    // Invalid UTF-8 is replaced, not treated as a read failure.
    let mut buf = Vec::new();
    let mut line: u32 = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return FALLBACK_LINE,
            Ok(_) => {
                line = line.saturating_add(1);
                if String::from_utf8_lossy(&buf).contains(needle) {
                    return line;
                }
            }
            Err(e) => {
                debug!(file = file.relative_path(), error = %e, "Failed to read file, using line 1");
                return FALLBACK_LINE;
            }
        }
    }
}
