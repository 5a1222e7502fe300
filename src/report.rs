//! Test performance report model.
//!
//! A report is a JSON array with one object per executed test:
//!
//! ```json
//! [{"class_name":"UserServiceTest","name":"testLogin","package_name":"com.example","duration_ms":1500,"status":"passed"}]
//! ```
//!
//! `class_name` is matched against source file names and `name` against
//! source lines, so both are required. `package_name` and `status` are
//! informational and default to empty when absent.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::SensorError;

/// One recorded test execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    class_name: String,
    name: String,
    #[serde(default)]
    package_name: String,
    duration_ms: u64,
    #[serde(default)]
    status: String,
}

impl TestResult {
    pub fn new(class_name: impl Into<String>, name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            package_name: String::new(),
            duration_ms,
            status: String::new(),
        }
    }

    pub fn with_package(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Qualified or partial class name, used for file matching.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Test method name, used for line matching.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether this execution took strictly longer than `threshold_ms`.
    ///
    /// A negative threshold flags every test.
    pub fn exceeds(&self, threshold_ms: i64) -> bool {
        i64::try_from(self.duration_ms).map_or(true, |duration| duration > threshold_ms)
    }
}

/// Parse report text into an ordered list of results.
///
/// `null` and `[]` both parse to an empty list; the caller decides whether
/// that is fatal.
pub fn parse_report(content: &str) -> Result<Vec<TestResult>, serde_json::Error> {
    let results: Option<Vec<TestResult>> = serde_json::from_str(content)?;
    Ok(results.unwrap_or_default())
}

/// Read and parse the report at `path`, rejecting empty reports.
pub fn load_report(path: &Path) -> Result<Vec<TestResult>, SensorError> {
    let content = std::fs::read_to_string(path).map_err(|source| SensorError::ReportUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let results = parse_report(&content).map_err(|source| SensorError::ReportMalformed {
        path: path.to_path_buf(),
        source,
    })?;

    if results.is_empty() {
        return Err(SensorError::ReportEmpty {
            path: path.to_path_buf(),
        });
    }

    Ok(results)
}

/// Keep the results slower than `threshold_ms`, preserving report order.
pub fn filter_by_threshold(results: Vec<TestResult>, threshold_ms: i64) -> Vec<TestResult> {
    results
        .into_iter()
        .filter(|result| result.exceeds(threshold_ms))
        .collect()
}
