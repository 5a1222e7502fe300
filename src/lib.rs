//! Surface slow unit tests as line-level code-quality issues.
//!
//! Cross-references a JSON test performance report with the project's
//! source files and raises one issue per test slower than a threshold, at
//! the line declaring the test.
//!
//! ```
//! use testperf::config::PropertyStore;
//! use testperf::fs::MemoryFileSystem;
//! use testperf::issues::IssueCollector;
//! use testperf::sensor::{SensorContext, TestPerformanceSensor};
//!
//! let config = PropertyStore::new();
//! let fs = MemoryFileSystem::new().with_file("FooTest.kt", "fun testA() {}");
//! let mut sink = IssueCollector::new();
//!
//! // No report configured: the run aborts quietly.
//! let summary = TestPerformanceSensor::default().execute(&mut SensorContext {
//!     config: &config,
//!     fs: &fs,
//!     sink: &mut sink,
//! });
//! assert_eq!(summary.issues, 0);
//! assert!(sink.is_empty());
//! ```

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fs;
pub mod issues;
pub mod report;
pub mod rules;
pub mod sensor;
