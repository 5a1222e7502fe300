//! Typed errors for a sensor run.
//!
//! Every variant is terminal for the current run but never for the host:
//! [`crate::sensor::TestPerformanceSensor::execute`] logs the error and
//! reports nothing. Unmatched files and missing lines are not errors at all.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a sensor run aborts before any issue is emitted.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("{key} is not present")]
    ConfigMissing { key: String },

    #[error("Failed to read test performance report at {path}: {source}")]
    ReportUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse test performance report at {path}: {source}")]
    ReportMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test performance results are empty in {path}")]
    ReportEmpty { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_missing_names_the_key() {
        let err = SensorError::ConfigMissing {
            key: "sonar.testperformance.report".to_string(),
        };
        assert_eq!(err.to_string(), "sonar.testperformance.report is not present");
    }

    #[test]
    fn report_unreadable_carries_path_and_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = SensorError::ReportUnreadable {
            path: PathBuf::from("/reports/perf.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/reports/perf.json"));
        assert!(msg.contains("no such file"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn report_malformed_wraps_json_error() {
        let json_err = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err();
        let err = SensorError::ReportMalformed {
            path: PathBuf::from("perf.json"),
            source: json_err,
        };
        match &err {
            SensorError::ReportMalformed { source, .. } => assert!(source.is_eof()),
            _ => panic!("Expected ReportMalformed variant"),
        }
    }

    #[test]
    fn report_empty_display() {
        let err = SensorError::ReportEmpty {
            path: PathBuf::from("perf.json"),
        };
        assert_eq!(
            err.to_string(),
            "Test performance results are empty in perf.json"
        );
    }
}
