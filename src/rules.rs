//! Rule metadata and sensor registration.
//!
//! A host learns what this analyzer provides from two declarative objects:
//! the [`RuleRepository`] (issue types it may raise) and the
//! [`SensorDescriptor`] (when the sensor should run). Both are plain values
//! handed to the host at startup.
//!
//! ```
//! use testperf::fs::Language;
//! use testperf::rules::{RuleRepository, TEST_PERFORMANCE_RULE};
//!
//! let repository = RuleRepository::test_performance(Language::Kotlin);
//! let rule = repository.rule(TEST_PERFORMANCE_RULE.rule()).unwrap();
//! assert_eq!(rule.name, "Test Performance Rule");
//! assert_eq!(TEST_PERFORMANCE_RULE.to_string(), "testperformance:testPerformance");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fs::Language;

/// Key of the rule repository this analyzer registers.
pub const REPOSITORY: &str = "testperformance";

/// The single rule raised for slow tests.
pub const TEST_PERFORMANCE_RULE: RuleKey = RuleKey::of(REPOSITORY, "testPerformance");

/// Fully qualified rule identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleKey {
    repository: &'static str,
    rule: &'static str,
}

impl RuleKey {
    pub const fn of(repository: &'static str, rule: &'static str) -> Self {
        Self { repository, rule }
    }

    pub fn repository(&self) -> &'static str {
        self.repository
    }

    pub fn rule(&self) -> &'static str {
        self.rule
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

impl Serialize for RuleKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Minor,
    #[default]
    Major,
    Critical,
    Blocker,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
            Self::Critical => "CRITICAL",
            Self::Blocker => "BLOCKER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    Beta,
    #[default]
    Ready,
    Deprecated,
}

/// Technical debt charged for an issue.
///
/// Effort is `offset + gap * coefficient`, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Remediation {
    LinearWithOffset {
        coefficient_minutes: u32,
        offset_minutes: u32,
    },
}

impl Remediation {
    pub fn effort_minutes(&self, gap: f64) -> u64 {
        match *self {
            Self::LinearWithOffset {
                coefficient_minutes,
                offset_minutes,
            } => {
                let effort = f64::from(offset_minutes) + gap.max(0.0) * f64::from(coefficient_minutes);
                effort.round() as u64
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub html_description: &'static str,
    pub tags: Vec<&'static str>,
    pub status: RuleStatus,
    pub severity: Severity,
    pub remediation: Remediation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRepository {
    pub key: &'static str,
    pub language: Language,
    pub name: &'static str,
    pub rules: Vec<RuleDefinition>,
}

impl RuleRepository {
    /// The repository holding the slow-test rule, registered for `language`.
    pub fn test_performance(language: Language) -> Self {
        Self {
            key: REPOSITORY,
            language,
            name: "Test Performance Analyzer",
            rules: vec![RuleDefinition {
                key: TEST_PERFORMANCE_RULE.rule(),
                name: "Test Performance Rule",
                html_description: "Generates an issue for unit test execution above a given threshold",
                tags: vec!["style", "performance"],
                status: RuleStatus::Ready,
                severity: Severity::Major,
                remediation: Remediation::LinearWithOffset {
                    coefficient_minutes: 30,
                    offset_minutes: 0,
                },
            }],
        }
    }

    pub fn rule(&self, key: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|rule| rule.key == key)
    }
}

/// When the host should run the sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDescriptor {
    pub name: &'static str,
    /// Skip the sensor on projects without files of this language.
    pub only_on_language: Language,
    /// Repositories the sensor raises issues for.
    pub rule_repositories: Vec<&'static str>,
}
