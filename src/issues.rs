//! Issues raised by the sensor and the sinks that receive them.
//!
//! ## Types
//!
//! - [`Issue`]: one slow test anchored at a file and line
//! - [`IssueSink`]: where the sensor saves issues
//! - [`IssueCollector`]: an ordered in-memory sink
//! - [`OutputFormat`]: how the CLI renders collected issues
//!
//! ## Example
//!
//! ```
//! use testperf::issues::{Issue, IssueCollector, IssueSink};
//! use testperf::rules::TEST_PERFORMANCE_RULE;
//!
//! let mut sink = IssueCollector::new();
//! sink.save(Issue::new(TEST_PERFORMANCE_RULE, "src/FooTest.kt", 3, "Test execution took 2000 ms"));
//!
//! assert_eq!(sink.issues().len(), 1);
//! assert_eq!(sink.issues()[0].location(), "src/FooTest.kt:3");
//! ```

use anyhow::{Context, Result};
use console::Style;
use serde::Serialize;
use std::fmt;
use std::io::Write;

use crate::rules::{RuleKey, RuleRepository};

/// Remediation gap attached to every slow-test issue.
pub const DEFAULT_GAP: f64 = 2.0;

/// A single issue at a specific line of a source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    rule: RuleKey,
    /// Path relative to the project root.
    file: String,
    /// Line number (1-based).
    line: u32,
    message: String,
    gap: f64,
}

impl Issue {
    pub fn new(rule: RuleKey, file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            rule,
            file: file.into(),
            line,
            message: message.into(),
            gap: DEFAULT_GAP,
        }
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    /// `file:line`
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    pub fn rule(&self) -> RuleKey {
        self.rule
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.location(), self.rule, self.message)
    }
}

/// Receives issues as the sensor produces them.
pub trait IssueSink {
    fn save(&mut self, issue: Issue);
}

/// Keeps issues in the order they were saved.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl IssueSink for IssueCollector {
    fn save(&mut self, issue: Issue) {
        self.issues.push(issue);
    }
}

impl IssueSink for Vec<Issue> {
    fn save(&mut self, issue: Issue) {
        self.push(issue);
    }
}

/// Rendering for collected issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per issue
    #[default]
    Text,
    /// SonarQube generic issue import JSON
    Sonar,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenericIssueReport<'a> {
    issues: Vec<GenericIssue<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenericIssue<'a> {
    engine_id: &'a str,
    rule_id: &'a str,
    severity: String,
    #[serde(rename = "type")]
    issue_type: &'a str,
    primary_location: GenericLocation<'a>,
    effort_minutes: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenericLocation<'a> {
    message: &'a str,
    file_path: &'a str,
    text_range: GenericTextRange,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenericTextRange {
    start_line: u32,
}

/// Render `issues` as a SonarQube generic issue report.
///
/// Severity and effort come from the matching rule in `repository`.
pub fn to_generic_json(issues: &[Issue], repository: &RuleRepository) -> Result<String> {
    let issues = issues
        .iter()
        .map(|issue| {
            let rule = repository.rule(issue.rule.rule());
            GenericIssue {
                engine_id: issue.rule.repository(),
                rule_id: issue.rule.rule(),
                severity: rule.map(|r| r.severity).unwrap_or_default().to_string(),
                issue_type: "CODE_SMELL",
                primary_location: GenericLocation {
                    message: &issue.message,
                    file_path: &issue.file,
                    text_range: GenericTextRange {
                        start_line: issue.line,
                    },
                },
                effort_minutes: rule
                    .map(|r| r.remediation.effort_minutes(issue.gap))
                    .unwrap_or_default(),
            }
        })
        .collect();

    serde_json::to_string_pretty(&GenericIssueReport { issues })
        .context("Failed to serialize generic issue report")
}

/// Write `issues` to `out` in the requested format.
///
/// `colored` only affects [`OutputFormat::Text`]. Pass `false` unless `out`
/// is a terminal.
pub fn write_issues(
    out: &mut dyn Write,
    issues: &[Issue],
    format: OutputFormat,
    repository: &RuleRepository,
    colored: bool,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let location = Style::new().bold().force_styling(colored);
            let rule = Style::new().dim().force_styling(colored);
            for issue in issues {
                writeln!(
                    out,
                    "{} [{}] {}",
                    location.apply_to(issue.location()),
                    rule.apply_to(issue.rule),
                    issue.message
                )?;
            }
        }
        OutputFormat::Sonar => {
            writeln!(out, "{}", to_generic_json(issues, repository)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Language;
    use crate::rules::TEST_PERFORMANCE_RULE;

    fn sample_issue() -> Issue {
        Issue::new(
            TEST_PERFORMANCE_RULE,
            "src/test/kotlin/FooTest.kt",
            3,
            "Test execution took 2000 ms",
        )
    }

    #[test]
    fn test_issue_defaults_to_fixed_gap() {
        assert_eq!(sample_issue().gap(), 2.0);
        assert_eq!(sample_issue().with_gap(4.0).gap(), 4.0);
    }

    #[test]
    fn test_issue_location_and_display() {
        let issue = sample_issue();
        assert_eq!(issue.location(), "src/test/kotlin/FooTest.kt:3");
        assert_eq!(
            issue.to_string(),
            "src/test/kotlin/FooTest.kt:3 [testperformance:testPerformance] Test execution took 2000 ms"
        );
    }

    #[test]
    fn test_collector_preserves_order() {
        let mut sink = IssueCollector::new();
        assert!(sink.is_empty());
        sink.save(Issue::new(TEST_PERFORMANCE_RULE, "A.kt", 1, "first"));
        sink.save(Issue::new(TEST_PERFORMANCE_RULE, "B.kt", 2, "second"));

        let messages: Vec<_> = sink.issues().iter().map(|i| i.message()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(sink.into_issues().len(), 2);
    }

    #[test]
    fn test_vec_is_a_sink() {
        let mut sink: Vec<Issue> = Vec::new();
        sink.save(sample_issue());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_issue_serialization() {
        let json = serde_json::to_string(&sample_issue()).unwrap();
        assert!(json.contains("\"rule\":\"testperformance:testPerformance\""));
        assert!(json.contains("\"line\":3"));
        assert!(json.contains("\"gap\":2.0"));
    }

    #[test]
    fn test_generic_json_shape() {
        let json = to_generic_json(&[sample_issue()], &RuleRepository::test_performance(Language::Kotlin)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let issue = &value["issues"][0];

        assert_eq!(issue["engineId"], "testperformance");
        assert_eq!(issue["ruleId"], "testPerformance");
        assert_eq!(issue["severity"], "MAJOR");
        assert_eq!(issue["type"], "CODE_SMELL");
        assert_eq!(issue["effortMinutes"], 60);
        assert_eq!(issue["primaryLocation"]["filePath"], "src/test/kotlin/FooTest.kt");
        assert_eq!(issue["primaryLocation"]["message"], "Test execution took 2000 ms");
        assert_eq!(issue["primaryLocation"]["textRange"]["startLine"], 3);
    }

    #[test]
    fn test_generic_json_empty() {
        let json = to_generic_json(&[], &RuleRepository::test_performance(Language::Kotlin)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["issues"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_write_issues_text() {
        let mut out = Vec::new();
        write_issues(
            &mut out,
            &[sample_issue()],
            OutputFormat::Text,
            &RuleRepository::test_performance(Language::Kotlin),
            false,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("src/test/kotlin/FooTest.kt:3"));
        assert!(text.contains("Test execution took 2000 ms"));
    }

    #[test]
    fn test_write_issues_text_plain_when_not_colored() {
        console::set_colors_enabled(true);
        let mut out = Vec::new();
        write_issues(
            &mut out,
            &[sample_issue()],
            OutputFormat::Text,
            &RuleRepository::test_performance(Language::Kotlin),
            false,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "src/test/kotlin/FooTest.kt:3 [testperformance:testPerformance] Test execution took 2000 ms\n"
        );
    }

    #[test]
    fn test_write_issues_text_colored() {
        let mut out = Vec::new();
        write_issues(
            &mut out,
            &[sample_issue()],
            OutputFormat::Text,
            &RuleRepository::test_performance(Language::Kotlin),
            true,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().contains('\x1b'));
    }
}
