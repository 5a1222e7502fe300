//! Sensor configuration.
//!
//! The sensor reads plain key/value properties through [`Configuration`].
//! [`TestPerfConfig`] builds those properties in layers:
//!
//! 1. `testperf.toml` in the project directory
//! 2. Environment variables (`TESTPERF_REPORT`, `TESTPERF_THRESHOLD_MS`)
//! 3. CLI arguments (`--report`, `--threshold-ms`, `-D key=value`)
//!
//! # Configuration File Format
//!
//! ```toml
//! [sensor]
//! report = "build/test-results/performance.json"
//! threshold_ms = 1500
//! language = "kotlin"
//!
//! [properties]
//! "sonar.testperformance.threshold_ms" = "2000"
//! ```
//!
//! `[properties]` entries are applied after `[sensor]`, so they win.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fs::Language;

pub const REPORT_PATH_KEY: &str = "sonar.testperformance.report";
pub const THRESHOLD_MS_KEY: &str = "sonar.testperformance.threshold_ms";
pub const LANGUAGE_KEY: &str = "sonar.testperformance.language";

pub const DEFAULT_THRESHOLD_MS: i64 = 1000;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "testperf.toml";

const ENV_REPORT: &str = "TESTPERF_REPORT";
const ENV_THRESHOLD_MS: &str = "TESTPERF_THRESHOLD_MS";

/// Read-only key/value lookup offered by the host.
pub trait Configuration {
    fn get(&self, key: &str) -> Option<&str>;

    /// Integer value of `key`; `None` when absent or unparseable.
    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|value| value.trim().parse().ok())
    }
}

/// Flat property map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    properties: BTreeMap<String, String>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Configuration for PropertyStore {
    fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}

/// `[sensor]` section of `testperf.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorSection {
    /// Path to the JSON performance report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Tests slower than this are reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_ms: Option<i64>,
    /// Source language to scan (default: kotlin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// The complete `testperf.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestPerfToml {
    #[serde(default)]
    pub sensor: SensorSection,
    /// Raw property overrides
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl TestPerfToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse testperf.toml")
    }

    /// Load `testperf.toml` from `project_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize testperf.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Flatten into properties: `[sensor]` first, then `[properties]`.
    pub fn to_properties(&self) -> PropertyStore {
        let mut store = PropertyStore::new();
        if let Some(report) = &self.sensor.report {
            store.set(REPORT_PATH_KEY, report.clone());
        }
        if let Some(threshold) = self.sensor.threshold_ms {
            store.set(THRESHOLD_MS_KEY, threshold.to_string());
        }
        if let Some(language) = &self.sensor.language {
            store.set(LANGUAGE_KEY, language.clone());
        }
        for (key, value) in &self.properties {
            store.set(key.clone(), value.clone());
        }
        store
    }
}

/// Parse a `-D key=value` argument.
pub fn parse_define(define: &str) -> Result<(String, String)> {
    let (key, value) = define
        .split_once('=')
        .with_context(|| format!("Invalid property '{}': expected key=value", define))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid property '{}': key is empty", define);
    }
    Ok((key.to_string(), value.to_string()))
}

/// Layered configuration for one project.
#[derive(Debug, Clone)]
pub struct TestPerfConfig {
    pub project_dir: PathBuf,
    pub toml: TestPerfToml,
    properties: PropertyStore,
}

impl TestPerfConfig {
    /// Load file and environment layers for `project_dir`.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        Self::with_env(project_dir, |key| std::env::var(key).ok())
    }

    /// Like [`TestPerfConfig::new`] with a custom environment lookup.
    pub fn with_env<F>(project_dir: PathBuf, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let toml = TestPerfToml::load_or_default(&project_dir)?;
        let mut properties = toml.to_properties();

        if let Some(report) = env(ENV_REPORT) {
            properties.set(REPORT_PATH_KEY, report);
        }
        if let Some(threshold) = env(ENV_THRESHOLD_MS) {
            properties.set(THRESHOLD_MS_KEY, threshold);
        }

        Ok(Self {
            project_dir,
            toml,
            properties,
        })
    }

    /// Apply CLI overrides. `defines` are applied last, in order.
    pub fn with_cli_args(
        mut self,
        report: Option<&str>,
        threshold_ms: Option<i64>,
        defines: &[String],
    ) -> Result<Self> {
        if let Some(report) = report {
            self.properties.set(REPORT_PATH_KEY, report);
        }
        if let Some(threshold) = threshold_ms {
            self.properties.set(THRESHOLD_MS_KEY, threshold.to_string());
        }
        for define in defines {
            let (key, value) = parse_define(define)?;
            self.properties.set(key, value);
        }
        Ok(self)
    }

    /// Effective properties, with a relative report path resolved against
    /// the project directory.
    pub fn properties(&self) -> PropertyStore {
        let mut properties = self.properties.clone();
        if let Some(report) = properties.get(REPORT_PATH_KEY).map(PathBuf::from)
            && report.is_relative()
        {
            let resolved = self.project_dir.join(report);
            properties.set(REPORT_PATH_KEY, resolved.to_string_lossy().into_owned());
        }
        properties
    }

    /// Effective source language; unknown values fall back to the default.
    pub fn language(&self) -> Language {
        self.properties
            .get(LANGUAGE_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Configuration warnings. None of them prevent a run.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let properties = self.properties();

        match properties.get(REPORT_PATH_KEY) {
            None => warnings.push(format!(
                "{} is not set: the sensor will not run",
                REPORT_PATH_KEY
            )),
            Some(path) if !Path::new(path).exists() => {
                warnings.push(format!("Report file '{}' does not exist", path));
            }
            Some(_) => {}
        }

        if let Some(raw) = properties.get(THRESHOLD_MS_KEY) {
            match properties.get_int(THRESHOLD_MS_KEY) {
                None => warnings.push(format!(
                    "Invalid {} '{}': using default {} ms",
                    THRESHOLD_MS_KEY, raw, DEFAULT_THRESHOLD_MS
                )),
                Some(threshold) if threshold < 0 => warnings.push(format!(
                    "Negative {} '{}': every test will be reported",
                    THRESHOLD_MS_KEY, raw
                )),
                Some(_) => {}
            }
        }

        if let Some(language) = properties.get(LANGUAGE_KEY)
            && language.parse::<Language>().is_err()
        {
            warnings.push(format!(
                "Invalid {} '{}': using {}",
                LANGUAGE_KEY,
                language,
                Language::default()
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    // =========================================
    // PropertyStore tests
    // =========================================

    #[test]
    fn test_property_store_get_int() {
        let store = PropertyStore::new()
            .with(THRESHOLD_MS_KEY, "1500")
            .with("padded", " 42 ")
            .with("bad", "fast");

        assert_eq!(store.get_int(THRESHOLD_MS_KEY), Some(1500));
        assert_eq!(store.get_int("padded"), Some(42));
        assert_eq!(store.get_int("bad"), None);
        assert_eq!(store.get_int("missing"), None);
    }

    #[test]
    fn test_property_store_from_iter_last_wins() {
        let store: PropertyStore = [("a", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(store.get("a"), Some("2"));
    }

    // =========================================
    // TestPerfToml tests
    // =========================================

    #[test]
    fn test_toml_parse_empty() {
        let toml = TestPerfToml::parse("").unwrap();
        assert!(toml.sensor.report.is_none());
        assert!(toml.to_properties().iter().next().is_none());
    }

    #[test]
    fn test_toml_parse_sensor_section() {
        let content = r#"
[sensor]
report = "build/perf.json"
threshold_ms = 1500
language = "java"
"#;
        let props = TestPerfToml::parse(content).unwrap().to_properties();
        assert_eq!(props.get(REPORT_PATH_KEY), Some("build/perf.json"));
        assert_eq!(props.get_int(THRESHOLD_MS_KEY), Some(1500));
        assert_eq!(props.get(LANGUAGE_KEY), Some("java"));
    }

    #[test]
    fn test_toml_properties_override_sensor() {
        let content = r#"
[sensor]
threshold_ms = 1500

[properties]
"sonar.testperformance.threshold_ms" = "2000"
"#;
        let props = TestPerfToml::parse(content).unwrap().to_properties();
        assert_eq!(props.get(THRESHOLD_MS_KEY), Some("2000"));
    }

    #[test]
    fn test_toml_parse_invalid() {
        assert!(TestPerfToml::parse("[sensor\nreport = ").is_err());
    }

    #[test]
    fn test_toml_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut toml = TestPerfToml::default();
        toml.sensor.report = Some("perf.json".to_string());
        toml.sensor.threshold_ms = Some(250);
        toml.save(&path).unwrap();

        let loaded = TestPerfToml::load(&path).unwrap();
        assert_eq!(loaded.sensor.report.as_deref(), Some("perf.json"));
        assert_eq!(loaded.sensor.threshold_ms, Some(250));
    }

    #[test]
    fn test_toml_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = TestPerfToml::load_or_default(dir.path()).unwrap();
        assert!(toml.sensor.report.is_none());
    }

    // =========================================
    // parse_define tests
    // =========================================

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("sonar.testperformance.threshold_ms=10").unwrap(),
            ("sonar.testperformance.threshold_ms".to_string(), "10".to_string())
        );
        assert_eq!(
            parse_define("k=a=b").unwrap(),
            ("k".to_string(), "a=b".to_string())
        );
        assert!(parse_define("novalue").is_err());
        assert!(parse_define("=v").is_err());
    }

    // =========================================
    // Layering tests
    // =========================================

    #[test]
    fn test_layering_file_env_cli() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[sensor]\nreport = \"file.json\"\nthreshold_ms = 100\n",
        )
        .unwrap();

        let file_only = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env).unwrap();
        assert_eq!(file_only.properties().get_int(THRESHOLD_MS_KEY), Some(100));

        let env = |key: &str| match key {
            "TESTPERF_THRESHOLD_MS" => Some("200".to_string()),
            _ => None,
        };
        let with_env = TestPerfConfig::with_env(dir.path().to_path_buf(), env).unwrap();
        assert_eq!(with_env.properties().get_int(THRESHOLD_MS_KEY), Some(200));

        let with_cli = with_env
            .with_cli_args(Some("cli.json"), Some(300), &[])
            .unwrap();
        let props = with_cli.properties();
        assert_eq!(props.get_int(THRESHOLD_MS_KEY), Some(300));
        assert!(props.get(REPORT_PATH_KEY).unwrap().ends_with("cli.json"));

        let with_define = with_cli
            .with_cli_args(None, None, &[format!("{}=400", THRESHOLD_MS_KEY)])
            .unwrap();
        assert_eq!(with_define.properties().get_int(THRESHOLD_MS_KEY), Some(400));
    }

    #[test]
    fn test_relative_report_resolved_against_project_dir() {
        let dir = tempdir().unwrap();
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env)
            .unwrap()
            .with_cli_args(Some("build/perf.json"), None, &[])
            .unwrap();

        let report = PathBuf::from(config.properties().get(REPORT_PATH_KEY).unwrap());
        assert_eq!(report, config.project_dir.join("build/perf.json"));
    }

    #[test]
    fn test_absolute_report_kept() {
        let dir = tempdir().unwrap();
        let absolute = dir.path().join("perf.json");
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env)
            .unwrap()
            .with_cli_args(Some(absolute.to_str().unwrap()), None, &[])
            .unwrap();
        assert_eq!(
            config.properties().get(REPORT_PATH_KEY),
            absolute.to_str()
        );
    }

    #[test]
    fn test_language_default_and_override() {
        let dir = tempdir().unwrap();
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env).unwrap();
        assert_eq!(config.language(), Language::Kotlin);

        let java = config
            .clone()
            .with_cli_args(None, None, &[format!("{}=java", LANGUAGE_KEY)])
            .unwrap();
        assert_eq!(java.language(), Language::Java);

        let unknown = config
            .with_cli_args(None, None, &[format!("{}=cobol", LANGUAGE_KEY)])
            .unwrap();
        assert_eq!(unknown.language(), Language::Kotlin);
    }

    // =========================================
    // Validation tests
    // =========================================

    #[test]
    fn test_validate_missing_report() {
        let dir = tempdir().unwrap();
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env).unwrap();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("is not set"));
    }

    #[test]
    fn test_validate_valid() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("perf.json"), "[]").unwrap();
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env)
            .unwrap()
            .with_cli_args(Some("perf.json"), Some(500), &[])
            .unwrap();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_bad_threshold_and_language() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("perf.json"), "[]").unwrap();
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env)
            .unwrap()
            .with_cli_args(
                Some("perf.json"),
                None,
                &[
                    format!("{}=slow", THRESHOLD_MS_KEY),
                    format!("{}=cobol", LANGUAGE_KEY),
                ],
            )
            .unwrap();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("using default 1000 ms"));
        assert!(warnings[1].contains("cobol"));
    }

    #[test]
    fn test_validate_negative_threshold() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("perf.json"), "[]").unwrap();
        let config = TestPerfConfig::with_env(dir.path().to_path_buf(), no_env)
            .unwrap()
            .with_cli_args(Some("perf.json"), Some(-1), &[])
            .unwrap();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("every test"));
    }
}
