//! Slow test analysis — `testperf analyze`.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use testperf::config::TestPerfConfig;
use testperf::fs::ProjectFileSystem;
use testperf::issues::{IssueCollector, OutputFormat, write_issues};
use testperf::rules::RuleRepository;
use testperf::sensor::{SensorContext, TestPerformanceSensor};

pub fn cmd_analyze(
    project_dir: &Path,
    report: Option<&str>,
    threshold_ms: Option<i64>,
    defines: &[String],
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let config = TestPerfConfig::new(project_dir.to_path_buf())?.with_cli_args(
        report,
        threshold_ms,
        defines,
    )?;
    let properties = config.properties();
    let fs = ProjectFileSystem::index(&config.project_dir)?;

    let sensor = TestPerformanceSensor::new(config.language());
    let mut sink = IssueCollector::new();
    let summary = sensor.execute(&mut SensorContext {
        config: &properties,
        fs: &fs,
        sink: &mut sink,
    });

    let repository = RuleRepository::test_performance(sensor.language());
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_issues(&mut file, sink.issues(), format, &repository, false)?;
            file.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let colored = console::colors_enabled();
            write_issues(&mut out, sink.issues(), format, &repository, colored)?;
        }
    }

    if format == OutputFormat::Text {
        println!();
        println!(
            "{} slow test(s) reported across {} file(s) ({} of {} test(s) over threshold, {} unmatched)",
            summary.issues, summary.files, summary.slow, summary.total, summary.unresolved
        );
    }

    Ok(())
}
