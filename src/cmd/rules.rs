//! Rule metadata export — `testperf rules`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use testperf::config::TestPerfConfig;
use testperf::rules::{RuleRepository, SensorDescriptor};
use testperf::sensor::TestPerformanceSensor;

#[derive(Serialize)]
struct Registration {
    repository: RuleRepository,
    sensor: SensorDescriptor,
}

pub fn cmd_rules(project_dir: &Path) -> Result<()> {
    let config = TestPerfConfig::new(project_dir.to_path_buf())?;
    let sensor = TestPerformanceSensor::new(config.language());
    let repository = RuleRepository::test_performance(sensor.language());
    let sensor = sensor.describe();
    let json = serde_json::to_string_pretty(&Registration { repository, sensor })
        .context("Failed to serialize rule repository")?;
    println!("{}", json);
    Ok(())
}
