//! Configuration view and validation commands — `testperf config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use testperf::config::{
        CONFIG_FILE, Configuration, DEFAULT_THRESHOLD_MS, TestPerfConfig, TestPerfToml,
        THRESHOLD_MS_KEY,
    };

    let config_path = project_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Test Performance Configuration");
            println!("==============================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Run 'testperf config init' to create one.");
            }
            println!();

            let config = TestPerfConfig::new(project_dir.to_path_buf())?;
            let properties = config.properties();

            println!("Effective properties (with env overrides):");
            let mut any = false;
            for (key, value) in properties.iter() {
                println!("  {} = \"{}\"", key, value);
                any = true;
            }
            if !any {
                println!("  (none)");
            }
            println!();
            if properties.get(THRESHOLD_MS_KEY).is_none() {
                println!("  {} defaults to {}", THRESHOLD_MS_KEY, DEFAULT_THRESHOLD_MS);
            }
            println!("  language = \"{}\"", config.language());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = TestPerfConfig::new(project_dir.to_path_buf())?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            let mut toml = TestPerfToml::default();
            toml.sensor.report = Some("build/test-results/performance.json".to_string());
            toml.sensor.threshold_ms = Some(DEFAULT_THRESHOLD_MS);
            toml.save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [sensor] report, threshold_ms, language");
            println!("  - [properties] for raw key/value overrides");
            println!();
        }
    }

    Ok(())
}
