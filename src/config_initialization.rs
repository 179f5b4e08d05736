//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::{PipelineConfig, TomlConfigAdapter};
use crate::cli::{Cli, Commands};

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<PipelineConfig> {
    // Defaults, then file
    let mut config = TomlConfigAdapter::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration file")?;

    // Environment
    let env_overrides = config
        .apply_env(|var| std::env::var(var).ok())
        .context("Invalid environment override")?;
    if env_overrides > 0 {
        info!("Applied {} environment variable overrides", env_overrides);
    }

    // CLI
    let cli_overrides = apply_cli_configuration_overrides(&mut config, cli)?;
    if cli_overrides > 0 {
        info!("Applied {} CLI configuration overrides", cli_overrides);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(config: &mut PipelineConfig, cli: &Cli) -> Result<usize> {
    let mut overrides: Vec<(&str, String)> = Vec::new();

    if let Some(root) = &cli.storage_root {
        overrides.push(("storage_root", root.to_string_lossy().to_string()));
    }
    if let Some(level) = &cli.log_level {
        overrides.push(("log_level", level.clone()));
    }
    if let Some(format) = &cli.log_format {
        overrides.push(("log_format", format.clone()));
    }
    if let Some(timeout) = cli.timeout {
        overrides.push(("process_timeout_secs", timeout.to_string()));
    }

    if let Commands::Run(args) = &cli.command {
        if let Some(frames) = args.frames {
            overrides.push(("frame_count", frames.to_string()));
        }
        if let Some(window) = args.window {
            overrides.push(("window_secs", window.to_string()));
        }
        if let Some(sections) = args.sections {
            overrides.push(("section_count", sections.to_string()));
        }
    }

    for (key, value) in &overrides {
        info!("CLI override: {} = {}", key, value);
        config
            .set(key, value)
            .with_context(|| format!("Invalid value for --{}", key.replace('_', "-")))?;
    }
    Ok(overrides.len())
}
