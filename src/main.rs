//! ClipScribe CLI
//!
//! # Usage
//!
//! ```bash
//! clipscribe create --video talk.mp4
//! clipscribe run <job> all
//! clipscribe status <job>
//! clipscribe select --frames-dir data/<job>/frames --target 01:30
//! clipscribe delete <job>
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use clipscribe::app::DefaultAppContainer;
use clipscribe::cli::{commands, Cli, Commands};
use clipscribe::config_initialization::initialize_configuration_hierarchy;
use clipscribe::utils::logging::LoggingSystem;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli)?;
    let logging = LoggingSystem::new(config.logging());
    logging.initialize()?;
    logging.log_system_info();

    match cli.command {
        Commands::Create(args) => {
            info!("Executing create command");
            commands::create(&DefaultAppContainer::new(&config)?, args).await?;
        }
        Commands::Run(args) => {
            info!("Executing run command");
            commands::run(&DefaultAppContainer::new(&config)?, args).await?;
        }
        Commands::Status(args) => {
            commands::status(&DefaultAppContainer::new(&config)?, args).await?;
        }
        Commands::List(args) => {
            commands::list(&DefaultAppContainer::new(&config)?, args).await?;
        }
        Commands::Delete(args) => {
            info!("Executing delete command");
            commands::delete(&DefaultAppContainer::new(&config)?, args).await?;
        }
        Commands::Select(args) => {
            info!("Executing select command");
            commands::select(&config, args).await?;
        }
    }

    Ok(())
}
