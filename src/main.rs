//! Steploop CLI binary entry point.

use clap::Parser;
use steploop::agent_loop::RunStatus;
use steploop::cli::{commands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Agents => commands::list_agents(cli.json).map(|_| RunStatus::Completed),
        Commands::Tools => commands::list_tools(cli.json).map(|_| RunStatus::Completed),
        Commands::Run(args) => match commands::load_config(cli.config.as_deref()) {
            Ok(config) => commands::run(args, config, cli.json).await,
            Err(err) => Err(err),
        },
    };

    match result {
        Ok(RunStatus::Completed) => {}
        Ok(_) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
