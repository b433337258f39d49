use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{check_config, registry, serve};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "plexdubs")]
#[command(about = "Keep a Plex collection of the latest English-dubbed anime, fed by Sonarr and Radarr webhooks")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Optional TOML file; environment variables take precedence over it
    #[arg(long, global = true, env = "PLEX_DUBS_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to a daily-rotated file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server (default)
    #[command(long_about = "Listen for Sonarr (POST /sonarr) and Radarr (POST /radarr) webhooks and keep the configured Plex collections up to date. Connects to Plex on startup, retrying while the server comes up.")]
    Serve {
        /// Address to listen on, overrides LISTEN_ADDR
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },
    /// Validate configuration and print the resolved settings
    CheckConfig,
    /// Inspect or reset the registry of upgrade-deleted dubs
    Registry {
        #[command(subcommand)]
        cmd: RegistryCommands,
    },
}

#[derive(Subcommand)]
enum RegistryCommands {
    /// List registered media ids per library
    List,
    /// Forget every registered media id
    #[command(long_about = "Delete the registry snapshot so previously upgrade-deleted dubs can be added again. A running server keeps its registry in memory and rewrites the snapshot on its next registration, so stop the server before clearing.")]
    Clear,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())
        .map_err(|e| eyre!("Failed to initialize logging: {:#}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let config_file = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve { listen: None }) {
        Commands::Serve { listen } => serve::run_serve(config_file, listen).await,
        Commands::CheckConfig => check_config::run_check_config(config_file, &output),
        Commands::Registry { cmd } => match cmd {
            RegistryCommands::List => registry::run_list(config_file, &output),
            RegistryCommands::Clear => registry::run_clear(&output),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["plexdubs"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.output, output::OutputFormat::Human);
    }

    #[test]
    fn test_registry_clear_help_mentions_running_server() {
        let command = Cli::command();
        let clear = command
            .find_subcommand("registry")
            .and_then(|registry| registry.find_subcommand("clear"))
            .unwrap();
        let help = clear.get_long_about().unwrap().to_string();
        assert!(help.contains("running server"));
        assert!(help.contains("stop the server before clearing"));
    }
}
