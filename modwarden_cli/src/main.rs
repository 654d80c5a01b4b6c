mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "modwarden")]
#[command(about = "Discord moderation bot: keyword reports, invite removal and channel wipes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and moderate until interrupted
    Run(commands::run::RunArgs),
    /// Parse and validate a configuration file, then exit
    CheckConfig(commands::check_config::CheckConfigArgs),
}

fn init_tracing(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in ["modwarden", "modwarden_lib", "modwarden_api"] {
        filter = filter.add_directive(format!("{}={}", target, level).parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => {
            let config = commands::load_config(&args.config)?;
            init_tracing(config.debug)?;
            commands::run::run(config).await?
        }
        Commands::CheckConfig(args) => commands::check_config::run(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_config_path() {
        let cli = Cli::try_parse_from(["modwarden", "run", "--config", "bot.toml"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.config.to_str(), Some("bot.toml")),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn config_path_has_a_default() {
        let cli = Cli::try_parse_from(["modwarden", "check-config"]).unwrap();
        match cli.command {
            Commands::CheckConfig(args) => assert_eq!(args.config.to_str(), Some("modwarden.toml")),
            _ => panic!("expected check-config"),
        }
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["modwarden", "wipe"]).is_err());
    }
}
