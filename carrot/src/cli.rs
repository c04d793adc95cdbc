use std::path::PathBuf;

use anyhow::Context;
use carrot_config::Config;
use carrot_server::{Broker, InfluxSink, Relay};
use clap::{Parser, Subcommand};

use crate::setup;

/// The Carrot metric relay.
#[derive(Debug, Parser)]
#[command(name = "carrot", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "CONFIG_PATH",
        default_value = "./config.yml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the relay (default).
    Run,

    /// Operations on the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Validates the configuration file and exits.
    Check,
}

/// Runs the command line application.
pub fn execute() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_path(&cli.config)
        .with_context(|| format!("cannot load config from {}", cli.config.display()))?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config),
        Command::Config {
            command: ConfigCommand::Check,
        } => {
            println!("config {} is valid", cli.config.display());
            Ok(())
        }
    }
}

/// Runs the relay until the broker connection closes or ctrl-c is received.
fn run(config: Config) -> anyhow::Result<()> {
    carrot_log::init(&config.logging);
    setup::dump_spawn_info(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start the async runtime")?;

    runtime.block_on(async {
        let sink = InfluxSink::new(&config.influx);
        let broker = Broker::connect(&config.broker)
            .await
            .context("cannot connect to the message broker")?;

        carrot_log::info!("waiting for messages");
        let relay = Relay::new(sink);
        relay.run(broker.consumer(), shutdown_signal()).await;

        Ok(())
    })
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        carrot_log::error!("failed to listen for ctrl-c: {error}");
    }
}
