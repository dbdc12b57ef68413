// src/main.rs
//! geolocate - resolve the current position once and print it as JSON

use anyhow::Context;
use clap::{Parser, Subcommand};
use geolocation_coordinator::{
    bridge::{Bridge, GET_LOCATION},
    config::CoordinatorConfig,
    logging,
    platform::{gpsd::GpsdProviders, unavailable::UnavailableFusedClient},
    LocationCoordinator,
};
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc};

#[derive(Parser, Debug)]
#[command(name = "geolocate", version, about = "Resolve the device's current position")]
struct Cli {
    /// Log decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/geolocation-coordinator/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current position
    Locate {
        #[arg(long)]
        gpsd_host: Option<String>,

        #[arg(long)]
        gpsd_port: Option<u16>,

        /// Ask for balanced power instead of high accuracy
        #[arg(long)]
        low_accuracy: bool,

        /// Oldest acceptable cached fix, in milliseconds
        #[arg(long)]
        maximum_age: Option<i64>,

        /// Raw request options as the host would send them
        #[arg(long, conflicts_with_all = ["low_accuracy", "maximum_age"])]
        json: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<CoordinatorConfig> {
    let config = match path {
        Some(path) => CoordinatorConfig::load_from(path),
        None => CoordinatorConfig::load(),
    };
    config.context("loading configuration")
}

fn request_args(low_accuracy: bool, maximum_age: Option<i64>, raw: Option<String>) -> anyhow::Result<Value> {
    if let Some(raw) = raw {
        return serde_json::from_str(&raw).context("parsing --json options");
    }

    let mut options = json!({});
    if low_accuracy {
        options["highAccuracyEnabled"] = json!(false);
    }
    if let Some(age) = maximum_age {
        options["maximumAge"] = json!(age);
    }
    Ok(json!([options]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::default_level(cli.verbose));

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if write {
                let path = match cli.config.as_ref() {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                eprintln!("Saved configuration to {}", path.display());
            }
            Ok(())
        }
        Command::Locate {
            gpsd_host,
            gpsd_port,
            low_accuracy,
            maximum_age,
            json,
        } => {
            let host = gpsd_host.unwrap_or_else(|| config.gpsd_host.clone());
            let port = gpsd_port.unwrap_or(config.gpsd_port);
            config.update_gpsd(host, port);

            let providers = match GpsdProviders::connect(&config.gpsd_host, config.gpsd_port).await {
                Ok(providers) => providers,
                Err(e) => {
                    tracing::warn!(error = %e, "gpsd unavailable, only cached positions can be used");
                    GpsdProviders::new()
                }
            };

            let coordinator = Arc::new(LocationCoordinator::new(
                Arc::new(UnavailableFusedClient),
                Arc::new(providers.clone()),
                &config,
            ));
            coordinator.start();

            let bridge = Arc::new(Bridge::new(coordinator, config.default_options()));
            let interrupt = Arc::clone(&bridge);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.shutdown();
                }
            });

            let args = request_args(low_accuracy, maximum_age, json)?;
            let outcome = bridge.execute(GET_LOCATION, &args).await;
            bridge.shutdown();
            providers.stop();

            match outcome {
                Some(Ok(position)) => {
                    println!("{}", position);
                    Ok(())
                }
                Some(Err(message)) => {
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
                None => anyhow::bail!("action {} not handled", GET_LOCATION),
            }
        }
    }
}
