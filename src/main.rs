//! npk - NPK calculator: soil nutrient predictions from weather measurements

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use npkcalc::api;
use npkcalc::common::config::{AppCfg, LogFormat};
use npkcalc::common::log;
use npkcalc::features::{Feature, InputRecord};
use npkcalc::inference::{self, PredictionResult};
use npkcalc::models::{ModelRegistry, RegistryCache};

#[derive(Parser)]
#[command(name = "npk")]
#[command(version)]
#[command(about = "NPK calculator - predicts soil Nitrogen, Phosphorus and Potassium", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "NPK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory containing the model artefacts
    #[arg(short, long, global = true)]
    models_dir: Option<PathBuf>,

    /// Log filter, e.g. "info" or "npkcalc=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format (text or json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the calculator page and JSON API
    Serve {
        /// Bind address
        #[arg(long)]
        bind: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Predict N, P and K for one set of measurements
    Predict {
        /// Air pressure
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        air_pressure: f64,

        /// Average temperature
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        avg_temperature: f64,

        /// Relative humidity
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        relative_humidity: f64,

        /// Solar radiation
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        solar_radiation: f64,

        /// Rainfall
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        rainfall: f64,

        /// Wind speed
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        wind_speed: f64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the loaded model artefacts
    Models {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print an example configuration file
    ConfigGen {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppCfg::load(cli.config.as_deref())?;
    if let Some(dir) = cli.models_dir {
        cfg.models_dir = dir;
    }
    if let Some(level) = cli.log_level {
        cfg.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        cfg.logging.format = format;
    }

    match cli.command {
        Commands::ConfigGen { output } => {
            let text = cfg.to_toml()?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => print!("{text}"),
            }
        }

        Commands::Serve { bind, port } => {
            let registry = load_registry(&cfg)?;
            let bind = bind.unwrap_or(cfg.server.bind);
            let port = port.unwrap_or(cfg.server.port);
            let addr: SocketAddr = format!("{bind}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address {bind}:{port}"))?;

            let (bound, server) = api::serve(registry, addr)?;
            info!(addr = %bound, "serving NPK calculator");
            server.await;
        }

        Commands::Predict {
            air_pressure,
            avg_temperature,
            relative_humidity,
            solar_radiation,
            rainfall,
            wind_speed,
            json,
        } => {
            let registry = load_registry(&cfg)?;
            let input = InputRecord {
                air_pressure,
                avg_temperature,
                relative_humidity,
                solar_radiation,
                rainfall,
                wind_speed,
            };
            let result = inference::predict(&registry, &input);
            if json {
                let body = api::http::PredictionResponse::from(&result);
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_cards(&input, &result);
            }
        }

        Commands::Models { json } => {
            let registry = load_registry(&cfg)?;
            let models = registry.models();
            if json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else if models.is_empty() {
                println!("No models found in {}", cfg.models_dir.display());
            } else {
                for model in models {
                    println!(
                        "{:<12} {:<18} {} [{}]",
                        model.name,
                        model.kind.as_str(),
                        &model.sha256[..model.sha256.len().min(12)],
                        model.features.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}

/// Install logging and load the configured model directory.
fn load_registry(cfg: &AppCfg) -> Result<Arc<ModelRegistry>> {
    log::init(&cfg.logging)?;
    let cache = RegistryCache::new(&cfg.artifact_ext);
    cache
        .get_or_load(&cfg.models_dir)
        .with_context(|| format!("loading models from {}", cfg.models_dir.display()))
}

fn print_cards(input: &InputRecord, result: &PredictionResult) {
    println!("Inputs");
    for feature in Feature::ALL {
        println!("  {:<20} {}", feature.label(), input.get(feature));
    }
    println!();
    for (target, outcome) in result.entries() {
        println!("{}: {}", target.label(), outcome);
    }
}
