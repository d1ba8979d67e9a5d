//! AQI forecast command line.
//!
//! Runs the data pipeline, prints predictions and serves the dashboard.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use aqi_forecast::Stores;
use aqi_forecast::commands;
use aqi_forecast::dashboard::DEFAULT_FORECAST_HOURS;
use aqi_forecast::service::PredictionService;
use aqi_structs::{GeoLocation, Metric, ModelFamily, SERVED_MODEL_NAME};
use clap::{Args, Parser, Subcommand};
use config::Config;
use ml_model::TrainerConfig;
use openweather_client::OpenWeatherClient;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

/// AQI forecasting pipeline and dashboard
#[derive(Parser)]
#[command(name = "aqi-forecast")]
#[command(about = "Fetch air quality data, train AQI models and serve forecasts")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, env = "AQI_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Override the configured latitude
    #[arg(long, global = true, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Override the configured longitude
    #[arg(long, global = true, allow_hyphen_values = true)]
    lon: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TrainArgs {
    /// Share of rows (chronologically first) used for training
    #[arg(long)]
    train_ratio: Option<f64>,

    /// Minimum rows in each of the training and evaluation splits
    #[arg(long)]
    min_rows_per_split: Option<usize>,

    /// Metric used to pick the served model (mae, rmse, r2)
    #[arg(long, default_value_t = Metric::Mae)]
    metric: Metric,

    /// Model families to fit, in tie-break order
    /// (`random_forest,gradient_boosting,ridge` by default)
    #[arg(long, value_delimiter = ',')]
    families: Vec<ModelFamily>,
}

impl TrainArgs {
    fn trainer(&self, config: &Config) -> TrainerConfig {
        TrainerConfig {
            train_ratio: self.train_ratio.unwrap_or(config.train_ratio),
            min_rows_per_split: self.min_rows_per_split.unwrap_or(config.min_rows_per_split),
            families: self.families(),
            selection_metric: self.metric,
            ..TrainerConfig::default()
        }
    }

    /// Requested families in first-mention order, each trained once.
    fn families(&self) -> Vec<ModelFamily> {
        if self.families.is_empty() {
            return ModelFamily::DEFAULT.to_vec();
        }
        let mut families = Vec::with_capacity(self.families.len());
        for &family in &self.families {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the trailing window of pollution and weather readings
    Fetch {
        /// Window length in days
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Build model features from the latest raw readings
    Features,

    /// Train all model families on the latest features and register them
    Train(TrainArgs),

    /// Fetch, build features and train in one run
    Pipeline {
        /// Window length in days
        #[arg(short, long)]
        days: Option<u32>,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Predict the AQI for current conditions
    Predict {
        /// Registered model name
        #[arg(short, long, default_value = SERVED_MODEL_NAME)]
        model: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forecast the AQI for the coming hours
    Forecast {
        /// Registered model name
        #[arg(short, long, default_value = SERVED_MODEL_NAME)]
        model: String,

        /// Number of hours to forecast
        #[arg(long, default_value_t = DEFAULT_FORECAST_HOURS)]
        hours: usize,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered models
    Models,

    /// Serve the web dashboard
    Serve {
        /// Address to bind (defaults to `AQI_DASHBOARD_ADDR`)
        #[arg(short, long)]
        addr: Option<SocketAddr>,
    },
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Console layer on stderr so `--json` output stays clean
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    // Optional file layer
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn prediction_service(config: &Config, stores: &Stores) -> Result<PredictionService> {
    let client = OpenWeatherClient::from_config(config)?;
    Ok(PredictionService::new(
        Arc::new(client),
        stores.registry.clone(),
        config.location,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let mut config = Config::from_env()?;
    if cli.lat.is_some() || cli.lon.is_some() {
        config.location = GeoLocation::new(
            cli.lat.unwrap_or(config.location.latitude),
            cli.lon.unwrap_or(config.location.longitude),
        );
        anyhow::ensure!(
            config.location.is_valid(),
            "Invalid location {}",
            config.location
        );
    }
    debug!(?config.store, location = %config.location, "Loaded configuration");

    let stores = Stores::open(&config)?;

    match cli.command {
        Commands::Fetch { days } => {
            if let Some(days) = days {
                config.window_days = days;
            }
            let client = OpenWeatherClient::from_config(&config)?;
            commands::fetch::run(&config, &stores, &client, chrono::Utc::now()).await?;
        }
        Commands::Features => {
            commands::features::run(&config, &stores).await?;
        }
        Commands::Train(args) => {
            commands::train::run(&stores, &args.trainer(&config)).await?;
        }
        Commands::Pipeline { days, train } => {
            if let Some(days) = days {
                config.window_days = days;
            }
            let client = OpenWeatherClient::from_config(&config)?;
            let trainer = train.trainer(&config);
            commands::pipeline::run(&config, &stores, &client, &trainer, chrono::Utc::now())
                .await?;
        }
        Commands::Predict { model, json } => {
            let service = prediction_service(&config, &stores)?;
            commands::predict::run(&service, &model, json).await?;
        }
        Commands::Forecast { model, hours, json } => {
            let service = prediction_service(&config, &stores)?;
            commands::forecast::run(&service, &model, hours, json).await?;
        }
        Commands::Models => {
            commands::models::run(&stores).await?;
        }
        Commands::Serve { addr } => {
            let service = prediction_service(&config, &stores)?;
            commands::serve::run(service, addr.unwrap_or(config.dashboard_addr)).await?;
        }
    }

    info!("Done");
    Ok(())
}
