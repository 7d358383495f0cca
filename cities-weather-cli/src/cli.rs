use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use inquire::{Password, Text};

use cities_weather_core::{
    Config, CopyStatementLoader, FsBlobStore, OpenWeatherSource, Pipeline, SlackConfig,
    SlackWebhookNotifier, StoreConfig,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cities-weather", version, about = "Cities weather ETL runner")]
pub struct Cli {
    /// Path to the configuration file; defaults to the platform config dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively create or update the configuration.
    Configure,

    /// Execute one extract-merge-upload pass over all configured cities.
    ///
    /// Intended to be invoked by an external scheduler; keep at most one
    /// run in flight at a time.
    Run,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(self.config),
            Command::Run => run_pipeline(self.config).await,
        }
    }
}

fn configure(path: Option<PathBuf>) -> Result<()> {
    let api_key = Password::new("OpenWeather API key:").without_confirmation().prompt()?;
    let webhook_url = Text::new("Slack webhook URL:").prompt()?;
    let channel =
        Text::new("Slack channel:").with_default("#all-dummy-weather-team").prompt()?;
    let bucket = Text::new("Dataset bucket directory:").prompt()?;
    let cities_raw = Text::new("Cities (comma-separated):")
        .with_default("Portland, Seattle, London, Mumbai, Beijing")
        .prompt()?;

    let cities = cities_raw
        .split(',')
        .map(|city| city.trim().to_string())
        .filter(|city| !city.is_empty())
        .collect();

    let config = Config {
        cities,
        api_key,
        store: StoreConfig { bucket: PathBuf::from(bucket) },
        warehouse: Default::default(),
        slack: SlackConfig { webhook_url, channel },
        retry: Default::default(),
        http_timeout_secs: 10,
    };

    let path = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };

    println!("Configuration written to {}", path.display());
    Ok(())
}

async fn run_pipeline(path: Option<PathBuf>) -> Result<()> {
    let config = match path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    config.validate()?;

    let timeout = config.http_timeout();
    let source = OpenWeatherSource::new(config.api_key.clone(), timeout)?;
    let store = FsBlobStore::new(config.store.bucket.clone())?;
    let notifier = SlackWebhookNotifier::new(
        config.slack.webhook_url.clone(),
        config.slack.channel.clone(),
        timeout,
    )?;
    let loader = CopyStatementLoader::new(config.warehouse.clone());

    let pipeline = Pipeline::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(loader),
        Arc::new(notifier),
        config.retry,
    );

    tracing::info!(cities = config.cities.len(), "starting ETL pass");
    let report = pipeline.run(&config.cities).await;

    for run in &report.cities {
        match run {
            Ok(run) => {
                let outcome = if run.changed { "dataset updated" } else { "no new observation" };
                println!("{}: {outcome}", run.city);
            }
            Err(err) => println!("{}: failed ({err})", err.city),
        }
    }

    if !report.notification_failures.is_empty() {
        println!(
            "warning: {} notification(s) were not delivered",
            report.notification_failures.len()
        );
    }

    if !report.all_succeeded() {
        let failed: Vec<&str> = report.failed_cities().map(|err| err.city.as_str()).collect();
        anyhow::bail!("pipeline failed for: {}", failed.join(", "));
    }

    Ok(())
}
