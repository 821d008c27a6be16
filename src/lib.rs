pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::download::{DownloadOptions, SymbolSource};
use crate::core::config::AppConfig;
use crate::providers::{NasdaqDirectory, YahooFinanceProvider};
use crate::store::CsvCache;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// A command that runs against a loaded configuration.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Tickers {
        output_dir: Option<PathBuf>,
    },
    Screen {
        sample: bool,
        output_dir: Option<PathBuf>,
    },
    Download(DownloadOptions),
    Archive {
        output_dir: Option<PathBuf>,
    },
    Status {
        source: Option<SymbolSource>,
    },
    Clear {
        yes: bool,
    },
    Pipeline {
        sample: bool,
        output_dir: Option<PathBuf>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("stockfetch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let output_dir = |dir: Option<PathBuf>| -> Result<PathBuf> {
        match dir {
            Some(dir) => Ok(dir),
            None => config.data_path(),
        }
    };
    let directory = || {
        NasdaqDirectory::new(
            config.providers.nasdaq_url(),
            config.download.retry_policy(),
        )
    };
    let provider = || {
        YahooFinanceProvider::new(config.providers.yahoo_url())
            .map(|p| p.with_cookie_url(config.providers.yahoo_cookie_url()))
    };
    let cache = || CsvCache::open(config.cache_dir()?);

    match command {
        AppCommand::Tickers { output_dir: dir } => {
            cli::tickers::run(&directory()?, &output_dir(dir)?).await?;
        }
        AppCommand::Screen {
            sample,
            output_dir: dir,
        } => {
            cli::screen::run(
                &directory()?,
                &provider()?,
                sample,
                &config.screen.thresholds(),
                &config.screen.pacer(),
                &output_dir(dir)?,
            )
            .await?;
        }
        AppCommand::Download(options) => {
            let today = chrono::Local::now().date_naive();
            let range = options.resolve_range(config.download.period, today)?;
            cli::download::run_from_source(
                &provider()?,
                &cache()?,
                &options,
                &range,
                config.download.retry_policy(),
                &config.download.pacer(),
            )
            .await?;
        }
        AppCommand::Archive { output_dir: dir } => {
            cli::archive::run(&cache()?, &output_dir(dir)?)?;
        }
        AppCommand::Status { source } => {
            cli::status::run(&cache()?, source.as_ref())?;
        }
        AppCommand::Clear { yes } => {
            cli::clear::run(&cache()?, yes)?;
        }
        AppCommand::Pipeline {
            sample,
            output_dir: dir,
        } => {
            cli::pipeline::run(
                &directory()?,
                &provider()?,
                &cache()?,
                &config,
                sample,
                &output_dir(dir)?,
            )
            .await?;
        }
    }
    Ok(())
}
