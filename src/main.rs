use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use stockfetch::cli::download::{DownloadOptions, SymbolSource};
use stockfetch::core::Period;
use stockfetch::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// File with one ticker symbol per line
    #[arg(long)]
    file: Option<PathBuf>,

    /// Screened export (nasdaq_data.csv) to read symbols from
    #[arg(long)]
    screened: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self) -> Option<SymbolSource> {
        match (self.file, self.screened) {
            (Some(path), _) => Some(SymbolSource::List(path)),
            (None, Some(path)) => Some(SymbolSource::Screened(path)),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Download the NASDAQ symbol directory and save it as CSV
    Tickers {
        /// Output directory (defaults to the data path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Screen listed tickers by price, market cap and volume
    Screen {
        /// Only consider the major large-cap tickers
        #[arg(long)]
        sample: bool,
        /// Output directory (defaults to the data path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download daily price history into the CSV cache
    Download {
        #[command(flatten)]
        source: SourceArgs,
        /// History period, e.g. 1y, 5y, 8y, max
        #[arg(long, conflicts_with = "start")]
        period: Option<Period>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Day after the last day to include (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
        /// Only process the first N symbols
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Pack the cached CSV files into a ZIP archive
    Archive {
        /// Output directory (defaults to the data path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show download progress against a symbol list
    Status {
        /// File with one ticker symbol per line
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete all cached CSV files
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Run directory, screen, download and archive in sequence
    Pipeline {
        /// Only consider the major large-cap tickers
        #[arg(long)]
        sample: bool,
        /// Output directory (defaults to the data path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl TryFrom<Commands> for stockfetch::AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<stockfetch::AppCommand> {
        use stockfetch::AppCommand;

        Ok(match cmd {
            Commands::Tickers { output } => AppCommand::Tickers { output_dir: output },
            Commands::Screen { sample, output } => AppCommand::Screen {
                sample,
                output_dir: output,
            },
            Commands::Download {
                source,
                period,
                start,
                end,
                limit,
            } => AppCommand::Download(DownloadOptions {
                source: source
                    .into_source()
                    .ok_or_else(|| anyhow::anyhow!("Either --file or --screened is required"))?,
                period,
                start,
                end,
                limit,
            }),
            Commands::Archive { output } => AppCommand::Archive { output_dir: output },
            Commands::Status { file } => AppCommand::Status {
                source: file.map(SymbolSource::List),
            },
            Commands::Clear { yes } => AppCommand::Clear { yes },
            Commands::Pipeline { sample, output } => AppCommand::Pipeline {
                sample,
                output_dir: output,
            },
            Commands::Setup => anyhow::bail!("Setup command should be handled separately"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => stockfetch::cli::setup::setup(),
        Some(cmd) => match stockfetch::AppCommand::try_from(cmd) {
            Ok(command) => stockfetch::run_command(command, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
