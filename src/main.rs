use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tkr::core::log::init_logging;

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

impl From<Commands> for tkr::AppCommand {
    fn from(cmd: Commands) -> tkr::AppCommand {
        match cmd {
            Commands::Snapshot { symbol, json } => tkr::AppCommand::Snapshot { symbol, json },
            Commands::Series {
                symbol,
                range,
                json,
            } => tkr::AppCommand::Series {
                symbol,
                range,
                json,
            },
            Commands::View => tkr::AppCommand::View,
            Commands::Import { files } => tkr::AppCommand::Import { paths: files },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the consolidated snapshot and derived metrics of a symbol
    Snapshot {
        symbol: String,
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Display the daily price series of a symbol
    Series {
        symbol: String,
        /// One of 1M, 3M, 6M, YTD, 1Y, 5Y, MAX
        #[arg(short, long)]
        range: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Read symbols from stdin and show each as it is selected
    View,
    /// Load record bundles into the local store
    Import {
        #[arg(required = true)]
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => tkr::cli::setup::setup(),
        Some(cmd) => tkr::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
