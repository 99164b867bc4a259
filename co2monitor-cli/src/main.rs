//! CO2 Monitor CLI
//!
//! Terminal front end for the CO2 monitor dashboard: query a city or a
//! point, use the configured device position, or follow the external
//! reading.

mod commands;
mod error;
mod render;

use clap::{Parser, Subcommand};
use co2monitor::app::DEFAULT_SUGGESTION_LIMIT;
use co2monitor::config::ConfigFile;
use co2monitor::logging::init_logging;

use commands::common::start_app;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "co2monitor", version, about = "Ambient CO2, weather and air quality")]
struct Cli {
    /// Backend API base URL (overrides api.base_url)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable debug logging and print progress as results arrive
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the selectable cities
    Cities,

    /// Suggest places matching a query
    Search {
        query: String,

        /// Maximum number of global suggestions (1-10)
        #[arg(long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,

        /// Select the best match instead of listing suggestions
        #[arg(long)]
        select: bool,
    },

    /// Show CO2, weather and air quality for a city
    Show { city: String },

    /// Show CO2, weather and air quality for coordinates
    At {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Display name for the point
        #[arg(long)]
        name: Option<String>,
    },

    /// Use the configured device position
    Locate {
        /// Behave like startup detection: only proceed if permission is granted
        #[arg(long)]
        auto: bool,
    },

    /// Follow the external reading until Ctrl-C
    Watch {
        /// Also show this city
        #[arg(long)]
        city: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Config { command } = cli.command {
        return commands::config::run(command);
    }

    let mut config = ConfigFile::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let _log_guard = init_logging(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let progress = cli.verbose || matches!(cli.command, Commands::Watch { .. });

    runtime.block_on(async move {
        let mut app = start_app(config, progress)?;

        let result = match cli.command {
            Commands::Cities => commands::cities::run(&mut app).await,
            Commands::Search {
                query,
                limit,
                select,
            } => commands::search::run(&mut app, &query, limit, select).await,
            Commands::Show { city } => commands::show::run_city(&app, &city).await,
            Commands::At { lat, lon, name } => commands::show::run_at(&app, lat, lon, name).await,
            Commands::Locate { auto } => commands::locate::run(&app, auto).await,
            Commands::Watch { city } => commands::watch::run(&mut app, city).await,
            Commands::Config { .. } => Ok(()),
        };

        app.shutdown().await;
        result
    })
}
