use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, daemon, scan, status};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "plexwatch")]
#[command(about = "plexwatch - Know when your watchlist lands on your Plex server")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scan cycle now
    #[command(long_about = "Fetch the configured watchlist feeds, match every entry against the Plex library, update the tracked state and send notifications for titles that became available.")]
    Scan {
        /// Match and report, but do not save state or send notifications
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Run scan cycles on a schedule
    #[command(long_about = "Run plexwatch in the foreground with an internal cron scheduler. A scan runs on startup unless --no-startup-scan is given. Triggers that fire while a scan is still running are dropped.")]
    Daemon {
        /// Cron expression with a seconds field (e.g. '0 */30 * * * *')
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the scan on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_scan: bool,
    },
    /// Show tracked watchlist entries
    Status {
        /// Only list entries not yet in the library
        #[arg(long, action = ArgAction::SetTrue)]
        pending: bool,
    },
    /// View or change configuration
    #[command(long_about = "Manage configuration and credentials. Running without a subcommand shows the current configuration.")]
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
    /// Clear stored state or credentials
    Clear {
        /// Forget all tracked entries (the next scan announces everything again)
        #[arg(long, action = ArgAction::SetTrue)]
        state: bool,

        /// Remove stored credentials
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure the Plex server and token
    #[command(long_about = "Set the Plex server URL and the X-Plex-Token used to read the library. Values not given as flags are prompted for.")]
    Plex {
        /// Plex server URL (e.g. http://192.168.1.10:32400)
        #[arg(long)]
        server_url: Option<String>,

        /// Plex token (if not provided, will prompt)
        #[arg(long)]
        token: Option<String>,
    },

    /// Configure the optional Tautulli lookup service
    Tautulli {
        /// Tautulli URL (e.g. http://192.168.1.10:8181)
        #[arg(long)]
        url: Option<String>,

        /// Tautulli API key (if not provided, will prompt)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Add a watchlist RSS feed
    Feed {
        /// Name shown in logs
        #[arg(long)]
        name: String,

        /// Feed URL
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Daemon { .. } => daemon::configured_log_file(),
        _ => None,
    };
    logging::init_logging(cli.verbose, cli.quiet, log_file.as_deref())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to initialize logging: {}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Scan { dry_run } => scan::run_scan(dry_run, &output).await,
        Commands::Daemon {
            schedule,
            no_startup_scan,
        } => daemon::run_daemon(schedule, no_startup_scan, &output).await,
        Commands::Status { pending } => status::run_status(pending, &output),
        Commands::Config { cmd } => config::run_config(cmd.unwrap_or(ConfigCommands::Show { full: false }), &output).await,
        Commands::Clear { state, credentials } => clear::run_clear(state, credentials, &output),
    }
}
