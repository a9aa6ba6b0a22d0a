use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod host;

#[derive(Parser)]
#[command(name = "focusguard", version, about = "FocusGuard work/rest enforcer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session until interrupted, printing events as JSON lines
    Run(commands::run::RunArgs),
    /// Show the status a session would start with, without enforcing anything
    Status(commands::status::StatusArgs),
    /// List running processes that the watchdog would act on
    Scan,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("focusguard=info,focusguard_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Scan => commands::scan::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
