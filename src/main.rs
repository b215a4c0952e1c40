//! Vigil Agent CLI
//!
//! Camera monitoring agent with a dashboard API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vigil_agent::{
    config::Config,
    processor::{Processor, ProcessorStats},
    sensing::Sensors,
    server::{self, ServerConfig},
    store::StateStore,
    users::UserDirectory,
    VERSION,
};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version = VERSION)]
#[command(about = "Camera monitoring agent: detection tracking and alert arbitration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the sensing loop and dashboard API
    Start {
        /// API port (overrides configuration)
        #[arg(long)]
        port: Option<u16>,

        /// Path to the users file (overrides configuration)
        #[arg(long)]
        users: Option<PathBuf>,

        /// Run the sensing loop without the dashboard API
        #[arg(long)]
        no_api: bool,
    },

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port, users, no_api } => {
            cmd_start(port, users, no_api);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn cmd_start(port: Option<u16>, users: Option<PathBuf>, no_api: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("Vigil Agent v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_default();
    if let Some(port) = port {
        config.api_port = port;
    }
    if let Some(users) = users {
        config.users_path = users;
    }

    let directory = match UserDirectory::load(&config.users_path) {
        Ok(directory) => {
            println!("Users enrolled: {}", directory.len());
            directory
        }
        Err(e) => {
            eprintln!("Warning: could not load users from {:?}: {e}", config.users_path);
            eprintln!("Continuing with an empty directory.");
            UserDirectory::empty()
        }
    };

    println!("Stranger threshold: {} frames", config.unknown_threshold);
    println!("Ghost grace period: {}s", config.ghost_grace_secs);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let store = StateStore::shared(&config);
    let stats = Arc::new(ProcessorStats::new());

    // No camera wiring in this binary; the loop idles on the noop sensor
    // set until a capture implementation feeds it frames.
    let sensors = Sensors::noop_with_reminders(Box::new(directory));
    let processor = Processor::new(&config, sensors, store.clone(), stats.clone(), running.clone());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error creating runtime: {e}");
            std::process::exit(1);
        }
    };

    let shutdown_tx = if no_api {
        println!("Dashboard API: disabled");
        None
    } else {
        let server_config = ServerConfig::new(config.api_port, config.dashboard_origin.clone());
        match runtime.block_on(server::run(server_config, store.clone(), stats.clone())) {
            Ok((addr, shutdown_tx)) => {
                println!("Dashboard API: http://{addr}");
                Some(shutdown_tx)
            }
            Err(e) => {
                eprintln!("Error starting dashboard API: {e}");
                std::process::exit(1);
            }
        }
    };

    // The sensing loop blocks this thread until Ctrl+C clears the flag.
    processor.run();

    println!();
    println!("Stopping...");
    if let Some(shutdown_tx) = shutdown_tx {
        let _ = shutdown_tx.send(());
    }
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    let final_stats = stats.snapshot();
    println!(
        "Session: {} frames processed, {} alerts accepted, {} sensor errors",
        final_stats.frames_processed, final_stats.alerts_accepted, final_stats.sensor_errors
    );
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: could not set Ctrl+C handler: {e}");
    }
}
