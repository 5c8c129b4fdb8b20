//! # Galileo board runner
//!
//! Opens a board through a native binding, registers the pins listed in
//! the `[report]` section and drives the scheduler until interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Simulation binding with the default config path
//! galileo_hal --simulate
//!
//! # Real hardware through sysfs
//! galileo_hal --config /etc/galileo/board.toml --binding sysfs
//!
//! # Events as JSON lines, verbose logs
//! galileo_hal -s -v --json
//!
//! # Show the effective configuration
//! galileo_hal --print-config
//! ```

use clap::Parser;
use galileo_common::config::{BoardConfig, ConfigError, LogLevel};
use galileo_common::consts::DEFAULT_CONFIG_PATH;
use galileo_hal::{Board, BindingRegistry, BoardEvent};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Galileo HAL - board driver for Intel Galileo, Edison and Joule boards
#[derive(Parser, Debug)]
#[command(name = "galileo_hal")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Board driver for Intel Galileo, Edison and Joule carrier boards")]
#[command(long_about = None)]
struct Args {
    /// Path to the board configuration file (board.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation binding
    #[arg(short = 's', long)]
    simulate: bool,

    /// Binding to load (overrides `board.binding`)
    #[arg(short, long)]
    binding: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and events in JSON format
    #[arg(long)]
    json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Board startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = BoardConfig::from_file(&args.config);
    let log_level = loaded
        .as_ref()
        .map_or(LogLevel::default(), |c| c.shared.log_level);
    setup_tracing(&args, log_level);

    info!("Galileo HAL v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => {
            info!("Loaded configuration from {}", args.config.display());
            config
        }
        Err(ConfigError::FileNotFound) => {
            warn!(
                "No configuration at {}, using defaults",
                args.config.display()
            );
            BoardConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    if args.simulate {
        info!("Simulation mode enabled (exclusive)");
        config.board.binding = "simulation".to_string();
    } else if let Some(binding) = &args.binding {
        info!("Binding from CLI: {}", binding);
        config.board.binding = binding.clone();
    }

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let registry = BindingRegistry::with_builtin();
    let mut board = Board::from_registry(&registry, config.clone())?;

    let json = args.json;
    board.on_any(move |event| print_event(event, json));

    for pin in config.report.digital {
        board.digital_read(pin, |_| {})?;
    }
    for pin in config.report.analog {
        board.analog_read(pin, |_| {})?;
    }

    let running = board.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    if let Err(e) = board.run() {
        error!("Board loop error: {}", e);
    }
    board.shutdown()?;

    info!("Galileo HAL shutdown complete");
    Ok(())
}

fn print_event(event: &BoardEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to encode event {}: {}", event.name(), e),
        }
    } else {
        info!("{}: {:?}", event.name(), event);
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match configured {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
