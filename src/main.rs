use anyhow::Result;
use clap::Parser;
use linky_monitor::assembler::{AssemblerConfig, FrameAssembler};
use linky_monitor::config::{load_config, MonitorConfig, DEFAULT_CONFIG_PATH};
use linky_monitor::db::{self, LogSink, PostgresSink, Sink};
use linky_monitor::errors::{ConfigError, MonitorError};
use linky_monitor::logging::{init_logging, Rotation};
use linky_monitor::monitor::{self, LoopOptions};
use linky_monitor::retry::db_retry_config;
use linky_monitor::serial::SerialLineSource;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "linky_monitor")]
#[command(about = "Reads Linky TIC frames from a serial port and stores them in PostgreSQL", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "LINKY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial device, overrides the configuration file
    #[arg(long)]
    device: Option<String>,

    /// Log level (error, warn, info, debug, trace), overrides the configuration file
    #[arg(long)]
    log_level: Option<String>,

    /// Read a single frame and exit
    #[arg(long)]
    once: bool,

    /// Log frames instead of writing them to the database
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        let code = err
            .downcast_ref::<MonitorError>()
            .map(MonitorError::exit_code)
            .unwrap_or(1);
        error!("Monitor stopped: {:#}", err);
        eprintln!("linky_monitor: {:#}. See logs for more info.", err);
        process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (mut config, using_defaults) = match load_config(&cli.config) {
        Ok(config) => (config, false),
        Err(ConfigError::NotFound { .. }) => (MonitorConfig::default(), true),
        Err(e) => {
            // No file settings to honour, log to stderr with the CLI level.
            init_logging(
                cli.log_level.as_deref().unwrap_or("info"),
                None,
                Rotation::default(),
            )?;
            return Err(MonitorError::Config(e).into());
        }
    };
    apply_cli(&mut config, &cli);
    init_logging(
        &config.log_level,
        config.log_file.as_deref(),
        config.log_rotation(),
    )?;
    if using_defaults {
        warn!(
            "Configuration file {} not found, using defaults",
            cli.config.display()
        );
    }
    debug!("Config loaded! Values: {:?}", redacted(&config));

    let source = SerialLineSource::new(config.device.clone(), config.baud_rate);
    let assembler_config = AssemblerConfig {
        max_consecutive_invalid_lines: config.max_consecutive_invalid_lines,
    };
    let options = LoopOptions {
        interval: config.poll_interval(),
        max_consecutive_read_failures: if cli.once {
            1
        } else {
            config.max_consecutive_read_failures
        },
        max_cycles: cli.once.then_some(1),
    };

    if cli.dry_run {
        info!("Dry run: frames are logged, not stored");
        poll(source, LogSink::new(), assembler_config, &options)
    } else {
        let pg = config.database.to_pg_config().map_err(MonitorError::Config)?;
        db::verify_connection(&pg, &db_retry_config())?;
        poll(source, PostgresSink::new(pg), assembler_config, &options)
    }
}

fn poll<K: Sink>(
    source: SerialLineSource,
    sink: K,
    assembler_config: AssemblerConfig,
    options: &LoopOptions,
) -> Result<()> {
    let mut assembler = FrameAssembler::new(source, sink, assembler_config);
    monitor::run(&mut assembler, options)?;
    Ok(())
}

fn apply_cli(config: &mut MonitorConfig, cli: &Cli) {
    config.apply_env();
    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
}

/// Copy of the config safe to log.
fn redacted(config: &MonitorConfig) -> MonitorConfig {
    let mut copy = config.clone();
    if copy.database.password.is_some() {
        copy.database.password = Some("***".to_string());
    }
    if copy.database.url.is_some() {
        copy.database.url = Some("***".to_string());
    }
    copy
}
