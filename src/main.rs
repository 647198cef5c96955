use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use terra_ac::{
    init_logger_with_default, log_info, log_warn, validate_connection, ChargerConfig,
    ChargerCoordinator, Command, CommandDispatcher, DeviceSnapshot, PollScheduler, SensorKind,
    SwitchKind,
};

#[derive(Parser)]
#[command(name = "terra-ac")]
#[command(about = "Poll and control an ABB Terra AC wallbox over Modbus/TCP")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short, long)]
    unit_id: Option<u8>,

    /// Poll interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the station answers and print its serial number
    Validate,
    /// Poll once and print every value
    Poll,
    /// Poll at the configured interval until Ctrl-C
    Watch,
    /// Set the charging current limit in amps (0-32)
    SetCurrent { amps: f64 },
    /// Set the fallback limit in amps (6-32)
    SetFallback { amps: u16 },
    Start,
    Stop,
    Lock,
    Unlock,
}

impl Commands {
    fn as_command(&self) -> Option<Command> {
        match *self {
            Commands::SetCurrent { amps } => Some(Command::SetCurrentLimit(amps)),
            Commands::SetFallback { amps } => Some(Command::SetFallbackLimit(amps)),
            Commands::Start => Some(Command::StartCharging),
            Commands::Stop => Some(Command::StopCharging),
            Commands::Lock => Some(Command::LockCable),
            Commands::Unlock => Some(Command::UnlockCable),
            Commands::Validate | Commands::Poll | Commands::Watch => None,
        }
    }
}

fn load_config(cli: &Cli) -> Result<ChargerConfig> {
    let mut config = match &cli.config {
        Some(path) => ChargerConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ChargerConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(unit_id) = cli.unit_id {
        config.unit_id = unit_id;
    }
    if let Some(interval) = cli.interval {
        config.scan_interval_secs = interval;
    }
    config.validate()?;
    Ok(config)
}

fn print_snapshot(snapshot: &DeviceSnapshot, config: &ChargerConfig) {
    for kind in SensorKind::ALL {
        let unit = kind.unit().map(|u| format!(" {u}")).unwrap_or_default();
        println!("{:<22} {}{unit}", kind.name(), kind.value(snapshot));
    }
    println!("{:<22} {}", "Socket Lock", snapshot.socket_lock_description());
    println!("{:<22} {} A", "Fallback Limit", snapshot.fallback_limit);
    println!("{:<22} {} s", "Comm. Timeout", snapshot.communication_timeout);
    for switch in SwitchKind::ALL {
        let state = if switch.is_on(snapshot, &config.policy) { "on" } else { "off" };
        println!("{:<22} {state}", switch.name());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger_with_default(log::LevelFilter::Info);

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Validate => {
            let serial = validate_connection(&config)
                .await
                .with_context(|| format!("validating {}:{}", config.host, config.port))?;
            println!("{serial}");
        }
        Commands::Poll => {
            let coordinator = ChargerCoordinator::from_config(&config);
            let snapshot = coordinator.poll().await?;
            print_snapshot(&snapshot, &config);
            coordinator.shutdown().await;
        }
        Commands::Watch => {
            let coordinator = ChargerCoordinator::from_config(&config);
            let mut updates = coordinator.subscribe();
            let (stop, task) = PollScheduler::new(coordinator, config.scan_interval()).spawn();

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let latest = updates.borrow_and_update().clone();
                        if let Some(snapshot) = latest {
                            log_info(&snapshot.summary());
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            let _ = stop.send(true);
            let stats = task.await?;
            log_info(&format!(
                "Stopped after {} polls ({} failed, {} skipped)",
                stats.ticks, stats.failed, stats.skipped
            ));
        }
        ref other => {
            let Some(command) = other.as_command() else {
                return Ok(());
            };
            let coordinator = ChargerCoordinator::from_config(&config);
            let dispatcher = CommandDispatcher::new(coordinator.clone(), config.settle);
            dispatcher.execute(command).await?;

            coordinator.wait_for_refresh().await;
            match coordinator.snapshot() {
                Some(snapshot) => print_snapshot(&snapshot, &config),
                None => {
                    if let Some(err) = coordinator.last_error() {
                        log_warn(&format!("Follow-up poll failed: {err}"));
                    }
                }
            }
            coordinator.shutdown().await;
        }
    }

    Ok(())
}
