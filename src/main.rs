//! Thermo Pi - Raspberry Pi Thermostat Binary
//!
//! Runs the control loop and the HTTP API until a termination signal or an
//! API shutdown request, then de-energizes every actuator before exiting.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thermo_pi::{
    start_web_server, ControllerConfig, DefaultHardware, HardwareAdapter, HardwarePorts,
    HistoryStore, OutputPin, SensorLine, Thermostat, WebConfig, DEFAULT_DEADBAND_CELSIUS,
    DEFAULT_SETPOINT_CELSIUS, DEFAULT_WEB_PORT,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "thermo_pi")]
#[command(about = "🌡️ Thermo Pi - Raspberry Pi Thermostat Controller")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Austin Couch")]
#[command(long_about = "A single-zone thermostat with hysteresis heater control and a web API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Initial setpoint in °C
    #[arg(short, long, default_value_t = DEFAULT_SETPOINT_CELSIUS)]
    setpoint: f64,

    /// Hysteresis half-width in °C
    #[arg(long, default_value_t = DEFAULT_DEADBAND_CELSIUS)]
    deadband: f64,

    /// JSON file for the sample history
    #[arg(long, default_value = "history.json")]
    history_file: PathBuf,

    #[command(flatten)]
    pins: PinArgs,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// BCM pin numbers. The cooler relays are wired active-low.
#[derive(Args)]
struct PinArgs {
    /// DHT22 data pin
    #[arg(long, default_value_t = HardwarePorts::default().sensor)]
    sensor_pin: u8,

    /// Status LED pin
    #[arg(long, default_value_t = HardwarePorts::default().status_led.port)]
    status_pin: u8,

    /// Heater relay pin
    #[arg(long, default_value_t = HardwarePorts::default().heater.port)]
    heater_pin: u8,

    /// Cooler relay pin
    #[arg(long, default_value_t = HardwarePorts::default().cooler.port)]
    cooler_pin: u8,

    /// Secondary (top) cooler relay pin
    #[arg(long, default_value_t = HardwarePorts::default().cooler_top.port)]
    cooler_top_pin: u8,
}

impl PinArgs {
    fn ports(&self) -> HardwarePorts {
        HardwarePorts {
            sensor: self.sensor_pin,
            status_led: OutputPin::active_high(self.status_pin),
            heater: OutputPin::active_high(self.heater_pin),
            cooler: OutputPin::active_low(self.cooler_pin),
            cooler_top: OutputPin::active_low(self.cooler_top_pin),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the thermostat and serve the API (default)
    Serve,

    /// Take a single sensor reading and exit
    Read,

    /// Print the persisted sample history and exit
    History(HistoryArgs),
}

#[derive(Args)]
struct HistoryArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve) | None => {
            print_banner();
            serve_command(&cli).await?;
        }
        Some(Commands::Read) => {
            read_command(&cli).await?;
        }
        Some(Commands::History(args)) => {
            history_command(&cli, args).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` directives when set, otherwise the level picked by the flags.
fn log_filter(cli: &Cli, env_directives: Option<&str>) -> EnvFilter {
    let default = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    match env_directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e);
            EnvFilter::new(default)
        }),
        None => EnvFilter::new(default),
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli, env_directives.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    Ok(())
}

fn print_banner() {
    println!("🌡️ Thermo Pi - Raspberry Pi Thermostat Controller");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    #[cfg(feature = "gpio")]
    println!("   Hardware: GPIO");
    #[cfg(not(feature = "gpio"))]
    println!("   Hardware: simulated (built without the gpio feature)");
    println!();
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    info!("Starting thermostat...");

    let config = ControllerConfig::default()
        .with_setpoint(cli.setpoint)
        .with_deadband(cli.deadband)
        .with_history_path(&cli.history_file)
        .with_ports(cli.pins.ports());

    let hardware = DefaultHardware::new().context("failed to open hardware")?;
    let thermostat = Thermostat::start(config, hardware)
        .await
        .context("failed to start thermostat")?;

    let web_config = WebConfig {
        host: cli.host.clone(),
        port: cli.port,
        enable_cors: !cli.no_cors,
    };

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.socket_addr()?);
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Setpoint: {:.1}°C ± {:.1}°C", cli.setpoint, cli.deadband);
    info!("  - History file: {}", cli.history_file.display());

    let served = start_web_server(web_config, thermostat.clone()).await;

    // Normal exit path: runs the sequence if no signal or request already did
    let report = thermostat.shutdown().await;
    if let Err(e) = &served {
        error!("Web server stopped with an error: {}", e);
    }
    if !report.loop_stopped {
        error!("Control loop did not stop in time, forcing exit");
        std::process::exit(1);
    }

    served.context("web server failed")
}

async fn read_command(cli: &Cli) -> anyhow::Result<()> {
    let ports = cli.pins.ports();
    let reading = tokio::task::spawn_blocking(move || {
        let (mut sensor, _outputs) = DefaultHardware::new()?.initialize(&ports)?;
        sensor.read_sensor(ports.sensor)
    })
    .await
    .context("sensor task panicked")?
    .context("failed to read sensor")?;

    println!("🌡️  Temperature: {:.1}°C", reading.temperature);
    println!("💧 Humidity: {:.1}%", reading.humidity);
    Ok(())
}

async fn history_command(cli: &Cli, args: &HistoryArgs) -> anyhow::Result<()> {
    let samples = HistoryStore::new(&cli.history_file).load().await;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }
        "pretty" => {
            if samples.is_empty() {
                println!("No samples in {}", cli.history_file.display());
            }
            for sample in &samples {
                println!(
                    "{}  {:>6.2}°C  {:>6.2}%",
                    sample.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    sample.temperature,
                    sample.humidity
                );
            }
        }
        other => {
            anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other);
        }
    }

    Ok(())
}
