use anyhow::Result;
use clap::Parser;
use glasscam::keyboard_input::CommandDispatcher;
use glasscam::{
    BestEffortLocator, CaptureSessionBuilder, GlasscamConfig, KeyboardInputHandler, LocationFix,
    SessionEvent, SimulatedCamera, SimulatedCameraConfig, StaticLocationSource,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "glasscam")]
#[command(about = "Camera capture session for head-mounted displays")]
#[command(version)]
#[command(long_about = "Drives a camera capture session from the terminal: live preview, \
zoom, photos and video with optional geotagging and auto-save. The keyboard stands in for \
the glass touchpad and the camera is simulated.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "glasscam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening the camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Maximum zoom level reported by the simulated camera
    #[arg(long, default_value_t = 60, help = "Maximum zoom of the simulated camera")]
    max_zoom: u32,

    /// Fixed latitude used for geotagging
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Fixed longitude used for geotagging
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting Glasscam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match GlasscamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let camera = SimulatedCamera::new(SimulatedCameraConfig {
        max_zoom: args.max_zoom,
        ..Default::default()
    });

    let mut locator = BestEffortLocator::new(config.location.timeout());
    if let (Some(latitude), Some(longitude)) = (args.latitude, args.longitude) {
        let fix = LocationFix {
            latitude,
            longitude,
            altitude: 0.0,
            accuracy: 1.0,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            provider: "cli".to_string(),
        };
        locator = locator.with_source(Arc::new(StaticLocationSource::new("cli", Some(fix))));
    }
    if locator.source_count() == 0 {
        info!("No location source configured, geotagging will find no fix");
    }

    let preview_size = config.camera.preview_resolution;
    let json_events = args.log_format.as_deref() == Some("json");

    let session = CaptureSessionBuilder::new()
        .config(config)
        .camera(Arc::new(camera))
        .location(Arc::new(locator))
        .build()
        .map_err(|e| {
            error!("Failed to create capture session: {}", e);
            e
        })?;

    let printer = tokio::spawn(print_events(session.subscribe(), json_events));

    let dispatcher = Arc::new(CommandDispatcher::new(session.clone(), preview_size));
    let keyboard = KeyboardInputHandler::new(dispatcher);
    let quit = keyboard.cancellation_token();
    keyboard.start().await?;

    tokio::select! {
        _ = quit.cancelled() => info!("Quit requested from keyboard"),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Interrupt received");
        }
    }

    keyboard.stop().await?;
    session.detach_surface();
    printer.abort();

    info!("Glasscam stopped");
    Ok(())
}

/// Print session notifications for the wearer
async fn print_events(mut events: broadcast::Receiver<SessionEvent>, json: bool) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => print!("{}\r\n", line),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                } else {
                    print!("{}\r\n", event.description());
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn init_logging(args: &Args) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("glasscam={}", log_level)));

    // stderr keeps log lines apart from the event feed on stdout
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Glasscam Configuration File");
    println!("# Every value can be overridden with GLASSCAM_<SECTION>__<KEY> environment variables");
    println!();
    println!("{}", toml::to_string_pretty(&GlasscamConfig::default())?);
    Ok(())
}
