//! # Tamper Control Unit Binary
//!
//! Homes the tamper axis and runs a series of tamps against the simulation
//! driver, with the stall event handler on its own thread.
//!
//! # Usage
//!
//! ```bash
//! # Home, then tamp to 10 mm and 17 mm into material starting at 12 mm
//! tamper_cu --config config/tamper.toml --depth 10 --depth 17 --material-surface 12
//!
//! # Home, then three tamps of the configured default increment
//! tamper_cu --config config/tamper.toml -n 3
//!
//! # Print the driver configuration blocks as G-code
//! tamper_cu --config config/tamper.toml --print-gcode
//!
//! # Verbose JSON logs
//! tamper_cu --config config/tamper.toml --depth 5 -v --json
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tamper_common::config::{ConfigLoader, LogLevel};
use tamper_common::tamper::config::TamperConfig;
use tamper_common::tamper::error::TamperError;
use tamper_control_unit::{AxisController, LogSafeStop, StallEventHandler, TampOutcome, stall_channel};
use tamper_hal::drivers::gcode::commands;
use tamper_hal::{SimAxisConfig, SimulatedMotion};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Longest wait for a stalled tamp to be recovered.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tamper Control Unit - sensorless homing and stall-terminated tamping
#[derive(Parser, Debug)]
#[command(name = "tamper_cu")]
#[command(version)]
#[command(about = "Tamper axis controller: sensorless homing, tamping and stall recovery")]
#[command(long_about = None)]
struct Args {
    /// Path to the tamper configuration file
    #[arg(short, long, default_value = "config/tamper.toml")]
    config: PathBuf,

    /// Tamp target depth in mm (can be specified multiple times)
    #[arg(short, long = "depth", action = clap::ArgAction::Append)]
    depths: Vec<f64>,

    /// Tamps by the configured default increment, run after the listed depths
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 0)]
    increments: usize,

    /// Simulated material surface in mm from the reference stop
    #[arg(long, value_name = "MM")]
    material_surface: Option<f64>,

    /// Print the homing and tamping driver configuration as G-code and exit
    #[arg(long)]
    print_gcode: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Tamper control unit failed: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = TamperConfig::load(&args.config);
    setup_tracing(&args, loaded.as_ref().ok().map(|c| c.shared.log_level));
    let config = loaded?;
    config.validate()?;

    if args.print_gcode {
        print_gcode(&config);
        return Ok(());
    }
    if args.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(
        "{} v{} starting with {}",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION"),
        args.config.display()
    );

    let (notifier, rx) = stall_channel();
    let mut geometry = SimAxisConfig::default();
    if let Some(surface) = args.material_surface {
        geometry = geometry.with_material_surface(surface);
    }
    let sim = SimulatedMotion::new(config.axis, geometry).with_event_sink(move |event| {
        notifier.send(event);
    });

    let controller = Arc::new(AxisController::new(&config, sim)?);
    let running = Arc::new(AtomicBool::new(true));
    let handler = StallEventHandler::new(Arc::clone(&controller), rx, LogSafeStop);
    let worker = {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("stall-handler".to_string())
            .spawn(move || handler.run(&running))?
    };

    let result = tamp_cycle(&controller, &args.depths, args.increments);

    running.store(false, Ordering::SeqCst);
    match worker.join() {
        Ok(events) => info!("Handled {} stall events", events),
        Err(_) => error!("Stall handler thread panicked"),
    }

    let status = controller.status();
    info!(
        "Final status: {} at {:.3} mm, last stall {:?}",
        status.state, status.current_position_mm, status.last_stall_detected_at
    );
    result
}

fn tamp_cycle(
    controller: &AxisController<SimulatedMotion>,
    depths: &[f64],
    increments: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.home()?;

    for &depth in depths {
        let result = controller.tamp_default(depth);
        report_tamp(controller, depth, result);
    }

    let step = controller.parameters().tamping.default_increment_mm;
    for _ in 0..increments {
        let depth = controller.status().current_position_mm + step;
        let result = controller.tamp_increment();
        report_tamp(controller, depth, result);
    }
    Ok(())
}

fn report_tamp(
    controller: &AxisController<SimulatedMotion>,
    depth: f64,
    result: Result<TampOutcome, TamperError>,
) {
    match result {
        Ok(TampOutcome::DepthReached) => info!("Tamp to {:.3} mm reached depth", depth),
        Ok(TampOutcome::Stalled) => match controller.wait_settled(SETTLE_TIMEOUT) {
            Some(status) => info!(
                "Tamp to {:.3} mm stalled at {:?} mm, axis {}",
                depth, status.last_stall_detected_at, status.state
            ),
            None => warn!("Stall on tamp to {:.3} mm not recovered within {:?}", depth, SETTLE_TIMEOUT),
        },
        Err(e) => error!("Tamp to {:.3} mm failed: {}", depth, e),
    }
}

fn print_gcode(config: &TamperConfig) {
    let axis = config.axis.axis_letter;
    let steps_per_mm = config.motor.full_steps_per_mm();

    println!("; driver mode");
    println!("{}", commands::stealth_chop(&config.axis));
    println!("; homing");
    for line in commands::config_block(axis, &config.homing.stall, steps_per_mm) {
        println!("{line}");
    }
    println!("; tamping");
    for line in commands::config_block(axis, &config.effective_tamping_stall(), steps_per_mm) {
        println!("{line}");
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.map_or(Level::INFO, |l| l.as_tracing_level())
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
