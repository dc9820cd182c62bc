//! Powder Sim - headless ski session runner
//!
//! Streams a procedural slope, drops a skier on it, and drives the skier
//! with a scripted pilot for a fixed number of frames.
//!
//! Usage:
//!   powder-sim [--config <powder.toml>] [--seed <n>] [--frames <n>] [--pilot slalom]
//!   powder-sim --print-config > powder.toml

use anyhow::{Context, Result};
use clap::Parser;
use powder_player::{GameConfig, Pilot, SkiApp};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "powder-sim")]
#[command(about = "Powder - run a headless downhill ski session")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Terrain seed, overriding the config file
    #[arg(long)]
    seed: Option<u32>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Scripted input driving the skier
    #[arg(long, value_enum, default_value_t = Pilot::Straight)]
    pilot: Pilot,

    /// Print per-frame telemetry as JSON lines
    #[arg(long)]
    telemetry: bool,

    /// Pace frames against the wall clock instead of a fixed 60 Hz
    #[arg(long)]
    realtime: bool,

    /// Print the resolved config as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GameConfig::from_env().context("Invalid environment overrides")?,
    };
    if let Some(seed) = args.seed {
        config.terrain.seed = seed;
    }
    let seed = config.terrain.seed;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let mut app = SkiApp::new(config).context("Failed to start ski session")?;
    let start = app.session.skier_position().unwrap_or_default();
    tracing::info!("Seed {}, {} chunks resident", seed, app.session.store().len());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let frame_time = 1.0 / 60.0;

    for frame in 0..args.frames {
        args.pilot.drive(frame, &mut app.input);

        let events = if args.realtime {
            std::thread::sleep(Duration::from_secs_f64(frame_time));
            app.tick()
        } else {
            app.frame(frame_time)
        }
        .with_context(|| format!("Frame {} failed", frame))?;

        for event in &events {
            tracing::debug!("frame {}: {:?}", frame, event);
        }
        if args.telemetry {
            if let Some(telemetry) = app.telemetry() {
                serde_json::to_writer(&mut out, telemetry)?;
                writeln!(out)?;
            }
        }
    }

    let end = app.session.skier_position().unwrap_or_default();
    let stats = app.session.stats().clone();

    println!("Seed:        {}", seed);
    println!("Frames:      {} ({:.2} s game time)", app.frames(), app.clock.total_time);
    println!("Travelled:   {:.1} m ({:.1} m downhill)", stats.distance, start.z - end.z);
    println!("Chunks:      {} resident", app.session.store().len());
    println!("Props:       {} resident", app.session.store().prop_count());
    println!("Jumps:       {}", stats.jumps);
    println!("Boosts:      {}", stats.boosts);
    println!("Impacts:     {} (peak {:.0} N)", stats.impacts, stats.peak_impact);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    app.shutdown().context("Failed to shut down session")?;
    Ok(())
}
