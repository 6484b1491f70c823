//! mikr-rs - Headless ingestion driver
//!
//! Runs every ingestion phase against an in-memory scene on the main thread,
//! then plays the animation for a while and shuts the producer down.

use anyhow::Context;
use clap::Parser;
use mikr_rs::{
    config::AppConfig,
    ingest::{IngestSession, Phase},
    scene::{NodeKind, SceneArena, WorldMode},
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pace of the playback loop
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Time-varying volume ingestion driver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: platform config directory)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Dataset forwarded to the producer
    #[arg(short = 'd', long = "data", value_name = "FILE")]
    data: Option<PathBuf>,

    /// Producer program to run
    #[arg(short = 'p', long = "program", value_name = "PROGRAM")]
    program: Option<PathBuf>,

    /// Playback rate in timesteps per second (1-60)
    #[arg(long = "fps", value_name = "N")]
    fps: Option<u32>,

    /// One world per timestep instead of one shared world
    #[arg(long = "separate-worlds")]
    separate_worlds: bool,

    /// Play the animation for this many seconds after ingestion
    #[arg(long = "play-seconds", value_name = "S", default_value = "0")]
    play_seconds: f64,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match args.config {
        Some(ref path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default_path()
            .map(AppConfig::load_or_default)
            .unwrap_or_default(),
    };

    if let Some(ref data) = args.data {
        config.producer.data_file = Some(data.clone());
    }
    if let Some(ref program) = args.program {
        config.producer.program = program.clone();
    }
    if let Some(fps) = args.fps {
        config.playback.fps = fps;
    }
    if args.separate_worlds {
        config.playback.world_mode = WorldMode::SeparateWorlds;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mikr_rs=debug"));
    let (file_layer, _guard) = match config.logging.directory {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mikr-rs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    tracing::info!(
        "Starting mikr-rs with producer {:?}",
        config.producer.command_line()
    );

    let mut session = IngestSession::new(&config);
    let mut scene = SceneArena::new();

    for phase in [Phase::Started, Phase::Loaded, Phase::Transferred, Phase::Created] {
        session
            .drive(phase, &mut scene)
            .with_context(|| format!("{} phase failed", phase))?;
    }

    tracing::info!(
        "Ingested {} timesteps into {} volumes",
        session.catalog().len(),
        scene.nodes_of_kind(NodeKind::Volume).len()
    );

    if args.play_seconds > 0.0 {
        let until = Instant::now() + Duration::from_secs_f64(args.play_seconds);
        session.clock_mut().play(Instant::now());
        let mut swaps = 0usize;
        while Instant::now() < until {
            let before = session.clock().current();
            session.pump(&mut scene)?;
            if session.clock().current() != before {
                swaps += 1;
            }
            std::thread::sleep(FRAME_INTERVAL);
        }
        session.clock_mut().stop();
        tracing::info!(
            "Played {} timestep swaps at {} fps",
            swaps,
            session.clock().fps()
        );
    }

    session.reset();
    tracing::info!("Producer stopped");
    Ok(())
}
