//! Water meter simulator CLI
//!
//! Runs the meter on the wall clock until Ctrl-C (or `--duration`), or on a
//! virtual clock for `--virtual SECS` and prints a summary.

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use watermeter_env::{MeterContext, TokioContext};
use watermeter_sim::config::DEFAULT_CONFIG_PATH;
use watermeter_sim::{
    ConfigProvider, FileConfig, FrameRecorder, LogDisplay, MeterService, Scheduler, SimContext,
    SimExport, SinkChain, SnapshotRecorder, VirtualRunner,
};

/// Water meter simulator
#[derive(Parser, Debug)]
#[command(name = "watermeter-sim")]
#[command(about = "Simulate a household water meter with supply outages", long_about = None)]
struct Args {
    /// Configuration file (reloaded while running)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Seed for the outage random stream
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run SECS of virtual time and exit
    #[arg(long = "virtual", value_name = "SECS")]
    virtual_secs: Option<f64>,

    /// Stop the realtime run after SECS
    #[arg(short, long, value_name = "SECS")]
    duration: Option<f64>,

    /// Directory for per-cubic-metre JSON snapshots
    #[arg(long, value_name = "DIR")]
    snapshots: Option<PathBuf>,

    /// Export published readings to a JSON file (virtual mode)
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Append logs to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary for virtual runs
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("Water meter simulator v{}", env!("CARGO_PKG_VERSION"));

    let config: Arc<dyn ConfigProvider> = Arc::new(
        FileConfig::load(&args.config)
            .with_context(|| format!("loading configuration from {}", args.config.display()))?,
    );

    let mut sinks = SinkChain::new().with(Box::new(LogDisplay::new()));
    if let Some(dir) = &args.snapshots {
        sinks.push(Box::new(SnapshotRecorder::new(dir.clone())));
    }

    match args.virtual_secs {
        Some(secs) => run_virtual(&args, secs, config, sinks),
        None => run_realtime(&args, config, sinks).await,
    }
}

fn run_virtual(
    args: &Args,
    secs: f64,
    config: Arc<dyn ConfigProvider>,
    mut sinks: SinkChain,
) -> anyhow::Result<()> {
    let duration = Duration::try_from_secs_f64(secs)
        .context("--virtual expects a non-negative number of seconds")?;
    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    });
    info!(seed, "Running {:.1} s of virtual time", secs);

    let (recorder, frames) = FrameRecorder::create();
    sinks.push(Box::new(recorder));

    let service = MeterService::new(SimContext::shared(seed), config, Box::new(sinks))?;
    let summary = VirtualRunner::new(Arc::new(service)).run(duration);

    if let Some(path) = &args.export {
        let mut export = SimExport::new(seed);
        for frame in frames.frames() {
            export.add_frame(frame);
        }
        export.finalize(summary.final_time_secs, summary.outage_episodes);
        match export.write_to_file(path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path.display()),
            Err(e) => error!("Failed to write export: {}", e),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!(
            seed = summary.seed,
            ticks = summary.total_ticks,
            failed_ticks = summary.failed_ticks,
            published = summary.published,
            outage_episodes = summary.outage_episodes,
            "Final volume = {:.4} m³ | Pressure = {:.2} bar",
            summary.final_reading.volume_m3,
            summary.final_reading.pressure_bar
        );
    }
    Ok(())
}

async fn run_realtime(
    args: &Args,
    config: Arc<dyn ConfigProvider>,
    sinks: SinkChain,
) -> anyhow::Result<()> {
    let context = args
        .seed
        .map_or_else(TokioContext::shared, |seed| Arc::new(TokioContext::with_seed(seed)));

    let service = Arc::new(MeterService::new(Arc::clone(&context), config, Box::new(sinks))?);
    let handle = Scheduler::new(Arc::clone(&service)).start();

    match args.duration {
        Some(secs) => {
            let limit = Duration::try_from_secs_f64(secs)
                .context("--duration expects a non-negative number of seconds")?;
            tokio::select! {
                _ = context.sleep(limit) => {}
                signal = tokio::signal::ctrl_c() => signal?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    handle.shutdown();
    let (reading, state) = service.reading();
    info!(
        ticks = service.tick_count(),
        outage_episodes = service.outage_episodes(),
        state = ?state,
        "Stopped. Volume = {:.4} m³ | Pressure = {:.2} bar",
        reading.volume_m3,
        reading.pressure_bar
    );
    Ok(())
}
