/// Sound detection service binary
///
/// Reads a mono WAV recording, detects interesting sounds in it and writes
/// each one to its own WAV file.

use anyhow::Context;
use clap::Parser;
use sound_event_detector::{
    run_with_sink, DetectionPipeline, ServiceConfig, SoundDetector, WavClipSink, WavSampleSource,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sound-detector-service")]
#[command(about = "Detects interesting sounds in a recording", long_about = None)]
struct Cli {
    /// Mono WAV file to scan
    input: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the clip files (overrides the configuration)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Sound detection failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sound_event_detector=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting sound detection service");

    let mut config = ServiceConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let source = WavSampleSource::open(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let sample_rate = source.sample_rate();
    info!(
        "Scanning {:.1}s of audio from {}",
        source.duration_secs(),
        cli.input.display()
    );

    let detector = SoundDetector::new(config.detector.clone())?;
    let (pipeline, clip_rx) = DetectionPipeline::new(detector, config.clip_queue_size);

    let sink = WavClipSink::new(&config.output_dir, config.file_prefix.clone(), sample_rate)
        .context("preparing output directory")?;

    // Process in chunks (simulates a live capture callback)
    let samples = source.into_samples();
    let report = run_with_sink(pipeline, clip_rx, &samples, config.chunk_size, sink)
        .await
        .context("processing audio")?;

    for path in report.sink.written() {
        info!("Clip saved: {}", path.display());
    }

    let stats = report.stats;
    let written = report.clips_written;
    info!(
        "Done: {} samples, {} clips written, {} noise candidates rejected, {} false endings",
        stats.samples_processed, written, stats.candidates_rejected, stats.false_endings
    );

    Ok(())
}
