/// Detection pipeline module
///
/// Runs a detector over chunks of incoming audio and hands finished clips to
/// a bounded channel, so the consumer never runs on the producer's thread.

use crate::detector::{DetectorError, DetectorStats, SoundClip, SoundDetector};
use crate::sink::{ClipSink, SinkError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Default number of finished clips buffered before the producer waits
pub const DEFAULT_CLIP_QUEUE: usize = 16;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Clip sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Clip writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

/// Outcome of a complete run through [`run_with_sink`]
#[derive(Debug)]
pub struct PipelineReport<S> {
    pub stats: DetectorStats,
    pub clips_written: usize,
    pub sink: S,
}

/// Producer half of the pipeline
pub struct DetectionPipeline {
    detector: SoundDetector,
    clip_tx: mpsc::Sender<SoundClip>,
}

impl DetectionPipeline {
    /// Create a pipeline and the receiver its clips are delivered to
    pub fn new(
        detector: SoundDetector,
        queue_size: usize,
    ) -> (Self, mpsc::Receiver<SoundClip>) {
        let (clip_tx, clip_rx) = mpsc::channel(queue_size.max(1));
        (Self { detector, clip_tx }, clip_rx)
    }

    /// Feed a chunk of samples, forwarding every finished clip in order
    pub async fn push_samples(&mut self, samples: &[f32]) -> Result<(), DetectorError> {
        trace!("Processing chunk of {} samples", samples.len());

        for &sample in samples {
            if let Some(clip) = self.detector.add_sample(sample) {
                self.send(clip).await?;
            }
        }

        Ok(())
    }

    /// Flush a sound in progress, close the channel and return final statistics
    pub async fn finish(mut self) -> Result<DetectorStats, DetectorError> {
        if let Some(clip) = self.detector.dispose() {
            self.send(clip).await?;
        }

        let stats = self.detector.stats();
        info!(
            "Pipeline finished: {} samples processed, {} clips",
            stats.samples_processed, stats.clips_emitted
        );

        Ok(stats)
    }

    async fn send(&self, clip: SoundClip) -> Result<(), DetectorError> {
        self.clip_tx.send(clip).await.map_err(|_| {
            error!("Clip receiver dropped");
            DetectorError::ChannelClosed
        })
    }

    pub fn detector(&self) -> &SoundDetector {
        &self.detector
    }
}

/// Write every received clip to `sink` until the pipeline is finished.
///
/// Blocks the current thread; run it under `tokio::task::spawn_blocking`.
/// Returns the number of clips written.
pub fn drain_to_sink<S: ClipSink>(
    mut clip_rx: mpsc::Receiver<SoundClip>,
    sink: &mut S,
) -> Result<usize, SinkError> {
    let mut written = 0;

    while let Some(clip) = clip_rx.blocking_recv() {
        sink.write_clip(&clip)?;
        written += 1;
        debug!("Clip {} delivered to sink", written);
    }

    Ok(written)
}

/// Feed `samples` through the pipeline in chunks while a blocking task writes
/// the clips to `sink`.
///
/// The writer is always awaited, so a sink failure is reported as
/// [`PipelineError::Sink`] rather than as the closed channel it causes.
pub async fn run_with_sink<S>(
    mut pipeline: DetectionPipeline,
    clip_rx: mpsc::Receiver<SoundClip>,
    samples: &[f32],
    chunk_size: usize,
    mut sink: S,
) -> Result<PipelineReport<S>, PipelineError>
where
    S: ClipSink + Send + 'static,
{
    let writer = tokio::task::spawn_blocking(move || {
        drain_to_sink(clip_rx, &mut sink).map(|count| (count, sink))
    });

    // Dropping the pipeline on error closes the channel, so the writer always ends
    let fed: Result<DetectorStats, DetectorError> = async move {
        for chunk in samples.chunks(chunk_size.max(1)) {
            pipeline.push_samples(chunk).await?;
        }
        pipeline.finish().await
    }
    .await;

    let (clips_written, sink) = writer.await?.map_err(|e| {
        warn!("Clip sink failed: {}", e);
        e
    })?;
    let stats = fed?;

    Ok(PipelineReport {
        stats,
        clips_written,
        sink,
    })
}
