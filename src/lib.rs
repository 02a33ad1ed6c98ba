/// Sound event detector library
///
/// This library turns a stream of audio samples into discrete "interesting
/// sound" clips using a pre-roll buffer and a debounced state machine, with
/// WAV input/output and an async clip pipeline around it.

pub mod config;
pub mod detector;
pub mod pipeline;
pub mod pre_roll;
pub mod sink;
pub mod source;

// Re-export main types
pub use config::{ConfigError, ServiceConfig};
pub use detector::{
    DetectorConfig, DetectorError, DetectorState, DetectorStats, SoundClip, SoundDetector,
};
pub use pipeline::{drain_to_sink, run_with_sink, DetectionPipeline, PipelineError, PipelineReport};
pub use pre_roll::PreRoll;
pub use sink::{ClipSink, SinkError, WavClipSink};
pub use source::{pcm16_to_f32, SourceError, WavSampleSource};
