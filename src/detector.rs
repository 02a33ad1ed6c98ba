/// Sound detector main module
///
/// Turns a stream of scalar samples into discrete "interesting sound" clips.
/// A sound has to stay above the threshold for `min_samples` consecutive
/// samples before it is trusted, and below it for `end_samples` consecutive
/// samples before it is considered over. Each clip is back-filled with the
/// pre-roll so the attack of the sound is not lost.

use crate::pre_roll::PreRoll;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Default pre-roll length: 100ms at 44.1kHz
pub const DEFAULT_PRE_ROLL_SIZE: usize = 4410;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// A finished interesting sound
#[derive(Debug, Clone, PartialEq)]
pub struct SoundClip {
    /// Samples of the sound, pre-roll first
    pub samples: Vec<f32>,

    /// Stream index of the first sample in `samples`
    pub start_sample: u64,
}

impl SoundClip {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Stream index one past the last sample of the clip
    pub fn end_sample(&self) -> u64 {
        self.start_sample + self.samples.len() as u64
    }

    /// Clip duration at the given sample rate
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.samples.len() as f32 / sample_rate as f32
    }

    /// Largest absolute amplitude in the clip
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}

/// Configuration for the sound detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of samples kept as pre-roll context
    pub pre_roll_size: usize,

    /// Samples strictly above this value are loud
    pub threshold: f32,

    /// Consecutive loud samples needed to confirm a sound (values below 1 act as 1)
    pub min_samples: usize,

    /// Consecutive quiet samples needed to end a sound (values below 1 act as 1).
    ///
    /// At 1 the first quiet sample ends the sound on arrival instead of
    /// passing through `ConfirmingEnd`, mirroring how `min_samples` of 1
    /// skips `ConfirmingSound`.
    pub end_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            pre_roll_size: DEFAULT_PRE_ROLL_SIZE,
            threshold: 0.1,     // -20 dBFS
            min_samples: 441,   // 10ms at 44.1kHz
            end_samples: 22050, // 500ms at 44.1kHz
        }
    }
}

impl DetectorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.pre_roll_size == 0 {
            return Err(DetectorError::InvalidConfig(
                "pre_roll_size must be greater than 0".to_string(),
            ));
        }

        if !self.threshold.is_finite() {
            return Err(DetectorError::InvalidConfig(format!(
                "threshold must be a finite number, got {}",
                self.threshold
            )));
        }

        Ok(())
    }
}

/// Detector state machine
///
/// The confirming states carry their own countdown, so a stale count can
/// never leak into another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Nothing interesting is happening
    WaitingForSound,

    /// Loud samples seen, waiting for `remaining` more before trusting them
    ConfirmingSound { remaining: usize },

    /// Recording a confirmed sound
    RecordingSound,

    /// Quiet samples seen, waiting for `remaining` more before ending the sound
    ConfirmingEnd { remaining: usize },
}

/// Detector statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorStats {
    pub samples_processed: u64,
    pub clips_emitted: u64,
    /// Loud runs dropped before reaching `min_samples`
    pub candidates_rejected: u64,
    /// Dips below the threshold that did not end a sound
    pub false_endings: u64,
    pub pre_roll_fill: usize,
}

/// Streaming sound-event detector
///
/// Not internally synchronized: callers feeding it from an audio callback
/// must serialize access themselves.
pub struct SoundDetector {
    config: DetectorConfig,
    state: DetectorState,
    pre_roll: PreRoll,
    capture: Vec<f32>,
    capture_start: u64,
    stats: DetectorStats,
}

impl SoundDetector {
    /// Create a new detector from a validated configuration
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;

        info!(
            "Initializing sound detector: threshold={}, min_samples={}, end_samples={}, pre_roll={}",
            config.threshold, config.min_samples, config.end_samples, config.pre_roll_size
        );

        Ok(Self {
            pre_roll: PreRoll::with_capacity(config.pre_roll_size),
            config,
            state: DetectorState::WaitingForSound,
            capture: Vec::new(),
            capture_start: 0,
            stats: DetectorStats::default(),
        })
    }

    /// Process the next sample of the stream.
    ///
    /// Returns the finished clip when this sample confirms the end of a sound.
    pub fn add_sample(&mut self, sample: f32) -> Option<SoundClip> {
        let index = self.stats.samples_processed;
        self.stats.samples_processed += 1;

        let loud = sample > self.config.threshold;
        let mut finished = None;

        self.state = match self.state {
            DetectorState::WaitingForSound if loud => {
                let remaining = self.config.min_samples.saturating_sub(1);
                if remaining == 0 {
                    self.begin_recording(sample, index);
                    DetectorState::RecordingSound
                } else {
                    trace!("Loud sample at {}, confirming sound", index);
                    DetectorState::ConfirmingSound { remaining }
                }
            }

            DetectorState::WaitingForSound => DetectorState::WaitingForSound,

            DetectorState::ConfirmingSound { remaining } if loud => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.begin_recording(sample, index);
                    DetectorState::RecordingSound
                } else {
                    DetectorState::ConfirmingSound { remaining }
                }
            }

            DetectorState::ConfirmingSound { .. } => {
                self.stats.candidates_rejected += 1;
                debug!("State: ConfirmingSound -> WaitingForSound (noise at {})", index);
                DetectorState::WaitingForSound
            }

            DetectorState::RecordingSound => {
                self.capture.push(sample);

                if loud {
                    DetectorState::RecordingSound
                } else {
                    let remaining = self.config.end_samples.saturating_sub(1);
                    if remaining == 0 {
                        finished = Some(self.finish_sound());
                        DetectorState::WaitingForSound
                    } else {
                        debug!("State: RecordingSound -> ConfirmingEnd");
                        DetectorState::ConfirmingEnd { remaining }
                    }
                }
            }

            DetectorState::ConfirmingEnd { remaining } => {
                self.capture.push(sample);

                if loud {
                    self.stats.false_endings += 1;
                    debug!("State: ConfirmingEnd -> RecordingSound (continued)");
                    DetectorState::RecordingSound
                } else {
                    let remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        finished = Some(self.finish_sound());
                        DetectorState::WaitingForSound
                    } else {
                        DetectorState::ConfirmingEnd { remaining }
                    }
                }
            }
        };

        // The pre-roll is read before this sample lands in it
        self.pre_roll.push(sample);

        finished
    }

    /// Seed the capture with the pre-roll followed by the confirming sample
    fn begin_recording(&mut self, sample: f32, index: u64) {
        self.capture.clear();
        self.capture.reserve(self.pre_roll.len() + 1);
        self.capture.extend(self.pre_roll.iter());
        self.capture.push(sample);
        self.capture_start = index - self.pre_roll.len() as u64;

        debug!(
            "State: -> RecordingSound at sample {} ({} samples of pre-roll)",
            index,
            self.pre_roll.len()
        );
    }

    fn finish_sound(&mut self) -> SoundClip {
        let clip = SoundClip {
            samples: std::mem::take(&mut self.capture),
            start_sample: self.capture_start,
        };
        self.stats.clips_emitted += 1;

        info!(
            "Interesting sound finished: samples {}..{} ({} samples)",
            clip.start_sample,
            clip.end_sample(),
            clip.len()
        );

        clip
    }

    /// Finish any sound in progress and reset to the initial state.
    ///
    /// Returns the partial clip if a sound was being recorded. Parameters are
    /// kept, so the detector can be reused afterwards.
    pub fn dispose(&mut self) -> Option<SoundClip> {
        let finished = match self.state {
            DetectorState::WaitingForSound | DetectorState::ConfirmingSound { .. } => None,
            DetectorState::RecordingSound | DetectorState::ConfirmingEnd { .. } => {
                Some(self.finish_sound())
            }
        };

        self.state = DetectorState::WaitingForSound;
        self.pre_roll.clear();
        debug!("Detector reset to initial state");

        finished
    }

    /// Reallocate the pre-roll with a new capacity.
    ///
    /// The most recent samples that fit are kept in order. A sound being
    /// recorded is not affected.
    pub fn resize_pre_roll(&mut self, pre_roll_size: usize) -> Result<(), DetectorError> {
        if pre_roll_size == 0 {
            return Err(DetectorError::InvalidConfig(
                "pre_roll_size must be greater than 0".to_string(),
            ));
        }

        self.pre_roll.resize(pre_roll_size);
        self.config.pre_roll_size = pre_roll_size;
        Ok(())
    }

    /// Change the loudness threshold; non-finite values are rejected
    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), DetectorError> {
        if !threshold.is_finite() {
            warn!("Ignoring non-finite threshold: {}", threshold);
            return Err(DetectorError::InvalidConfig(format!(
                "threshold must be a finite number, got {}",
                threshold
            )));
        }

        self.config.threshold = threshold;
        Ok(())
    }

    pub fn set_min_samples(&mut self, min_samples: usize) {
        self.config.min_samples = min_samples;
    }

    pub fn set_end_samples(&mut self, end_samples: usize) {
        self.config.end_samples = end_samples;
    }

    /// Get current configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Get current detector state
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Check if a confirmed sound is being captured
    pub fn is_recording(&self) -> bool {
        matches!(
            self.state,
            DetectorState::RecordingSound | DetectorState::ConfirmingEnd { .. }
        )
    }

    /// Copy of the pre-roll contents, oldest first
    pub fn pre_roll_snapshot(&self) -> Vec<f32> {
        self.pre_roll.snapshot()
    }

    /// Get current statistics
    pub fn stats(&self) -> DetectorStats {
        DetectorStats {
            pre_roll_fill: self.pre_roll.len(),
            ..self.stats.clone()
        }
    }
}
