/// Sample source module
///
/// Reads mono WAV input and normalizes it to `f32` samples for the detector.

use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("WAV decoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported channel count: {0} (only mono input is supported)")]
    UnsupportedChannels(u16),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Convert a 16-bit PCM sample to the normalized `[-1.0, 1.0)` range
#[inline]
pub fn pcm16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Mono WAV input, decoded into normalized samples
pub struct WavSampleSource {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl WavSampleSource {
    /// Open and decode a WAV file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let source = Self::from_reader(reader)?;

        info!(
            "Loaded {}: {} samples at {} Hz",
            path.display(),
            source.samples.len(),
            source.sample_rate
        );

        Ok(source)
    }

    /// Decode from an already opened WAV reader
    pub fn from_reader<R: Read>(mut reader: WavReader<R>) -> Result<Self, SourceError> {
        let spec = reader.spec();
        debug!("WAV spec: {:?}", spec);

        if spec.channels != 1 {
            return Err(SourceError::UnsupportedChannels(spec.channels));
        }

        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            (SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .map(|s| s.map(pcm16_to_f32))
                .collect::<Result<Vec<_>, _>>()?,
            (SampleFormat::Int, bits @ (24 | 32)) => {
                let scale = (1_i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (format, bits) => {
                return Err(SourceError::UnsupportedFormat(format!(
                    "{:?} with {} bits per sample",
                    format, bits
                )))
            }
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get duration of the decoded audio (in seconds)
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
