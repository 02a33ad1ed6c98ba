/// Clip sink module
///
/// Consumers of finished sound clips. The WAV sink stores every clip in its
/// own numbered file.

use crate::detector::SoundClip;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
}

/// Receives finished clips, in the order the detector produced them
#[cfg_attr(test, mockall::automock)]
pub trait ClipSink {
    fn write_clip(&mut self, clip: &SoundClip) -> Result<(), SinkError>;
}

/// Writes each clip as `<dir>/<prefix><n>.wav`, mono 32-bit float
pub struct WavClipSink {
    dir: PathBuf,
    prefix: String,
    sample_rate: u32,
    next_index: u32,
    written: Vec<PathBuf>,
}

impl WavClipSink {
    /// Create a sink writing into `dir`, creating the directory if needed
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        sample_rate: u32,
    ) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        info!("Writing clips to {} at {} Hz", dir.display(), sample_rate);

        Ok(Self {
            dir,
            prefix: prefix.into(),
            sample_rate,
            next_index: 1,
            written: Vec::new(),
        })
    }

    /// Next free file path; numbers taken by existing files are skipped
    fn next_path(&mut self) -> PathBuf {
        loop {
            let path = self
                .dir
                .join(format!("{}{}.wav", self.prefix, self.next_index));
            self.next_index += 1;

            if !path.exists() {
                return path;
            }
        }
    }

    /// Paths of all files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ClipSink for WavClipSink {
    fn write_clip(&mut self, clip: &SoundClip) -> Result<(), SinkError> {
        let path = self.next_path();

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let mut writer = WavWriter::create(&path, spec)?;
        for &sample in &clip.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        debug!("Wrote {} samples to {}", clip.len(), path.display());
        self.written.push(path);

        Ok(())
    }
}
