/// Integration tests for the sound detector
///
/// Tests end-to-end detection with synthetic audio.

use sound_event_detector::{
    drain_to_sink, ClipSink, DetectionPipeline, DetectorConfig, DetectorState, SoundDetector,
    WavClipSink, WavSampleSource,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;

const SAMPLE_RATE: u32 = 16000;

/// Generate synthetic audio tone
fn generate_tone(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Full-wave rectified tone, so every sample of the burst is above a low threshold
fn generate_burst(duration_secs: f32, amplitude: f32) -> Vec<f32> {
    generate_tone(50.0, duration_secs, amplitude)
        .into_iter()
        .map(|s| s.abs().max(amplitude * 0.5))
        .collect()
}

fn generate_silence(duration_secs: f32) -> Vec<f32> {
    vec![0.0; (SAMPLE_RATE as f32 * duration_secs) as usize]
}

fn test_config() -> DetectorConfig {
    DetectorConfig {
        pre_roll_size: 160,  // 10ms
        threshold: 0.2,
        min_samples: 80,     // 5ms
        end_samples: 800,    // 50ms
    }
}

#[test]
fn test_no_false_positives_on_silence() {
    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    let clips: Vec<_> = generate_silence(5.0)
        .into_iter()
        .filter_map(|s| detector.add_sample(s))
        .collect();

    assert!(clips.is_empty());
    assert!(detector.dispose().is_none());
    assert_eq!(detector.stats().samples_processed, 5 * SAMPLE_RATE as u64);
}

#[test]
fn test_quiet_tone_ignored() {
    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    for s in generate_tone(440.0, 1.0, 0.15) {
        assert!(detector.add_sample(s).is_none());
    }

    assert_eq!(detector.state(), DetectorState::WaitingForSound);
}

#[test]
fn test_clicks_rejected_as_noise() {
    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    // Short clicks well below min_samples
    let mut audio = Vec::new();
    for _ in 0..10 {
        audio.extend(vec![0.9; 10]);
        audio.extend(generate_silence(0.01));
    }

    let clips: Vec<_> = audio.into_iter().filter_map(|s| detector.add_sample(s)).collect();

    assert!(clips.is_empty());
    assert_eq!(detector.stats().candidates_rejected, 10);
}

#[test]
fn test_single_burst_detected_with_pre_roll() {
    let config = test_config();
    let mut detector = SoundDetector::new(config.clone()).expect("Failed to create detector");

    let lead_in = generate_silence(0.5);
    let burst = generate_burst(0.2, 0.6);
    let tail = generate_silence(0.5);

    let mut audio = lead_in.clone();
    audio.extend_from_slice(&burst);
    audio.extend_from_slice(&tail);

    let clips: Vec<_> = audio.into_iter().filter_map(|s| detector.add_sample(s)).collect();
    assert_eq!(clips.len(), 1);

    let clip = &clips[0];
    let burst_start = lead_in.len() as u64;

    // Clip starts one pre-roll before the sample that confirmed the burst
    let confirmed_at = burst_start + config.min_samples as u64 - 1;
    assert_eq!(clip.start_sample, confirmed_at - config.pre_roll_size as u64);

    // ...and ends once end_samples quiet samples followed the burst
    assert_eq!(
        clip.end_sample(),
        burst_start + burst.len() as u64 + config.end_samples as u64
    );
    assert_eq!(clip.len() as u64, clip.end_sample() - clip.start_sample);
    assert!(clip.peak() >= 0.59);
}

#[test]
fn test_multiple_bursts() {
    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    let mut audio = Vec::new();
    for _ in 0..3 {
        audio.extend(generate_silence(0.2));
        audio.extend(generate_burst(0.1, 0.5));
    }
    audio.extend(generate_silence(0.2));

    let clips: Vec<_> = audio.into_iter().filter_map(|s| detector.add_sample(s)).collect();

    assert_eq!(clips.len(), 3);
    assert!(clips
        .windows(2)
        .all(|pair| pair[0].end_sample() <= pair[1].start_sample));
}

#[test]
fn test_short_gap_merges_bursts() {
    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    let mut audio = generate_silence(0.1);
    audio.extend(generate_burst(0.1, 0.5));
    audio.extend(generate_silence(0.02)); // shorter than end_samples
    audio.extend(generate_burst(0.1, 0.5));
    audio.extend(generate_silence(0.1));

    let clips: Vec<_> = audio.into_iter().filter_map(|s| detector.add_sample(s)).collect();

    assert_eq!(clips.len(), 1);
    assert!(detector.stats().false_endings >= 1);
}

#[test]
fn test_dispose_flushes_sound_in_progress() {
    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    let mut audio = generate_silence(0.1);
    audio.extend(generate_burst(0.3, 0.5));
    for s in audio {
        assert!(detector.add_sample(s).is_none());
    }
    assert!(detector.is_recording());

    let clip = detector.dispose().expect("partial clip");
    assert_eq!(clip.end_sample(), detector.stats().samples_processed);

    assert!(detector.dispose().is_none());
    assert_eq!(detector.state(), DetectorState::WaitingForSound);
}

#[tokio::test]
async fn test_wav_to_wav_pipeline() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let input_path = tmp.path().join("input.wav");
    let output_dir = tmp.path().join("clips");

    // Write a 16-bit recording with two bursts
    let mut audio = generate_silence(0.2);
    audio.extend(generate_burst(0.1, 0.5));
    audio.extend(generate_silence(0.2));
    audio.extend(generate_burst(0.1, 0.5));
    audio.extend(generate_silence(0.2));

    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&input_path, spec).unwrap();
    for &s in &audio {
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let source = WavSampleSource::open(&input_path).expect("Failed to open input");
    assert_eq!(source.sample_rate(), SAMPLE_RATE);

    let detector = SoundDetector::new(test_config()).expect("Failed to create detector");
    let (mut pipeline, clip_rx) = DetectionPipeline::new(detector, 1);

    let mut sink = WavClipSink::new(&output_dir, "sound", SAMPLE_RATE).unwrap();
    let writer = tokio::task::spawn_blocking(move || {
        drain_to_sink(clip_rx, &mut sink).map(|count| (count, sink))
    });

    // Process audio in chunks (simulate real-time streaming)
    let samples = source.into_samples();
    for chunk in samples.chunks(512) {
        pipeline.push_samples(chunk).await.expect("Failed to process audio");
    }
    let stats = pipeline.finish().await.expect("Failed to finish pipeline");

    let (written, sink) = writer.await.unwrap().unwrap();
    assert_eq!(written, 2);
    assert_eq!(stats.clips_emitted, 2);

    let names: Vec<_> = sink
        .written()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["sound1.wav", "sound2.wav"]);

    let clip = WavSampleSource::open(&sink.written()[0]).expect("Failed to read clip");
    assert_eq!(clip.sample_rate(), SAMPLE_RATE);
    assert!(!clip.is_empty());
}

#[test]
fn test_custom_sink() {
    struct Collect(Vec<usize>);

    impl ClipSink for Collect {
        fn write_clip(
            &mut self,
            clip: &sound_event_detector::SoundClip,
        ) -> Result<(), sound_event_detector::SinkError> {
            self.0.push(clip.len());
            Ok(())
        }
    }

    let mut detector = SoundDetector::new(DetectorConfig {
        pre_roll_size: 2,
        threshold: 0.5,
        min_samples: 1,
        end_samples: 1,
    })
    .unwrap();

    let mut sink = Collect(Vec::new());
    for s in [0.0, 0.0, 0.9, 0.0, 0.9, 0.9, 0.0] {
        if let Some(clip) = detector.add_sample(s) {
            sink.write_clip(&clip).unwrap();
        }
    }

    assert_eq!(sink.0, vec![4, 5]);
}

#[test]
fn test_high_latency_check() {
    use std::time::Instant;

    let mut detector = SoundDetector::new(test_config()).expect("Failed to create detector");

    let mut audio = Vec::new();
    for _ in 0..5 {
        audio.extend(generate_burst(0.5, 0.5));
        audio.extend(generate_silence(0.5));
    }

    let start = Instant::now();
    for s in &audio {
        detector.add_sample(*s);
    }
    let elapsed = start.elapsed();

    println!("Latency test:");
    println!("  Samples: {}", audio.len());
    println!("  Total time: {:?}", elapsed);

    // 5 seconds of audio should take far less than real time
    assert!(elapsed.as_secs_f32() < 1.0, "Processing too slow: {:?}", elapsed);
}
