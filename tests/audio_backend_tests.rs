// Tests for the capture backend abstractions
//
// These exercise the frame and config types, input selection, and the
// file-backed source end to end.

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use live_voice::audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, FileBackend};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_audio_frame_duration() {
    // 100ms at the 24kHz output rate
    let frame = AudioFrame::new(vec![0i16; 2400], 24000);

    assert!((frame.duration_secs() - 0.1).abs() < 1e-9);
    assert!(!frame.is_empty());
    assert!(AudioFrame::new(Vec::new(), 24000).is_empty());
}

#[test]
fn test_audio_frame_from_pcm_bytes() {
    let frame = AudioFrame::from_pcm_bytes(&[0x00, 0x80, 0xff, 0x7f, 0x01], 16000);

    // The dangling odd byte is ignored
    assert_eq!(frame.samples, vec![i16::MIN, i16::MAX]);
    assert_eq!(frame.to_pcm_bytes(), vec![0x00, 0x80, 0xff, 0x7f]);
    assert_eq!(frame.to_float()[0], -1.0);
}

#[test]
fn test_audio_backend_config_default() {
    let config = AudioBackendConfig::default();

    assert_eq!(config.sample_rate, 16000);
    assert_eq!(config.frame_size, 2048);
    assert_eq!(config.frame_duration(), Duration::from_millis(128));
}

#[test]
fn test_audio_source_from_cli_string() {
    assert_eq!("mic".parse::<AudioSource>().unwrap(), AudioSource::Microphone);
    assert_eq!(
        "file:/tmp/prompt.wav".parse::<AudioSource>().unwrap(),
        AudioSource::File(PathBuf::from("/tmp/prompt.wav"))
    );
    assert!("speaker".parse::<AudioSource>().is_err());
    assert!("file:".parse::<AudioSource>().is_err());
}

#[test]
fn test_audio_source_serde_as_string() -> Result<()> {
    let source: AudioSource = serde_json::from_str("\"file:input.wav\"")?;
    assert_eq!(source, AudioSource::File(PathBuf::from("input.wav")));
    assert_eq!(serde_json::to_string(&AudioSource::Microphone)?, "\"microphone\"");
    Ok(())
}

#[test]
fn test_factory_rejects_zero_frame_size() {
    let config = AudioBackendConfig {
        sample_rate: 16000,
        frame_size: 0,
    };

    let result = AudioBackendFactory::create(AudioSource::File(PathBuf::from("x.wav")), config);
    assert!(result.is_err());
}

#[cfg(not(feature = "microphone"))]
#[test]
fn test_factory_microphone_requires_feature() {
    let result = AudioBackendFactory::create(AudioSource::Microphone, AudioBackendConfig::default());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_file_backend_streams_padded_blocks() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("prompt.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    for _ in 0..400 {
        writer.write_sample(16384i16)?;
    }
    writer.finalize()?;

    let config = AudioBackendConfig {
        sample_rate: 16000,
        frame_size: 160,
    };
    let mut backend = FileBackend::new(path, config)?;
    let mut rx = backend.start().await?;
    assert!(backend.is_capturing());
    assert!(backend.start().await.is_err(), "Second start should fail");

    let mut blocks = Vec::new();
    while let Some(block) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await? {
        blocks.push(block);
    }

    assert_eq!(blocks.len(), 3);
    assert!(blocks.iter().all(|b| b.samples.len() == 160));
    assert_eq!(blocks[1].timestamp_ms, 10);
    assert!((blocks[0].samples[0] - 0.5).abs() < 1e-6);
    // 400 = 160 + 160 + 80, the tail is zero-padded
    assert!((blocks[2].samples[79] - 0.5).abs() < 1e-6);
    assert_eq!(blocks[2].samples[80], 0.0);

    backend.stop().await?;
    assert!(!backend.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_file_backend_missing_file_fails_on_start() -> Result<()> {
    let mut backend = FileBackend::new(PathBuf::from("/nonexistent/prompt.wav"), AudioBackendConfig::default())?;

    assert!(backend.start().await.is_err());
    assert!(!backend.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_file_backend_timestamps_follow_sample_offset() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("long-blocks.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    for _ in 0..5000 {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    // 1000 samples at 16kHz is 62.5ms per block
    let config = AudioBackendConfig {
        sample_rate: 16000,
        frame_size: 1000,
    };
    let mut backend = FileBackend::new(path, config)?;
    let mut rx = backend.start().await?;

    let mut timestamps = Vec::new();
    while let Some(block) = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await? {
        timestamps.push(block.timestamp_ms);
    }

    assert_eq!(timestamps, vec![0, 62, 125, 187, 250]);
    Ok(())
}
