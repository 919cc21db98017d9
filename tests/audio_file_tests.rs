// Integration tests for WAV file loading
//
// Fixtures are written on the fly with hound into a temp directory.

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use live_voice::audio::AudioFile;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_wav_i16(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tone.wav");
    write_wav_i16(&path, 16000, 1, &vec![8192; 1600])?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 1600);
    assert!((audio.duration_seconds - 0.1).abs() < 1e-9);
    assert!(audio.path.contains("tone.wav"));
    assert!((audio.samples[0] - 0.25).abs() < 1e-6);

    Ok(())
}

#[test]
fn test_audio_file_stereo_downmix() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    // L = 0.5, R = 0.0 for 100 frames
    let interleaved: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { 16384 } else { 0 }).collect();
    write_wav_i16(&path, 16000, 2, &interleaved)?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.channels, 2);
    assert!((audio.duration_seconds - 100.0 / 16000.0).abs() < 1e-9);

    let mono = audio.to_mono(16000);
    assert_eq!(mono.len(), 100);
    assert!(mono.iter().all(|s| (s - 0.25).abs() < 1e-6));

    Ok(())
}

#[test]
fn test_audio_file_resampled_to_pipeline_rate() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("hifi.wav");
    write_wav_i16(&path, 48000, 1, &vec![0; 4800])?;

    let audio = AudioFile::open(&path)?;
    let mono = audio.to_mono(16000);

    assert_eq!(mono.len(), 1600);

    Ok(())
}

#[test]
fn test_audio_file_float_samples() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("float.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 24000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    for s in [0.5f32, -0.5, 0.125] {
        writer.write_sample(s)?;
    }
    writer.finalize()?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.samples, vec![0.5, -0.5, 0.125]);

    Ok(())
}

#[test]
fn test_audio_file_unsupported_encoding() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("eight-bit.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    writer.write_sample(10i8)?;
    writer.finalize()?;

    assert!(AudioFile::open(&path).is_err());

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}
