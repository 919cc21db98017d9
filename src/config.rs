use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::audio::AudioSource;
use crate::interrupt::DEFAULT_THRESHOLD;
use crate::session::SessionConfig;

/// Accepted range for samples per captured frame
pub const FRAME_SIZE_RANGE: std::ops::RangeInclusive<usize> = 256..=16384;

/// Environment variable prefix (`LIVE_VOICE__SESSION__VOICE=Puck`)
pub const ENV_PREFIX: &str = "LIVE_VOICE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionSettings,
    pub audio: AudioConfig,
    pub interruption: InterruptionConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub url: String,
    pub voice: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws".to_string(),
            voice: "Zephyr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub frame_size: usize,
    pub input: AudioSource,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_size: 2048,
            input: AudioSource::Microphone,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterruptionConfig {
    pub threshold: f32,
}

impl Default for InterruptionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

impl Config {
    /// Load from an optional file (any format the `config` crate knows)
    /// layered under `LIVE_VOICE__*` environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.voice.trim().is_empty() {
            bail!("session.voice must not be empty");
        }
        if self.audio.input_sample_rate == 0 || self.audio.output_sample_rate == 0 {
            bail!("audio sample rates must be greater than zero");
        }
        if !FRAME_SIZE_RANGE.contains(&self.audio.frame_size) {
            bail!(
                "audio.frame_size must be between {} and {} (got {})",
                FRAME_SIZE_RANGE.start(),
                FRAME_SIZE_RANGE.end(),
                self.audio.frame_size
            );
        }
        let threshold = self.interruption.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            bail!("interruption.threshold must be in (0, 1] (got {})", threshold);
        }
        Ok(())
    }

    /// Settings for a new session
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            url: self.session.url.clone(),
            voice: self.session.voice.clone(),
            input: self.audio.input.clone(),
            input_sample_rate: self.audio.input_sample_rate,
            output_sample_rate: self.audio.output_sample_rate,
            frame_size: self.audio.frame_size,
            interruption_threshold: self.interruption.threshold,
            ..SessionConfig::default()
        }
    }
}
