// Live microphone backend using cpal
//
// cpal streams are not Send, so the stream lives on a dedicated thread that
// owns it until `stop` is called. The device callback downmixes to mono,
// resamples to the pipeline rate and slices the result into fixed-size
// blocks for the capture pipeline.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{downmix_to_mono, resample_linear, AudioBackend, AudioBackendConfig, CaptureBlock};

/// Microphone capture through the default input device
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            thread: None,
        }
    }
}

/// Accumulates resampled audio and emits fixed-size blocks
struct BlockAssembler {
    pending: Vec<f32>,
    frame_size: usize,
    started: Instant,
    tx: mpsc::Sender<CaptureBlock>,
}

impl BlockAssembler {
    fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.frame_size {
            let block: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            let frame = CaptureBlock {
                samples: block,
                timestamp_ms: self.started.elapsed().as_millis() as u64,
            };
            // Blocks are time-sensitive; drop rather than queue when the consumer lags
            if self.tx.try_send(frame).is_err() {
                debug!("Capture queue full; dropping microphone block");
            }
        }
    }
}

fn open_stream(
    config: &AudioBackendConfig,
    tx: mpsc::Sender<CaptureBlock>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default input device available")?;
    let default_config = device
        .default_input_config()
        .context("Failed to query input device configuration")?;

    let format = default_config.sample_format();
    let stream_config: StreamConfig = default_config.into();
    let device_rate = stream_config.sample_rate.0;
    let channels = usize::from(stream_config.channels.max(1));
    let target_rate = config.sample_rate;

    info!(
        "Microphone: {} ({:?}, {}Hz, {} channels)",
        device.name().unwrap_or_else(|_| "unknown device".to_string()),
        format,
        device_rate,
        channels
    );

    let mut assembler = BlockAssembler {
        pending: Vec::with_capacity(config.frame_size * 2),
        frame_size: config.frame_size,
        started: Instant::now(),
        tx,
    };

    let mut deliver = move |interleaved: Vec<f32>| {
        let mono = downmix_to_mono(&interleaved, channels);
        let resampled = resample_linear(&mono, device_rate, target_rate);
        assembler.push(&resampled);
    };

    let err_fn = |err| warn!("Microphone stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| deliver(data.to_vec()),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| deliver(data.iter().map(|&s| s as f32 / 32768.0).collect()),
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                deliver(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).collect())
            },
            err_fn,
            None,
        )?,
        other => bail!("Unsupported microphone sample format: {:?}", other),
    };

    stream.play().context("Failed to start microphone stream")?;
    Ok(stream)
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBlock>> {
        if self.thread.is_some() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<()>>(1);
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || {
                let stream = match open_stream(&config, tx) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Hold the stream until asked to stop (or the backend is dropped)
                let _ = stop_rx.recv();
                if let Err(e) = stream.pause() {
                    debug!("Failed to pause microphone stream: {}", e);
                }
                drop(stream);
                info!("Microphone released");
            })
            .context("Failed to spawn microphone thread")?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Microphone startup task failed")?
            .map_err(|_| anyhow!("Microphone thread exited during startup"))?;

        if let Err(e) = ready {
            let _ = thread.join();
            return Err(e.context("Microphone unavailable (check input permissions)"));
        }

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        info!("Microphone capture started");

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("Microphone shutdown task failed")?
                .map_err(|_| anyhow!("Microphone thread panicked"))?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}
