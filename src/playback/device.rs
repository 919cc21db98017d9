// Speaker output through cpal
//
// The cpal stream is not Send, so it lives on its own thread until the sink
// is closed. The device callback pulls from a shared `Mixer`, whose rendered
// frame count is the output clock, and posts `PlaybackEnded` for buffers
// that finish naturally. Stopped buffers are removed from the mixer first and
// never complete.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::mixer::Mixer;
use super::scheduler::{EntryId, OutputSink, PlaybackEntry};
use crate::audio::backend::resample_linear;
use crate::session::SessionEvent;

/// Output sink rendering to the default output device
pub struct DeviceSink {
    mixer: Arc<Mutex<Mixer>>,
    /// Rate of the buffers handed to `schedule`
    source_rate: u32,
    stop_tx: Option<std_mpsc::Sender<()>>,
}

impl DeviceSink {
    /// Open the default output device and start its stream
    pub async fn open(source_rate: u32, events: mpsc::UnboundedSender<SessionEvent>) -> Result<Self> {
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<Arc<Mutex<Mixer>>>>(1);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("speaker".to_string())
            .spawn(move || {
                let (stream, mixer) = match open_stream(events) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(mixer));

                // Keep the stream alive until closed (or the sink is dropped)
                let _ = stop_rx.recv();
                drop(stream);
                info!("Speaker released");
            })
            .context("Failed to spawn speaker thread")?;

        let mixer = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Speaker startup task failed")?
            .map_err(|_| anyhow!("Speaker thread exited during startup"))?
            .context("Audio output unavailable")?;

        Ok(Self {
            mixer,
            source_rate,
            stop_tx: Some(stop_tx),
        })
    }
}

/// Device-callback side of the mixer
struct Renderer {
    mixer: Arc<Mutex<Mixer>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    channels: usize,
    scratch: Vec<f32>,
}

impl Renderer {
    /// Render `len` interleaved samples and report finished buffers
    fn render(&mut self, len: usize) -> &[f32] {
        self.scratch.clear();
        self.scratch.resize(len, 0.0);
        let finished = match self.mixer.lock() {
            Ok(mut mixer) => mixer.render(&mut self.scratch, self.channels),
            Err(_) => Vec::new(),
        };
        for id in finished {
            let _ = self.events.send(SessionEvent::PlaybackEnded(id));
        }
        &self.scratch
    }
}

fn open_stream(events: mpsc::UnboundedSender<SessionEvent>) -> Result<(cpal::Stream, Arc<Mutex<Mixer>>)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No default output device available")?;
    let default_config = device
        .default_output_config()
        .context("Failed to query output device configuration")?;

    let format = default_config.sample_format();
    let stream_config: StreamConfig = default_config.into();
    let channels = usize::from(stream_config.channels.max(1));
    let device_rate = stream_config.sample_rate.0;

    info!(
        "Speaker: {} ({:?}, {}Hz, {} channels)",
        device.name().unwrap_or_else(|_| "unknown device".to_string()),
        format,
        device_rate,
        channels
    );

    let mixer = Arc::new(Mutex::new(Mixer::new(device_rate)));
    let mut renderer = Renderer {
        mixer: Arc::clone(&mixer),
        events,
        channels,
        scratch: Vec::new(),
    };

    let err_fn = |err| warn!("Speaker stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| data.copy_from_slice(renderer.render(data.len())),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            &stream_config,
            move |data: &mut [i16], _| {
                for (out, s) in data.iter_mut().zip(renderer.render(data.len())) {
                    *out = (s * i16::MAX as f32) as i16;
                }
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_output_stream(
            &stream_config,
            move |data: &mut [u16], _| {
                for (out, s) in data.iter_mut().zip(renderer.render(data.len())) {
                    *out = ((s + 1.0) * 32767.5) as u16;
                }
            },
            err_fn,
            None,
        )?,
        other => bail!("Unsupported speaker sample format: {:?}", other),
    };

    stream.play().context("Failed to start speaker stream")?;
    Ok((stream, mixer))
}

impl OutputSink for DeviceSink {
    fn current_time(&self) -> f64 {
        self.mixer.lock().map(|m| m.current_time()).unwrap_or(0.0)
    }

    fn schedule(&mut self, entry: &PlaybackEntry, samples: &[f32]) -> Result<()> {
        if self.stop_tx.is_none() {
            bail!("Speaker is closed");
        }

        let mut mixer = self
            .mixer
            .lock()
            .map_err(|_| anyhow!("Speaker mixer is poisoned"))?;
        let resampled = resample_linear(samples, self.source_rate, mixer.rate());
        debug!(
            "Rendering entry {} at {:.3}s ({} frames @ {}Hz)",
            entry.id,
            entry.start_time,
            resampled.len(),
            mixer.rate()
        );
        mixer.add(entry.id, entry.start_time, resampled);
        Ok(())
    }

    fn stop(&mut self, id: EntryId) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.remove(id);
        }
    }

    fn close(&mut self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.clear();
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        self.close();
    }
}
