// File-backed capture source
//
// Replays a WAV file as if it were a live microphone: the file is converted
// to mono at the pipeline rate and delivered in fixed-size blocks paced at
// real time.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, CaptureBlock};
use super::file::AudioFile;

/// Capture backend that streams a WAV file
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: AudioBackendConfig) -> Result<Self> {
        if config.frame_size == 0 {
            bail!("Frame size must be greater than zero");
        }

        info!(
            "File backend initialized: {} ({}Hz, {} samples/frame)",
            path.display(),
            config.sample_rate,
            config.frame_size
        );

        Ok(Self {
            path,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBlock>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        let file = AudioFile::open(&self.path)?;
        let samples = file.to_mono(self.config.sample_rate);
        let frame_size = self.config.frame_size;
        let frame_duration = self.config.frame_duration();
        let sample_rate = u64::from(self.config.sample_rate.max(1));

        let (tx, rx) = mpsc::channel(32);
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);

            for (index, chunk) in samples.chunks(frame_size).enumerate() {
                ticker.tick().await;

                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                // The final partial block is padded so every block has the same size
                let mut block = chunk.to_vec();
                block.resize(frame_size, 0.0);

                let frame = CaptureBlock {
                    samples: block,
                    // From the sample offset so fractional block lengths do not drift
                    timestamp_ms: (index * frame_size) as u64 * 1000 / sample_rate,
                };

                if tx.send(frame).await.is_err() {
                    debug!("Capture receiver dropped; ending file playback");
                    break;
                }
            }

            capturing.store(false, Ordering::SeqCst);
            info!("File capture finished");
        });

        self.task = Some(task);

        info!("File capture started: {}", self.path.display());

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.abort();
            info!("File capture stopped");
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
