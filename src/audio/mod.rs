pub mod backend;
pub mod capture;
pub mod codec;
pub mod file;
pub mod file_backend;
pub mod meter;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, CaptureBlock};
pub use capture::{rms, CaptureCounters, CaptureOutcome, CapturePipeline};
pub use file::AudioFile;
pub use file_backend::FileBackend;
pub use meter::VolumeMeter;
