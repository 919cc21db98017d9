//! Inbound audio playback
//!
//! - `scheduler`: gapless start-time computation and the active output set
//! - `mixer`: sample-accurate rendering of scheduled buffers
//! - `device`: speaker output through cpal (feature `speaker`)
//! - `sink`: headless output clock that reports buffer completion

#[cfg(feature = "speaker")]
pub mod device;
pub mod mixer;
pub mod scheduler;
pub mod sink;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::session::SessionEvent;

#[cfg(feature = "speaker")]
pub use device::DeviceSink;
pub use mixer::Mixer;
pub use scheduler::{EntryId, OutputSink, PlaybackEntry, PlaybackScheduler};
pub use sink::ClockedSink;

/// Open the output sink for a new session
///
/// Builds with the `speaker` feature render to the default output device;
/// other builds keep time silently.
pub async fn open_output(
    sample_rate: u32,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<Box<dyn OutputSink>> {
    #[cfg(feature = "speaker")]
    {
        let sink = DeviceSink::open(sample_rate, events).await?;
        Ok(Box::new(sink))
    }

    #[cfg(not(feature = "speaker"))]
    {
        tracing::info!("Audio output is silent (build with `--features speaker` to play it)");
        Ok(Box::new(ClockedSink::new(sample_rate, events)))
    }
}
