use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use live_voice::{create_router, spawn_session, AppState, AudioSource, Config, ConsoleDisplay, DisplaySink};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "live-voice", version, about = "Real-time speech-to-speech voice client")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/live-voice")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one session in the foreground until Ctrl-C or disconnect
    Run(RunArgs),
    /// Serve the local HTTP control API
    Serve,
}

#[derive(Args)]
struct RunArgs {
    /// WebSocket endpoint of the model relay
    #[arg(long)]
    url: Option<String>,

    /// Voice identity
    #[arg(long)]
    voice: Option<String>,

    /// `microphone` or `file:<path.wav>`
    #[arg(long)]
    input: Option<AudioSource>,

    /// Barge-in RMS threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Samples per captured frame
    #[arg(long)]
    frame_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;

    info!("Live Voice v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run(args) => {
            apply_overrides(&mut cfg, args);
            cfg.validate()?;
            run(cfg).await
        }
        Command::Serve => serve(cfg).await,
    }
}

fn apply_overrides(cfg: &mut Config, args: RunArgs) {
    if let Some(url) = args.url {
        cfg.session.url = url;
    }
    if let Some(voice) = args.voice {
        cfg.session.voice = voice;
    }
    if let Some(input) = args.input {
        cfg.audio.input = input;
    }
    if let Some(threshold) = args.threshold {
        cfg.interruption.threshold = threshold;
    }
    if let Some(frame_size) = args.frame_size {
        cfg.audio.frame_size = frame_size;
    }
}

async fn run(cfg: Config) -> Result<()> {
    let session_config = cfg.session_config();

    info!("Session endpoint: {}", session_config.url);
    info!("Voice: {}", session_config.voice);
    info!("Input: {}", session_config.input);
    info!("Interruption threshold: {}", session_config.interruption_threshold);

    let display: Arc<dyn DisplaySink> = Arc::new(ConsoleDisplay::new());
    let handle = spawn_session(session_config, display);
    let stopper = handle.stopper();
    let session = handle.join();
    tokio::pin!(session);

    let stats = tokio::select! {
        result = &mut session => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping session");
            stopper.stop();
            session.await?
        }
    };

    println!(
        "Session {} ({:.1}s): {} frames sent, {} dropped, {} audio chunks, {} messages, {} interruptions",
        stats.session_id,
        stats.duration_secs,
        stats.frames_sent,
        stats.frames_dropped,
        stats.audio_chunks_received,
        stats.messages_flushed,
        stats.local_interruptions + stats.server_interruptions
    );

    Ok(())
}

async fn serve(cfg: Config) -> Result<()> {
    let state = AppState::new(cfg.session_config());
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on http://{}", addr);
    if cfg.http.bind != "127.0.0.1" && cfg.http.bind != "localhost" {
        warn!("HTTP API is reachable beyond localhost and has no authentication");
    }

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
