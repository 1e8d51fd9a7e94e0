//! Text-to-speech service — HTTP wrapper around Parler-TTS.
//!
//! `POST /tts` with a JSON body returns mono WAV bytes at the requested
//! sample rate. The model is loaded once at startup and kept resident.
//!
//! # Example
//!
//! ```sh
//! curl -s localhost:8004/tts \
//!   -H 'content-type: application/json' \
//!   -d '{"text":"hello there","speaker":"gary"}' > out.wav
//! ```

use clap::Parser;
use eva_services::config::TtsConfig;
use eva_services::device::preferred_device;
use eva_services::tts::{self, parler::ParlerBackend};
use eva_services::worker::Worker;

#[derive(Parser, Debug)]
#[command(
    name = "tts-service",
    about = "Text-to-speech service — resident Parler-TTS, one POST endpoint"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8004")]
    bind: String,

    /// CUDA device ordinal (0 = first GPU). Ignored when CUDA is unavailable.
    #[arg(long, default_value_t = 0)]
    device: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("Listening on {} (loading model...)", args.bind);

    let config = TtsConfig::from_env();
    let device = preferred_device(args.device);
    let worker = Worker::start(move || ParlerBackend::load(&config, &device)).await?;
    tracing::info!("Model ready");

    eva_services::http::serve(listener, tts::router(worker)).await?;
    Ok(())
}
