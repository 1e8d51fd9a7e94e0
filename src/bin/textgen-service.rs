//! Text generation service — HTTP wrapper around a causal language model.
//!
//! `POST /generate` with a JSON body returns `{"text": ...}`. The model is
//! loaded once at startup and kept resident.
//!
//! # Example
//!
//! ```sh
//! curl -s localhost:8002/generate \
//!   -H 'content-type: application/json' \
//!   -d '{"prompt":"Once upon a time","max_new_tokens":64}'
//! ```

use clap::Parser;
use eva_services::config::TextgenConfig;
use eva_services::device::preferred_device;
use eva_services::textgen::{self, qwen::QwenBackend};
use eva_services::worker::Worker;

#[derive(Parser, Debug)]
#[command(
    name = "textgen-service",
    about = "Text generation service — resident causal LM, one POST endpoint"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8002")]
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

    let config = TextgenConfig::from_env();
    let device = preferred_device(args.device);
    let worker = Worker::start(move || QwenBackend::load(&config, &device)).await?;
    tracing::info!("Model ready");

    eva_services::http::serve(listener, textgen::router(worker)).await?;
    Ok(())
}
