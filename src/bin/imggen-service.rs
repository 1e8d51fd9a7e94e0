//! Image generation service — HTTP wrapper around a Stable Diffusion model.
//!
//! `POST /generate` with a JSON body returns PNG bytes. The model is loaded
//! once at startup and kept resident; the listener binds before loading so
//! early clients wait instead of seeing connection refused.
//!
//! # Example
//!
//! ```sh
//! curl -s localhost:8001/generate \
//!   -H 'content-type: application/json' \
//!   -d '{"prompt":"a lighthouse at dusk","seed":42}' > out.png
//! ```

use clap::Parser;
use eva_services::config::ImggenConfig;
use eva_services::device::preferred_device;
use eva_services::imggen::{self, sd::SdBackend};
use eva_services::worker::Worker;

#[derive(Parser, Debug)]
#[command(
    name = "imggen-service",
    about = "Image generation service — resident Stable Diffusion, one POST endpoint"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8001")]
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

    let config = ImggenConfig::from_env();
    let device = preferred_device(args.device);
    let worker = Worker::start(move || SdBackend::load(&config, &device)).await?;
    tracing::info!("Model ready");

    eva_services::http::serve(listener, imggen::router(worker)).await?;
    Ok(())
}
