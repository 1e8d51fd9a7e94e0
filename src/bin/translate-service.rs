//! Translation service — HTTP wrapper around per-direction Marian models.
//!
//! `POST /translate` with a JSON body returns `{"translation": ...}`.
//! Models are loaded lazily, one per supported language direction, and kept
//! resident in a keyed cache. Unsupported directions fail with a 400 before
//! any model is constructed, so startup is instant.
//!
//! # Example
//!
//! ```sh
//! curl -s localhost:8003/translate \
//!   -H 'content-type: application/json' \
//!   -d '{"text":"hello","source":"en","target":"ru"}'
//! ```

use clap::Parser;
use eva_services::config::TranslateConfig;
use eva_services::translate::{self, marian::MarianBackend, TranslateState};

#[derive(Parser, Debug)]
#[command(
    name = "translate-service",
    about = "Translation service — resident Marian models keyed by direction"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8003")]
    bind: String,
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
    tracing::info!("Listening on {}", args.bind);

    let config = TranslateConfig::from_env();
    let state = TranslateState::with_factory(move |direction, model_id| {
        let config = config.clone();
        let direction = direction.clone();
        Box::new(move || MarianBackend::load(&config, &direction, model_id))
    });

    eva_services::http::serve(listener, translate::router(state)).await?;
    Ok(())
}
