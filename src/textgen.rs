//! Text generation service — `POST /generate`.
//!
//! Wraps a causal language model. The backend decodes the *full* sequence
//! (prompt plus continuation); the handler then strips a leading echo of the
//! prompt when, and only when, the decoded text starts with the exact prompt
//! string. Tokenization round-tripping can change whitespace, so the echo is
//! a heuristic, not a guarantee — non-echoing output is returned unchanged.
//!
//! # Request
//!
//! ```json
//! {
//!   "prompt": "Once upon a time",
//!   "max_new_tokens": 128,     // optional
//!   "temperature": 0.7,        // optional
//!   "top_p": 0.9,              // optional
//!   "do_sample": true          // optional, false = greedy
//! }
//! ```
//!
//! # Response
//!
//! ```json
//! {"text": "..."}
//! ```

pub mod qwen;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::http::ApiError;
use crate::worker::{Backend, Worker};

/// Upper bound on requested continuation length.
pub const MAX_NEW_TOKENS_LIMIT: usize = 4096;

/// A generation request.
#[derive(Debug, Deserialize)]
pub struct TextgenRequest {
    pub prompt: String,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_do_sample")]
    pub do_sample: bool,
}

fn default_max_new_tokens() -> usize {
    128
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_do_sample() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct TextgenResponse {
    pub text: String,
}

/// The job handed to the backend.
#[derive(Debug, Clone)]
pub struct TextJob {
    pub prompt: String,
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub do_sample: bool,
}

/// Strip a leading echo of the prompt from decoded output.
///
/// Returns the continuation with leading whitespace removed when the decoded
/// text starts with the exact prompt; otherwise the decoded text unchanged.
pub fn strip_prompt_echo(prompt: &str, decoded: &str) -> String {
    match decoded.strip_prefix(prompt) {
        Some(continuation) => continuation.trim_start().to_string(),
        None => decoded.to_string(),
    }
}

pub async fn handle<B>(
    State(worker): State<Worker<B>>,
    Json(req): Json<TextgenRequest>,
) -> Result<Json<TextgenResponse>, ApiError>
where
    B: Backend<Job = TextJob, Output = String>,
{
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request(
            "'prompt' field is required and must not be empty",
        ));
    }
    if req.max_new_tokens == 0 || req.max_new_tokens > MAX_NEW_TOKENS_LIMIT {
        return Err(ApiError::bad_request(format!(
            "max_new_tokens must be between 1 and {MAX_NEW_TOKENS_LIMIT}, got {}",
            req.max_new_tokens
        )));
    }

    tracing::info!(
        max_new_tokens = req.max_new_tokens,
        do_sample = req.do_sample,
        "generating text"
    );

    let job = TextJob {
        prompt: req.prompt.clone(),
        max_new_tokens: req.max_new_tokens,
        temperature: req.temperature,
        top_p: req.top_p,
        do_sample: req.do_sample,
    };
    let decoded = worker.invoke(job).await?;
    let text = strip_prompt_echo(&req.prompt, &decoded);

    Ok(Json(TextgenResponse { text }))
}

/// Build the service router around a started worker.
pub fn router<B>(worker: Worker<B>) -> Router
where
    B: Backend<Job = TextJob, Output = String>,
{
    Router::new()
        .route("/generate", post(handle::<B>))
        .with_state(worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    #[test]
    fn test_echo_stripped() {
        let out = strip_prompt_echo("Once upon", "Once upon a time there was");
        assert_eq!(out, "a time there was");
    }

    #[test]
    fn test_non_echoing_output_unchanged() {
        let out = strip_prompt_echo("Once upon", "A long time ago");
        assert_eq!(out, "A long time ago");
    }

    #[test]
    fn test_exact_echo_yields_empty() {
        assert_eq!(strip_prompt_echo("hello", "hello"), "");
    }

    #[test]
    fn test_whitespace_changed_echo_not_stripped() {
        // Tokenization collapsed a double space — no longer an exact prefix.
        let out = strip_prompt_echo("a  b", "a b c");
        assert_eq!(out, "a b c");
    }

    /// Fake backend that always echoes the prompt plus a fixed continuation.
    struct Echoing;

    impl Backend for Echoing {
        type Job = TextJob;
        type Output = String;

        fn invoke(&mut self, job: TextJob) -> Result<String> {
            Ok(format!("{} and so it went", job.prompt))
        }
    }

    #[tokio::test]
    async fn test_handler_strips_echo() {
        let worker = Worker::start(|| Ok(Echoing)).await.unwrap();
        let req = TextgenRequest {
            prompt: "The story began".into(),
            max_new_tokens: 16,
            temperature: 0.7,
            top_p: 0.9,
            do_sample: false,
        };
        let Json(resp) = handle(State(worker), Json(req)).await.unwrap();
        assert_eq!(resp.text, "and so it went");
    }

    #[tokio::test]
    async fn test_handler_rejects_empty_prompt() {
        let worker = Worker::start(|| Ok(Echoing)).await.unwrap();
        let req = TextgenRequest {
            prompt: "   ".into(),
            max_new_tokens: 16,
            temperature: 0.7,
            top_p: 0.9,
            do_sample: true,
        };
        let err = handle(State(worker), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handler_rejects_oversized_max_new_tokens() {
        let worker = Worker::start(|| Ok(Echoing)).await.unwrap();
        let req = TextgenRequest {
            prompt: "hi".into(),
            max_new_tokens: MAX_NEW_TOKENS_LIMIT + 1,
            temperature: 0.7,
            top_p: 0.9,
            do_sample: true,
        };
        let err = handle(State(worker), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
