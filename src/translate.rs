//! Translation service — `POST /translate`.
//!
//! Exactly two directions are supported, `en→ru` and `ru→en`, each backed by
//! its own Marian encoder-decoder. Direction lookup happens *before* any
//! cache access: an unsupported pair is a 400 and never constructs anything.
//! On the first request for a supported direction the backend is built and
//! memoized in a [`WorkerCache`]; later requests are cache hits.
//!
//! # Request
//!
//! ```json
//! {"text": "hello", "source": "en", "target": "ru"}
//! ```
//!
//! # Response
//!
//! ```json
//! {"translation": "привет"}
//! ```

pub mod marian;

use std::fmt;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::cache::WorkerCache;
use crate::http::ApiError;
use crate::worker::{Backend, Worker};
use crate::Result;

/// Supported directions and the Opus-MT checkpoint serving each.
pub const SUPPORTED_DIRECTIONS: &[((&str, &str), &str)] = &[
    (("en", "ru"), "Helsinki-NLP/opus-mt-en-ru"),
    (("ru", "en"), "Helsinki-NLP/opus-mt-ru-en"),
];

/// Look up the model id for a direction. `None` means unsupported.
pub fn model_id_for(source: &str, target: &str) -> Option<&'static str> {
    SUPPORTED_DIRECTIONS
        .iter()
        .find(|((s, t), _)| *s == source && *t == target)
        .map(|(_, id)| *id)
}

/// An ordered (source, target) language pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Direction {
    pub source: String,
    pub target: String,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translation: String,
}

/// Builds a backend loader for a direction. The closure it returns runs on
/// the worker's loading thread, so construction cost (and failure) stays off
/// the request path of other directions.
pub type Loader<B> = Box<dyn FnOnce() -> Result<B> + Send>;

type LoaderFactory<B> = dyn Fn(&Direction, &'static str) -> Loader<B> + Send + Sync;

/// Shared state: the per-direction worker cache plus the loader factory.
pub struct TranslateState<B>
where
    B: Backend<Job = String, Output = String>,
{
    cache: Arc<WorkerCache<Direction, B>>,
    factory: Arc<LoaderFactory<B>>,
}

impl<B> Clone for TranslateState<B>
where
    B: Backend<Job = String, Output = String>,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<B> TranslateState<B>
where
    B: Backend<Job = String, Output = String>,
{
    /// State with a custom loader factory (tests substitute counters here).
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&Direction, &'static str) -> Loader<B> + Send + Sync + 'static,
    {
        Self {
            cache: Arc::new(WorkerCache::new()),
            factory: Arc::new(factory),
        }
    }

    /// Number of directions constructed so far.
    pub async fn loaded_directions(&self) -> usize {
        self.cache.len().await
    }
}

pub async fn handle<B>(
    State(state): State<TranslateState<B>>,
    Json(req): Json<TranslateRequest>,
) -> std::result::Result<Json<TranslateResponse>, ApiError>
where
    B: Backend<Job = String, Output = String>,
{
    let direction = Direction {
        source: req.source.to_lowercase(),
        target: req.target.to_lowercase(),
    };

    // Direction check comes first: unsupported pairs fail before any cache
    // lookup or model construction.
    let Some(model_id) = model_id_for(&direction.source, &direction.target) else {
        return Err(ApiError::bad_request(format!(
            "Unsupported direction: {direction}. Use ru<->en."
        )));
    };

    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request(
            "'text' field is required and must not be empty",
        ));
    }

    let loader = (state.factory)(&direction, model_id);
    let worker = state.cache.get_or_start(direction.clone(), loader).await?;

    tracing::info!(%direction, chars = req.text.len(), "translating");
    let translation = worker.invoke(req.text).await?;

    Ok(Json(TranslateResponse { translation }))
}

/// Build the service router.
pub fn router<B>(state: TranslateState<B>) -> Router
where
    B: Backend<Job = String, Output = String>,
{
    Router::new()
        .route("/translate", post(handle::<B>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Reversing;

    impl Backend for Reversing {
        type Job = String;
        type Output = String;

        fn invoke(&mut self, job: String) -> Result<String> {
            Ok(job.chars().rev().collect())
        }
    }

    fn counting_state(calls: Arc<AtomicUsize>) -> TranslateState<Reversing> {
        TranslateState::with_factory(move |_direction, _model_id| {
            let calls = calls.clone();
            Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Reversing)
            })
        })
    }

    fn request(text: &str, source: &str, target: &str) -> TranslateRequest {
        TranslateRequest {
            text: text.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    #[test]
    fn test_direction_table() {
        assert_eq!(
            model_id_for("en", "ru"),
            Some("Helsinki-NLP/opus-mt-en-ru")
        );
        assert_eq!(
            model_id_for("ru", "en"),
            Some("Helsinki-NLP/opus-mt-ru-en")
        );
        assert_eq!(model_id_for("en", "de"), None);
        assert_eq!(model_id_for("ru", "ru"), None);
    }

    #[tokio::test]
    async fn test_repeat_direction_constructs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = counting_state(calls.clone());

        for _ in 0..2 {
            let Json(resp) = handle(State(state.clone()), Json(request("abc", "en", "ru")))
                .await
                .unwrap();
            assert_eq!(resp.translation, "cba");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.loaded_directions().await, 1);
    }

    #[tokio::test]
    async fn test_unsupported_direction_fails_before_construction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = counting_state(calls.clone());

        let err = handle(State(state.clone()), Json(request("hallo", "en", "de")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.loaded_directions().await, 0);
    }

    #[tokio::test]
    async fn test_direction_is_case_insensitive() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = counting_state(calls.clone());

        handle(State(state.clone()), Json(request("abc", "EN", "Ru")))
            .await
            .unwrap();
        handle(State(state.clone()), Json(request("def", "en", "ru")))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = counting_state(calls.clone());

        let err = handle(State(state), Json(request("  ", "en", "ru")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
