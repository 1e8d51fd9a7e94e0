//! Shared HTTP vocabulary for the inference services.
//!
//! Binary responses carry their media type; errors become a JSON
//! `{"detail": ...}` body. Declared client errors (unsupported direction,
//! unknown speaker, invalid field values) map to 400; anything surfaced by a
//! backend maps to 500 with the error text as detail.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use crate::Error;

/// PNG image bytes, served as `image/png`.
#[derive(Debug)]
pub struct Png(pub Vec<u8>);

impl IntoResponse for Png {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "image/png")], self.0).into_response()
    }
}

/// WAV audio bytes, served as `audio/wav`.
#[derive(Debug)]
pub struct Wav(pub Vec<u8>);

impl IntoResponse for Wav {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "audio/wav")], self.0).into_response()
    }
}

/// Error returned by a service handler.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself is at fault; reported with a 400.
    BadRequest(String),
    /// Everything else; reported with a 500.
    Internal(String),
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::Internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            Self::BadRequest(d) | Self::Internal(d) => d.clone(),
        };
        if matches!(self, Self::Internal(_)) {
            tracing::error!(%detail, "request failed");
        }
        (self.status(), Json(json!({ "detail": detail }))).into_response()
    }
}

/// Bind `addr` and serve `router` until the process is killed.
///
/// Callers bind before loading their model so early clients connect and
/// wait instead of seeing connection refused.
pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> crate::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "serving");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::bad_request("nope").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::Inference("oom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_media_types() {
        let png = Png(vec![0x89, b'P', b'N', b'G']).into_response();
        assert_eq!(png.headers()[header::CONTENT_TYPE], "image/png");

        let wav = Wav(b"RIFF".to_vec()).into_response();
        assert_eq!(wav.headers()[header::CONTENT_TYPE], "audio/wav");
    }

    #[test]
    fn test_bad_request_response_status() {
        let resp = ApiError::bad_request("missing text").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
