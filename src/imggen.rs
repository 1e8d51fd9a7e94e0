//! Image generation service — `POST /generate`.
//!
//! Wraps a Stable Diffusion pipeline (SD-Turbo by default, which produces
//! usable images in ~4 steps with guidance disabled). The response body is
//! the PNG-encoded image.
//!
//! # Request
//!
//! ```json
//! {
//!   "prompt": "a lighthouse at dusk",
//!   "num_inference_steps": 4,   // optional
//!   "guidance_scale": 0.0,      // optional, >1 enables CFG
//!   "seed": 42,                 // optional, null = random
//!   "width": 512,               // optional, multiple of 8
//!   "height": 512               // optional, multiple of 8
//! }
//! ```
//!
//! # Response
//!
//! PNG bytes with `Content-Type: image/png`.

pub mod sd;

use std::io::Cursor;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use image::RgbImage;
use serde::Deserialize;

use crate::http::{ApiError, Png};
use crate::worker::{Backend, Worker};
use crate::Result;

/// Image dimension bounds. The VAE works on 8-pixel latent blocks.
pub const MIN_DIM: usize = 64;
pub const MAX_DIM: usize = 2048;

/// Upper bound on denoising steps per request.
pub const MAX_STEPS: usize = 150;

#[derive(Debug, Deserialize)]
pub struct ImggenRequest {
    pub prompt: String,

    #[serde(default = "default_steps")]
    pub num_inference_steps: usize,

    #[serde(default)]
    pub guidance_scale: f64,

    /// Random seed. `null` or absent = random.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_dim")]
    pub width: usize,

    #[serde(default = "default_dim")]
    pub height: usize,
}

fn default_steps() -> usize {
    4
}

fn default_dim() -> usize {
    512
}

/// The job handed to the backend.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub prompt: String,
    pub steps: usize,
    pub guidance_scale: f64,
    pub seed: Option<u64>,
    pub width: usize,
    pub height: usize,
}

/// Reject dimensions the VAE cannot produce.
fn check_dimension(name: &str, value: usize) -> std::result::Result<(), ApiError> {
    if !(MIN_DIM..=MAX_DIM).contains(&value) || value % 8 != 0 {
        return Err(ApiError::bad_request(format!(
            "{name} must be a multiple of 8 between {MIN_DIM} and {MAX_DIM}, got {value}"
        )));
    }
    Ok(())
}

/// PNG-encode an RGB image into an in-memory buffer.
pub fn png_bytes(image: &RgbImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, image::ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

pub async fn handle<B>(
    State(worker): State<Worker<B>>,
    Json(req): Json<ImggenRequest>,
) -> std::result::Result<Png, ApiError>
where
    B: Backend<Job = ImageJob, Output = RgbImage>,
{
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request(
            "'prompt' field is required and must not be empty",
        ));
    }
    if req.num_inference_steps == 0 || req.num_inference_steps > MAX_STEPS {
        return Err(ApiError::bad_request(format!(
            "num_inference_steps must be between 1 and {MAX_STEPS}, got {}",
            req.num_inference_steps
        )));
    }
    check_dimension("width", req.width)?;
    check_dimension("height", req.height)?;

    tracing::info!(
        steps = req.num_inference_steps,
        width = req.width,
        height = req.height,
        seed = ?req.seed,
        "generating image"
    );

    let image = worker
        .invoke(ImageJob {
            prompt: req.prompt,
            steps: req.num_inference_steps,
            guidance_scale: req.guidance_scale,
            seed: req.seed,
            width: req.width,
            height: req.height,
        })
        .await?;

    Ok(Png(png_bytes(&image)?))
}

/// Build the service router around a started worker.
pub fn router<B>(worker: Worker<B>) -> Router
where
    B: Backend<Job = ImageJob, Output = RgbImage>,
{
    Router::new()
        .route("/generate", post(handle::<B>))
        .with_state(worker)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SolidColor;

    impl Backend for SolidColor {
        type Job = ImageJob;
        type Output = RgbImage;

        fn invoke(&mut self, job: ImageJob) -> Result<RgbImage> {
            Ok(RgbImage::from_pixel(
                job.width as u32,
                job.height as u32,
                image::Rgb([200, 100, 50]),
            ))
        }
    }

    fn request(prompt: &str) -> ImggenRequest {
        ImggenRequest {
            prompt: prompt.into(),
            num_inference_steps: 4,
            guidance_scale: 0.0,
            seed: Some(7),
            width: 64,
            height: 64,
        }
    }

    #[test]
    fn test_png_magic() {
        let img = RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let bytes = png_bytes(&img).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']);
    }

    #[test]
    fn test_dimension_checks() {
        assert!(check_dimension("width", 512).is_ok());
        assert!(check_dimension("width", 63).is_err());
        assert!(check_dimension("width", 100).is_err()); // not a multiple of 8
        assert!(check_dimension("height", 4096).is_err());
    }

    #[tokio::test]
    async fn test_handler_returns_png() {
        let worker = Worker::start(|| Ok(SolidColor)).await.unwrap();
        let png = handle(State(worker), Json(request("a red square")))
            .await
            .unwrap();
        assert_eq!(&png.0[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_handler_rejects_empty_prompt() {
        let worker = Worker::start(|| Ok(SolidColor)).await.unwrap();
        let err = handle(State(worker), Json(request(" ")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handler_rejects_bad_dimensions() {
        let worker = Worker::start(|| Ok(SolidColor)).await.unwrap();
        let mut req = request("ok");
        req.width = 100;
        let err = handle(State(worker), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
