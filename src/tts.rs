//! Text-to-speech service — `POST /tts`.
//!
//! Wraps Parler-TTS. The optional `speaker` field selects a voice from the
//! declared table (an unknown name is a 400 listing the supported voices);
//! the synthesized audio is peak-normalized, resampled to the requested
//! rate, and returned as a mono 32-bit float WAV.
//!
//! # Request
//!
//! ```json
//! {"text": "привет", "speaker": "laura", "sample_rate": 48000}
//! ```
//!
//! # Response
//!
//! WAV bytes with `Content-Type: audio/wav`.

pub mod parler;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::audio::{resample_linear, wav_bytes};
use crate::http::{ApiError, Wav};
use crate::worker::{Backend, Worker};

/// Accepted output sample rates.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// Voice table: speaker name → conditioning description.
///
/// Parler selects voices through a free-text description; consistent named
/// speakers come from naming them in it.
pub const VOICES: &[(&str, &str)] = &[
    ("laura", "Laura's voice is warm and friendly, delivered at a moderate pace in a quiet room with very clear audio."),
    ("gary", "Gary speaks in a deep, calm voice with a measured pace, recorded up close with almost no background noise."),
    ("jon", "Jon's voice is monotone yet slightly fast in delivery, with a very close recording that has no background noise."),
    ("lea", "Lea speaks softly and expressively, slightly slower than average, in a very clear recording."),
    ("karen", "Karen delivers her words with energy and a bright tone, at a quick pace in a studio-quality recording."),
    ("rick", "Rick's voice is low and gravelly, unhurried, captured very close with excellent clarity."),
    ("eileen", "Eileen speaks gently and precisely, with a neutral accent and a very clean recording."),
    ("jordan", "Jordan's voice is confident and animated, moderately fast, with studio-quality clarity."),
];

/// Voice used when the request names no speaker.
pub const DEFAULT_VOICE: &str = "laura";

/// Look up a speaker's conditioning description.
pub fn voice_description(speaker: &str) -> Option<&'static str> {
    VOICES
        .iter()
        .find(|(name, _)| *name == speaker)
        .map(|(_, description)| *description)
}

fn voice_names() -> Vec<&'static str> {
    VOICES.iter().map(|(name, _)| *name).collect()
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,

    /// Speaker name from the voice table. `null` or absent = default voice.
    #[serde(default)]
    pub speaker: Option<String>,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_sample_rate() -> u32 {
    48_000
}

/// The job handed to the backend.
#[derive(Debug, Clone)]
pub struct TtsJob {
    pub text: String,
    pub voice_description: String,
}

/// Synthesized audio at the model's native rate.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub async fn handle<B>(
    State(worker): State<Worker<B>>,
    Json(req): Json<TtsRequest>,
) -> Result<Wav, ApiError>
where
    B: Backend<Job = TtsJob, Output = AudioClip>,
{
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request(
            "'text' field is required and must not be empty",
        ));
    }
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&req.sample_rate) {
        return Err(ApiError::bad_request(format!(
            "sample_rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE}, got {}",
            req.sample_rate
        )));
    }

    let speaker = req.speaker.as_deref().unwrap_or(DEFAULT_VOICE);
    let Some(description) = voice_description(speaker) else {
        return Err(ApiError::bad_request(format!(
            "Speaker must be one of {:?}",
            voice_names()
        )));
    };

    tracing::info!(speaker, sample_rate = req.sample_rate, chars = req.text.len(), "synthesizing");

    let clip = worker
        .invoke(TtsJob {
            text: req.text,
            voice_description: description.to_string(),
        })
        .await?;

    let samples = resample_linear(&clip.samples, clip.sample_rate, req.sample_rate);
    let bytes = wav_bytes(&samples, req.sample_rate, 1)?;
    Ok(Wav(bytes))
}

/// Build the service router around a started worker.
pub fn router<B>(worker: Worker<B>) -> Router
where
    B: Backend<Job = TtsJob, Output = AudioClip>,
{
    Router::new()
        .route("/tts", post(handle::<B>))
        .with_state(worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    /// Fake backend producing one second of a quiet ramp at 44.1kHz.
    struct Ramp;

    impl Backend for Ramp {
        type Job = TtsJob;
        type Output = AudioClip;

        fn invoke(&mut self, _job: TtsJob) -> Result<AudioClip> {
            let samples = (0..44_100).map(|i| (i % 100) as f32 / 200.0).collect();
            Ok(AudioClip { samples, sample_rate: 44_100 })
        }
    }

    fn request(text: &str, speaker: Option<&str>, sample_rate: u32) -> TtsRequest {
        TtsRequest {
            text: text.into(),
            speaker: speaker.map(Into::into),
            sample_rate,
        }
    }

    #[test]
    fn test_voice_table() {
        assert!(voice_description(DEFAULT_VOICE).is_some());
        assert!(voice_description("gary").is_some());
        assert!(voice_description("nobody").is_none());
    }

    #[tokio::test]
    async fn test_handler_returns_wav_at_requested_rate() {
        let worker = Worker::start(|| Ok(Ramp)).await.unwrap();
        let wav = handle(State(worker), Json(request("hello", None, 48_000)))
            .await
            .unwrap();
        assert_eq!(&wav.0[..4], b"RIFF");

        let reader = hound::WavReader::new(std::io::Cursor::new(wav.0)).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.spec().channels, 1);
        // One second in, one second out (within a sample).
        assert!((reader.duration() as i64 - 48_000).abs() <= 1);
    }

    #[tokio::test]
    async fn test_handler_rejects_unknown_speaker() {
        let worker = Worker::start(|| Ok(Ramp)).await.unwrap();
        let err = handle(State(worker), Json(request("hi", Some("hal9000"), 48_000)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handler_rejects_empty_text() {
        let worker = Worker::start(|| Ok(Ramp)).await.unwrap();
        let err = handle(State(worker), Json(request("", None, 48_000)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handler_rejects_out_of_range_rate() {
        let worker = Worker::start(|| Ok(Ramp)).await.unwrap();
        let err = handle(State(worker), Json(request("hi", None, 4_000)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
