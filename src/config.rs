//! Service configuration from environment variables.
//!
//! Each service reads its model identifier and precision toggle from the
//! environment at startup; everything else (bind address, device ordinal)
//! comes from CLI flags in the binaries.
//!
//! | Variable | Used by | Default |
//! |---|---|---|
//! | `IMG_MODEL_ID` | imggen | `stabilityai/sd-turbo` |
//! | `MODEL_ID` | textgen | `Qwen/Qwen2.5-1.5B-Instruct` |
//! | `TTS_MODEL_ID` | tts | `parler-tts/parler-tts-mini-v1` |
//! | `TRANSLATE_TOKENIZER_REPO` | translate | `lmz/candle-marian` |
//! | `USE_FP16` | imggen, textgen | `1` |
//! | `HF_TOKEN` | all | unset |

use std::env;

/// Default image model: SD-Turbo, a distilled Stable Diffusion variant that
/// produces usable images in ~4 steps without guidance.
pub const DEFAULT_IMG_MODEL: &str = "stabilityai/sd-turbo";

/// Default text model.
pub const DEFAULT_TEXT_MODEL: &str = "Qwen/Qwen2.5-1.5B-Instruct";

/// Default TTS model.
pub const DEFAULT_TTS_MODEL: &str = "parler-tts/parler-tts-mini-v1";

/// Repo holding `tokenizers`-format conversions of the Opus-MT
/// sentencepiece vocabularies.
pub const DEFAULT_MARIAN_TOKENIZER_REPO: &str = "lmz/candle-marian";

/// HuggingFace Hub access token, if configured.
pub fn hf_token() -> Option<String> {
    env::var("HF_TOKEN").ok().filter(|t| !t.is_empty())
}

/// Whether fp16 weights are requested. Defaults to on; only honored on CUDA.
pub fn use_fp16() -> bool {
    parse_fp16(env::var("USE_FP16").ok().as_deref())
}

fn parse_fp16(value: Option<&str>) -> bool {
    match value {
        Some(v) => v == "1",
        None => true,
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

/// Image generation service settings.
#[derive(Debug, Clone)]
pub struct ImggenConfig {
    pub model_id: String,
    pub fp16: bool,
    pub token: Option<String>,
}

impl ImggenConfig {
    pub fn from_env() -> Self {
        Self {
            model_id: env_or("IMG_MODEL_ID", DEFAULT_IMG_MODEL),
            fp16: use_fp16(),
            token: hf_token(),
        }
    }
}

/// Text generation service settings.
#[derive(Debug, Clone)]
pub struct TextgenConfig {
    pub model_id: String,
    pub fp16: bool,
    pub token: Option<String>,
}

impl TextgenConfig {
    pub fn from_env() -> Self {
        Self {
            model_id: env_or("MODEL_ID", DEFAULT_TEXT_MODEL),
            fp16: use_fp16(),
            token: hf_token(),
        }
    }
}

/// Translation service settings.
///
/// The per-direction model repos are fixed (see [`crate::translate`]); only
/// the tokenizer repo and token are configurable.
#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub tokenizer_repo: String,
    pub token: Option<String>,
}

impl TranslateConfig {
    pub fn from_env() -> Self {
        Self {
            tokenizer_repo: env_or("TRANSLATE_TOKENIZER_REPO", DEFAULT_MARIAN_TOKENIZER_REPO),
            token: hf_token(),
        }
    }
}

/// Text-to-speech service settings.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub model_id: String,
    pub token: Option<String>,
}

impl TtsConfig {
    pub fn from_env() -> Self {
        Self {
            model_id: env_or("TTS_MODEL_ID", DEFAULT_TTS_MODEL),
            token: hf_token(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fp16() {
        assert!(parse_fp16(None));
        assert!(parse_fp16(Some("1")));
        assert!(!parse_fp16(Some("0")));
        assert!(!parse_fp16(Some("true")));
    }
}
