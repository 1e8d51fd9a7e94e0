//! Parler-TTS backend.
//!
//! The voice-conditioning description goes through the text encoder; the
//! prompt text is what gets spoken. Generated codebook codes are decoded to
//! PCM by the model's own audio encoder, then peak-normalized.

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::parler_tts::{Config, Model};
use tokenizers::Tokenizer;

use super::{AudioClip, TtsJob};
use crate::audio::peak_normalize;
use crate::config::TtsConfig;
use crate::worker::Backend;
use crate::{hub, Error, Result};

/// Cap on generated code frames (~23 seconds of speech for the mini model).
const MAX_GENERATION_STEPS: usize = 2048;

pub struct ParlerBackend {
    model: Model,
    tokenizer: Tokenizer,
    device: Device,
    sample_rate: u32,
}

impl ParlerBackend {
    /// Download and load the model. Blocking; run under `spawn_blocking`.
    pub fn load(config: &TtsConfig, device: &Device) -> Result<Self> {
        let api = hub::api(config.token.clone())?;
        tracing::info!(model_id = %config.model_id, device = ?device, "loading tts model");

        let config_file = hub::fetch(&api, &config.model_id, "config.json")?;
        let tokenizer_file = hub::fetch(&api, &config.model_id, "tokenizer.json")?;
        let weight_files = hub::fetch_weights(&api, &config.model_id)?;

        let model_config: Config = serde_json::from_reader(std::fs::File::open(config_file)?)?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)?;

        // Codebook decoding is numerically touchy in half precision; stay f32.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weight_files, DType::F32, device)? };
        let sample_rate = model_config.audio_encoder.sampling_rate as u32;
        let model = Model::new(&model_config, vb)
            .map_err(|e| Error::WeightLoad(format!("{}: {e}", config.model_id)))?;

        tracing::info!(sample_rate, "tts model ready");
        Ok(Self {
            model,
            tokenizer,
            device: device.clone(),
            sample_rate,
        })
    }

    fn encode(&self, text: &str) -> Result<Tensor> {
        let ids = self.tokenizer.encode(text, true)?.get_ids().to_vec();
        Ok(Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?)
    }
}

impl Backend for ParlerBackend {
    type Job = TtsJob;
    type Output = AudioClip;

    fn invoke(&mut self, job: TtsJob) -> Result<AudioClip> {
        let prompt_tokens = self.encode(&job.text)?;
        let description_tokens = self.encode(&job.voice_description)?;

        // Greedy decoding keeps a named voice stable across requests.
        let logits_processor = LogitsProcessor::new(rand::random(), None, None);
        let codes = self.model.generate(
            &prompt_tokens,
            &description_tokens,
            logits_processor,
            MAX_GENERATION_STEPS,
        )?;

        let codes = codes.to_dtype(DType::I64)?.unsqueeze(0)?;
        let pcm = self
            .model
            .audio_encoder
            .decode_codes(&codes.to_device(&self.device)?)?;
        let pcm = pcm.i((0, 0))?.to_dtype(DType::F32)?;
        let mut samples = pcm.to_vec1::<f32>()?;
        peak_normalize(&mut samples);

        Ok(AudioClip {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}
