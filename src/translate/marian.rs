//! Marian NMT backend for one language direction.
//!
//! Opus-MT checkpoints ship sentencepiece vocabularies rather than
//! `tokenizers`-format files, so the source/target tokenizers come from a
//! conversion repo (`TRANSLATE_TOKENIZER_REPO`). Decoding is greedy with the
//! KV cache, capped at [`MAX_OUTPUT_TOKENS`].

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::marian::{self, MTModel};
use tokenizers::Tokenizer;

use super::Direction;
use crate::config::TranslateConfig;
use crate::device::weight_dtype;
use crate::worker::Backend;
use crate::{hub, Error, Result};

/// Decode cap, matching the original service's `max_length=512`.
pub const MAX_OUTPUT_TOKENS: usize = 512;

pub struct MarianBackend {
    model: MTModel,
    config: marian::Config,
    tokenizer_src: Tokenizer,
    tokenizer_tgt: Tokenizer,
    device: Device,
}

impl MarianBackend {
    /// Download and load the checkpoint for one direction. Blocking; run
    /// under `spawn_blocking`.
    pub fn load(config: &TranslateConfig, direction: &Direction, model_id: &str) -> Result<Self> {
        let api = hub::api(config.token.clone())?;
        let device = crate::device::preferred_device(0);
        tracing::info!(%direction, model_id, device = ?device, "loading translation model");

        let config_file = hub::fetch(&api, model_id, "config.json")?;
        let weight_files = hub::fetch_weights(&api, model_id)?;
        let tokenizer_src = Tokenizer::from_file(hub::fetch(
            &api,
            &config.tokenizer_repo,
            &format!("tokenizer-marian-{}.json", direction.source),
        )?)?;
        let tokenizer_tgt = Tokenizer::from_file(hub::fetch(
            &api,
            &config.tokenizer_repo,
            &format!("tokenizer-marian-{}.json", direction.target),
        )?)?;

        let model_config: marian::Config =
            serde_json::from_reader(std::fs::File::open(config_file)?)?;
        let dtype = weight_dtype(false, &device);
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weight_files, dtype, &device)? };
        let model = MTModel::new(&model_config, vb)
            .map_err(|e| Error::WeightLoad(format!("{model_id}: {e}")))?;

        tracing::info!(%direction, "translation model ready");
        Ok(Self {
            model,
            config: model_config,
            tokenizer_src,
            tokenizer_tgt,
            device,
        })
    }
}

impl Backend for MarianBackend {
    type Job = String;
    type Output = String;

    fn invoke(&mut self, text: String) -> Result<String> {
        self.model.reset_kv_cache();

        let mut source_ids = self
            .tokenizer_src
            .encode(text.as_str(), true)?
            .get_ids()
            .to_vec();
        source_ids.push(self.config.eos_token_id);
        let source = Tensor::new(source_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let encoder_out = self.model.encoder().forward(&source, 0)?;

        // Greedy decode, one token at a time against the KV cache.
        let mut logits_processor = LogitsProcessor::new(0, None, None);
        let mut token_ids = vec![self.config.decoder_start_token_id];
        for index in 0..MAX_OUTPUT_TOKENS {
            let context_size = if index >= 1 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.decode(&input, &encoder_out, start_pos)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = logits_processor.sample(&logits)?;
            if token == self.config.eos_token_id || token == self.config.forced_eos_token_id {
                break;
            }
            token_ids.push(token);
        }

        // Skip the decoder-start token when detokenizing.
        let translation = self.tokenizer_tgt.decode(&token_ids[1..], true)?;
        Ok(translation)
    }
}
