//! Qwen2 causal-LM backend.
//!
//! Loads config, tokenizer, and safetensors weights from the Hub and decodes
//! autoregressively with the model's KV cache. The full sequence (prompt +
//! continuation) is decoded back to text; echo handling happens in the
//! handler.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::qwen2::{Config, ModelForCausalLM};
use tokenizers::Tokenizer;

use super::TextJob;
use crate::config::TextgenConfig;
use crate::device::weight_dtype;
use crate::worker::Backend;
use crate::{hub, Error, Result};

pub struct QwenBackend {
    model: ModelForCausalLM,
    tokenizer: Tokenizer,
    device: Device,
    eos_tokens: Vec<u32>,
}

impl QwenBackend {
    /// Download and load the model. Blocking; run under `spawn_blocking`.
    pub fn load(config: &TextgenConfig, device: &Device) -> Result<Self> {
        let api = hub::api(config.token.clone())?;
        tracing::info!(model_id = %config.model_id, device = ?device, "loading text model");

        let config_file = hub::fetch(&api, &config.model_id, "config.json")?;
        let tokenizer_file = hub::fetch(&api, &config.model_id, "tokenizer.json")?;
        let weight_files = hub::fetch_weights(&api, &config.model_id)?;

        let model_config: Config = serde_json::from_reader(std::fs::File::open(config_file)?)?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)?;

        let dtype = weight_dtype(config.fp16, device);
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weight_files, dtype, device)? };
        let model = ModelForCausalLM::new(&model_config, vb)
            .map_err(|e| Error::WeightLoad(format!("{}: {e}", config.model_id)))?;

        // Instruct checkpoints end turns with <|im_end|>; base ones with
        // <|endoftext|>. Stop on whichever the tokenizer knows.
        let eos_tokens: Vec<u32> = ["<|im_end|>", "<|endoftext|>"]
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();
        if eos_tokens.is_empty() {
            return Err(Error::WeightLoad(format!(
                "{}: tokenizer has no known end-of-sequence token",
                config.model_id
            )));
        }

        tracing::info!("text model ready");
        Ok(Self {
            model,
            tokenizer,
            device: device.clone(),
            eos_tokens,
        })
    }
}

impl Backend for QwenBackend {
    type Job = TextJob;
    type Output = String;

    fn invoke(&mut self, job: TextJob) -> Result<String> {
        self.model.clear_kv_cache();

        let prompt_ids = self
            .tokenizer
            .encode(job.prompt.as_str(), true)?
            .get_ids()
            .to_vec();
        if prompt_ids.is_empty() {
            return Err(Error::Inference("prompt tokenized to nothing".into()));
        }

        let mut logits_processor = if job.do_sample {
            LogitsProcessor::new(rand::random(), Some(job.temperature), Some(job.top_p))
        } else {
            LogitsProcessor::new(rand::random(), None, None)
        };

        let mut tokens = prompt_ids;
        for index in 0..job.max_new_tokens {
            // First step feeds the whole prompt; afterwards the KV cache
            // holds the history and only the last token goes in.
            let context_size = if index == 0 { tokens.len() } else { 1 };
            let start_pos = tokens.len() - context_size;
            let input = Tensor::new(&tokens[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input, start_pos)?;
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;

            let next = logits_processor.sample(&logits)?;
            if self.eos_tokens.contains(&next) {
                break;
            }
            tokens.push(next);
        }

        let text = self.tokenizer.decode(&tokens, true)?;
        Ok(text)
    }
}
