//! Stable Diffusion backend.
//!
//! Loads the CLIP text encoder, UNet, and VAE from one diffusers-layout
//! repo and runs the standard denoising loop. Classifier-free guidance is
//! only used when `guidance_scale > 1` — SD-Turbo runs unguided.

use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, schedulers::Scheduler as _,
    unet_2d::UNet2DConditionModel, vae::AutoEncoderKL, StableDiffusionConfig,
};
use image::RgbImage;
use tokenizers::Tokenizer;

use super::ImageJob;
use crate::config::ImggenConfig;
use crate::device::weight_dtype;
use crate::worker::Backend;
use crate::{hub, Error, Result};

/// Latent scaling factor shared by the SD 1.x/2.x VAE family.
const VAE_SCALE: f64 = 0.18215;

/// Tokenizer repo for the SD 2.x CLIP text encoder (the model repos ship
/// sentencepiece-free CLIP vocabularies in a legacy layout).
const CLIP_TOKENIZER_REPO: &str = "openai/clip-vit-base-patch32";

pub struct SdBackend {
    sd_config: StableDiffusionConfig,
    tokenizer: Tokenizer,
    text_model: ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
    device: Device,
    dtype: DType,
}

impl SdBackend {
    /// Download and load the pipeline. Blocking; run under `spawn_blocking`.
    pub fn load(config: &ImggenConfig, device: &Device) -> Result<Self> {
        let api = hub::api(config.token.clone())?;
        let dtype = weight_dtype(config.fp16, device);
        let fp16_files = dtype == DType::F16;
        tracing::info!(model_id = %config.model_id, device = ?device, ?dtype, "loading image pipeline");

        let tokenizer_file = hub::fetch(&api, CLIP_TOKENIZER_REPO, "tokenizer.json")?;
        let clip_weights = hub::fetch(
            &api,
            &config.model_id,
            if fp16_files {
                "text_encoder/model.fp16.safetensors"
            } else {
                "text_encoder/model.safetensors"
            },
        )?;
        let unet_weights = hub::fetch(
            &api,
            &config.model_id,
            if fp16_files {
                "unet/diffusion_pytorch_model.fp16.safetensors"
            } else {
                "unet/diffusion_pytorch_model.safetensors"
            },
        )?;
        let vae_weights = hub::fetch(
            &api,
            &config.model_id,
            if fp16_files {
                "vae/diffusion_pytorch_model.fp16.safetensors"
            } else {
                "vae/diffusion_pytorch_model.safetensors"
            },
        )?;

        // Height/width in the config are only defaults; the request decides
        // the actual latent shape.
        let sd_config = StableDiffusionConfig::v2_1(None, None, None);

        let tokenizer = Tokenizer::from_file(tokenizer_file)?;
        let text_model =
            stable_diffusion::build_clip_transformer(&sd_config.clip, clip_weights, device, dtype)
                .map_err(|e| Error::WeightLoad(format!("clip: {e}")))?;
        let unet = sd_config
            .build_unet(unet_weights, device, 4, false, dtype)
            .map_err(|e| Error::WeightLoad(format!("unet: {e}")))?;
        let vae = sd_config
            .build_vae(vae_weights, device, dtype)
            .map_err(|e| Error::WeightLoad(format!("vae: {e}")))?;

        tracing::info!("image pipeline ready");
        Ok(Self {
            sd_config,
            tokenizer,
            text_model,
            unet,
            vae,
            device: device.clone(),
            dtype,
        })
    }

    /// Encode a prompt into CLIP hidden states, padded to the full context.
    fn encode_prompt(&self, prompt: &str) -> Result<Tensor> {
        let pad_token = match &self.sd_config.clip.pad_with {
            Some(pad) => pad.clone(),
            None => "<|endoftext|>".to_string(),
        };
        let pad_id = self
            .tokenizer
            .token_to_id(&pad_token)
            .ok_or_else(|| Error::Inference(format!("tokenizer has no pad token {pad_token}")))?;

        let mut tokens = self
            .tokenizer
            .encode(prompt, true)?
            .get_ids()
            .to_vec();
        let max_len = self.sd_config.clip.max_position_embeddings;
        if tokens.len() > max_len {
            return Err(Error::Inference(format!(
                "prompt is too long: {} tokens, max {max_len}",
                tokens.len()
            )));
        }
        tokens.resize(max_len, pad_id);

        let tokens = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let embedding = self.text_model.forward(&tokens)?.to_dtype(self.dtype)?;
        Ok(embedding)
    }
}

impl Backend for SdBackend {
    type Job = ImageJob;
    type Output = RgbImage;

    fn invoke(&mut self, job: ImageJob) -> Result<RgbImage> {
        if let Some(seed) = job.seed {
            self.device.set_seed(seed)?;
        }
        let use_guidance = job.guidance_scale > 1.0;

        let text_embedding = self.encode_prompt(&job.prompt)?;
        let text_embedding = if use_guidance {
            let uncond = self.encode_prompt("")?;
            Tensor::cat(&[uncond, text_embedding], 0)?
        } else {
            text_embedding
        };

        let mut scheduler = self.sd_config.build_scheduler(job.steps)?;
        let timesteps = scheduler.timesteps().to_vec();

        let latent_shape = (1, 4, job.height / 8, job.width / 8);
        let latents = Tensor::randn(0f32, 1f32, latent_shape, &self.device)?
            .to_dtype(self.dtype)?;
        let mut latents = (latents * scheduler.init_noise_sigma())?;

        for &timestep in &timesteps {
            let latent_input = if use_guidance {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let latent_input = scheduler.scale_model_input(latent_input, timestep)?;
            let noise_pred = self
                .unet
                .forward(&latent_input, timestep as f64, &text_embedding)?;

            let noise_pred = if use_guidance {
                let chunks = noise_pred.chunk(2, 0)?;
                let (uncond, cond) = (&chunks[0], &chunks[1]);
                (uncond + ((cond - uncond)? * job.guidance_scale)?)?
            } else {
                noise_pred
            };

            latents = scheduler.step(&noise_pred, timestep, &latents)?;
        }

        let image = self.vae.decode(&(latents / VAE_SCALE)?)?;
        let image = ((image / 2.)? + 0.5)?.clamp(0f64, 1.)?;
        let image = image.to_device(&Device::Cpu)?.to_dtype(DType::F32)?;
        let image = (image * 255.)?.to_dtype(DType::U8)?.i(0)?;
        tensor_to_image(&image)
    }
}

/// Convert a `[3, H, W]` u8 tensor into an `RgbImage`.
fn tensor_to_image(tensor: &Tensor) -> Result<RgbImage> {
    let (channels, height, width) = tensor.dims3()?;
    if channels != 3 {
        return Err(Error::Inference(format!(
            "expected 3 image channels, got {channels}"
        )));
    }
    let pixels = tensor.permute((1, 2, 0))?.flatten_all()?.to_vec1::<u8>()?;
    RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| Error::Inference("image buffer size mismatch".into()))
}
