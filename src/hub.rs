//! HuggingFace Hub downloads.
//!
//! Thin wrappers over the sync `hf-hub` API: optional bearer token from the
//! environment, and sharded-safetensors resolution through the index file
//! with a single-file fallback.

use std::collections::HashSet;
use std::path::PathBuf;

use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};

use crate::{Error, Result};

/// Build a Hub API handle, authenticated when a token is provided.
pub fn api(token: Option<String>) -> Result<Api> {
    ApiBuilder::new()
        .with_token(token)
        .build()
        .map_err(|e| Error::HfHub(e.to_string()))
}

/// Fetch a single file from a model repo, returning its cached path.
pub fn fetch(api: &Api, repo_id: &str, filename: &str) -> Result<PathBuf> {
    api.model(repo_id.to_string())
        .get(filename)
        .map_err(|e| Error::HfHub(format!("{repo_id}/{filename}: {e}")))
}

/// Resolve the safetensors weight files of a repo.
///
/// Prefers `model.safetensors.index.json` (sharded checkpoints), falling back
/// to a single `model.safetensors`.
pub fn fetch_weights(api: &Api, repo_id: &str) -> Result<Vec<PathBuf>> {
    let repo = api.model(repo_id.to_string());
    match repo.get("model.safetensors.index.json") {
        Ok(index_path) => sharded_weights(&repo, repo_id, &index_path),
        Err(_) => {
            let single = repo
                .get("model.safetensors")
                .map_err(|e| Error::HfHub(format!("{repo_id}/model.safetensors: {e}")))?;
            Ok(vec![single])
        }
    }
}

fn sharded_weights(repo: &ApiRepo, repo_id: &str, index_path: &PathBuf) -> Result<Vec<PathBuf>> {
    let index: serde_json::Value = serde_json::from_reader(std::fs::File::open(index_path)?)?;
    let weight_map = index
        .get("weight_map")
        .and_then(|v| v.as_object())
        .ok_or_else(|| Error::HfHub(format!("{repo_id}: index file has no weight_map")))?;

    let mut files: HashSet<&str> = HashSet::new();
    for value in weight_map.values() {
        if let Some(file) = value.as_str() {
            files.insert(file);
        }
    }

    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = repo
            .get(file)
            .map_err(|e| Error::HfHub(format!("{repo_id}/{file}: {e}")))?;
        paths.push(path);
    }
    Ok(paths)
}
