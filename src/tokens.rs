//! Token counting backed by a Hugging Face tokenizer.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokenizers::Tokenizer;

/// Model repo whose tokenizer.json is fetched when no local tokenizer is
/// given.
pub const DEFAULT_TOKENIZER_REPO: &str = "openai-community/gpt2";

pub struct TokenCounter {
    tokenizer: Tokenizer,
}

impl TokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path.as_ref())
            .map_err(|e| anyhow!("failed to load tokenizer: {e}"))?;
        Ok(Self { tokenizer })
    }

    /// Fetch `tokenizer.json` from a Hub model repo and load it. Downloads
    /// are cached by hf-hub.
    pub fn from_hub(repo_id: &str) -> Result<Self> {
        let api = hf_hub::api::sync::Api::new().context("failed to build hf-hub API")?;
        let path = api
            .model(repo_id.to_string())
            .get("tokenizer.json")
            .with_context(|| format!("failed to download tokenizer.json from '{repo_id}'"))?;
        Self::from_file(path)
    }

    /// Number of tokens in `text`, without special tokens.
    pub fn count(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        Ok(encoding.get_ids().len())
    }
}
