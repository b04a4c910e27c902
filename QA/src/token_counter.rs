use crate::models::Message;
use anyhow::Result;
use tiktoken_rs::CoreBPE;

/// Counts the tokens a model would consume for a message list.
pub trait TokenCounter: Send + Sync {
    fn count(&self, messages: &[Message]) -> usize;
}

/// BPE token counting for a specific model. Only role and content strings
/// are counted; per-message framing tokens are not added. Text that looks
/// like a special token (`<|endoftext|>`) is counted as ordinary text.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Loads the encoding for `model`. Building the BPE is slow, so do this
    /// once at startup and share the counter.
    pub fn for_model(model: &str) -> Result<Self> {
        log::info!("Loading tokenizer for model {}", model);
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| anyhow::anyhow!("no tokenizer available for model '{}': {}", model, e))?;
        Ok(Self { bpe })
    }

    fn tokens_in(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| self.tokens_in(m.role.as_str()) + self.tokens_in(&m.content))
            .sum()
    }
}
