use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PROMPT_TEMPLATE: &str = concat!(
    "You are an AI assistant who help user to answer user question from below source. \n",
    "    You answer should be concise and to the point. Do not generate answer if you can not find it in from below source.\n",
    "    If you are unable to find answer from source below reply with 'I dont Know'. \n",
    "    <source>\n",
    "    {}\n",
    "    </source>\n",
    "    ",
);

const PROMPT_SLOT: &str = "{}";

/// Process-wide settings, read once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub upload_dir: PathBuf,
    pub max_token_limit: usize,
    pub prompt_template: String,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            openai_base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            upload_dir: PathBuf::from("pdfs"),
            max_token_limit: 14000,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(dir) = lookup("UPLOAD_FOLDER") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(limit) = lookup("MAX_TOKEN_LIMIT") {
            config.max_token_limit = parse_var("MAX_TOKEN_LIMIT", &limit)?;
        }
        if let Some(template) = lookup("PROMPT_TEMPLATE") {
            config.prompt_template = template;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(bytes) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", &bytes)?;
        }

        if !config.prompt_template.contains(PROMPT_SLOT) {
            anyhow::bail!("PROMPT_TEMPLATE must contain a '{}' slot for the document text", PROMPT_SLOT);
        }

        Ok(config)
    }

    /// System prompt with the document text in the template's slot.
    pub fn render_prompt(&self, document_text: &str) -> String {
        self.prompt_template.replacen(PROMPT_SLOT, document_text, 1)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{name} must be a non-negative integer, got '{raw}'"))
}
