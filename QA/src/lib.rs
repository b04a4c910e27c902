pub mod config;
pub mod document_processor;
pub mod error;
pub mod models;
pub mod openai_service;
pub mod pipeline;
pub mod token_counter;
pub mod upload_store;

pub use config::Config;
pub use document_processor::{PdfTextExtractor, TextExtractor};
pub use error::{PipelineError, UploadSlot};
pub use models::*;
pub use openai_service::{AnswerGenerator, OpenAiService};
pub use pipeline::{QaPipeline, GENERATION_FAILED_SENTINEL, TOKEN_LIMIT_SENTINEL};
pub use token_counter::{TiktokenCounter, TokenCounter};
pub use upload_store::UploadStore;
