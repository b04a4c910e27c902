use thiserror::Error;

pub const MISSING_FILES_MESSAGE: &str = "Please upload both a PDF and a JSON file.";
pub const WRONG_DOCUMENT_TYPE_MESSAGE: &str = "The first file must be a PDF.";
pub const WRONG_QUESTION_SET_TYPE_MESSAGE: &str = "The second file must be a JSON file.";
pub const INVALID_DOCUMENT_MESSAGE: &str = "Invalid PDF File";
pub const INVALID_QUESTION_SET_MESSAGE: &str = "Invalid Json File";
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Which of the two upload parts a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    Document,
    QuestionSet,
}

/// Request-level failures. Any of these aborts the whole request; no partial
/// answers are returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{}", MISSING_FILES_MESSAGE)]
    MissingFiles,

    #[error("{}", wrong_type_message(.slot))]
    WrongFileType { slot: UploadSlot },

    #[error("{}: {source}", INVALID_DOCUMENT_MESSAGE)]
    InvalidDocument { source: anyhow::Error },

    #[error("{}: {source}", INVALID_QUESTION_SET_MESSAGE)]
    InvalidQuestionSet { source: anyhow::Error },

    #[error("failed to store uploaded file: {0}")]
    Storage(#[from] std::io::Error),
}

impl PipelineError {
    /// Message shown to the caller. Never includes internal error detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::MissingFiles => MISSING_FILES_MESSAGE,
            PipelineError::WrongFileType { slot } => wrong_type_message(slot),
            PipelineError::InvalidDocument { .. } => INVALID_DOCUMENT_MESSAGE,
            PipelineError::InvalidQuestionSet { .. } => INVALID_QUESTION_SET_MESSAGE,
            PipelineError::Storage(_) => INTERNAL_ERROR_MESSAGE,
        }
    }

    /// True for failures on our side rather than problems with the upload.
    pub fn is_internal(&self) -> bool {
        matches!(self, PipelineError::Storage(_))
    }
}

fn wrong_type_message(slot: &UploadSlot) -> &'static str {
    match slot {
        UploadSlot::Document => WRONG_DOCUMENT_TYPE_MESSAGE,
        UploadSlot::QuestionSet => WRONG_QUESTION_SET_TYPE_MESSAGE,
    }
}
