use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One answered question, in the order the questions were uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// The two file parts of an upload. Either may be missing; the pipeline
/// decides what that means.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub document: Option<UploadedFile>,
    pub question_set: Option<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Every other field of the response body, kept as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Outcome of a single completion call.
#[derive(Debug, Clone)]
pub enum Completion {
    Success(ChatCompletionResponse),
    Failure { message: String, detail: String },
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Success(_))
    }

    /// Text of the first generated choice, if the call succeeded and produced one.
    pub fn first_answer(&self) -> Option<&str> {
        match self {
            Completion::Success(response) => response
                .choices
                .first()
                .and_then(|c| c.message.content.as_deref()),
            Completion::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Message")]
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let messages = vec![Message::system("be brief"), Message::user("why?")];
        let json = serde_json::to_value(&messages).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "why?"}
            ])
        );
    }

    #[test]
    fn completion_response_keeps_unknown_fields() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-3.5-turbo",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "42"}, "finish_reason": "stop"}],
            "usage": {"total_tokens": 10}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.extra["id"], "chatcmpl-1");
        assert_eq!(response.extra["usage"]["total_tokens"], 10);

        let completion = Completion::Success(response);
        assert_eq!(completion.first_answer(), Some("42"));
    }

    #[test]
    fn completion_without_choices_has_no_answer() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"error": {"message": "bad key"}}"#).unwrap();
        let completion = Completion::Success(response);
        assert!(completion.is_success());
        assert_eq!(completion.first_answer(), None);
    }

    #[test]
    fn error_response_uses_capitalised_keys() {
        let json = serde_json::to_value(ErrorResponse::new("Invalid PDF File")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Success": false, "Message": "Invalid PDF File"})
        );
    }
}
