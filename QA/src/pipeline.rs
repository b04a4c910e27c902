use crate::config::Config;
use crate::document_processor::{PdfTextExtractor, TextExtractor};
use crate::error::{PipelineError, UploadSlot};
use crate::models::*;
use crate::openai_service::{AnswerGenerator, OpenAiService};
use crate::token_counter::{TiktokenCounter, TokenCounter};
use crate::upload_store::{StoredUpload, UploadStore};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub const TOKEN_LIMIT_SENTINEL: &str = "max token excceded";
pub const GENERATION_FAILED_SENTINEL: &str = "Error in genrating answer";

pub const DOCUMENT_EXTENSION: &str = ".pdf";
pub const QUESTION_SET_EXTENSION: &str = ".json";

/// Upload → extract → answer, one request at a time per call to [`QaPipeline::run`].
pub struct QaPipeline {
    config: Arc<Config>,
    store: UploadStore,
    extractor: Arc<dyn TextExtractor>,
    counter: Arc<dyn TokenCounter>,
    generator: Arc<dyn AnswerGenerator>,
}

impl QaPipeline {
    pub fn new(
        config: Arc<Config>,
        extractor: Arc<dyn TextExtractor>,
        counter: Arc<dyn TokenCounter>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let store = UploadStore::new(config.upload_dir.clone());
        Self {
            config,
            store,
            extractor,
            counter,
            generator,
        }
    }

    /// Wires the production collaborators: pdf-extract, tiktoken and OpenAI.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let counter = TiktokenCounter::for_model(&config.model)?;
        let generator = OpenAiService::new(&config);

        Ok(Self::new(
            config,
            Arc::new(PdfTextExtractor::new()),
            Arc::new(counter),
            Arc::new(generator),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, upload: UploadRequest) -> Result<Vec<AnswerRecord>, PipelineError> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        let (document, question_set) = validate_upload(&upload).map_err(|e| {
            log::info!("[{}] Rejected upload: {}", request_id, e);
            e
        })?;

        let stored_document = self.persist(request_id, document, DOCUMENT_EXTENSION)?;
        let stored_questions = self.persist(request_id, question_set, QUESTION_SET_EXTENSION)?;

        let document_text = self.extract_text(&stored_document).await.map_err(|source| {
            log::warn!("[{}] Could not extract '{}': {:#}", request_id, document.filename, source);
            PipelineError::InvalidDocument { source }
        })?;

        let questions = read_questions(stored_questions.path()).map_err(|source| {
            log::warn!("[{}] Could not parse '{}': {:#}", request_id, question_set.filename, source);
            PipelineError::InvalidQuestionSet { source }
        })?;

        log::info!(
            "[{}] Answering {} questions from '{}' ({} chars)",
            request_id,
            questions.len(),
            document.filename,
            document_text.chars().count()
        );

        let answers = self.answer_all(request_id, &document_text, &questions).await;

        log::info!(
            "[{}] Produced {} answers in {} ms",
            request_id,
            answers.len(),
            start_time.elapsed().as_millis()
        );
        Ok(answers)
    }

    /// Answers every question against `document_text`, in order. Never fails:
    /// per-question problems become sentinel answers.
    async fn answer_all(&self, request_id: Uuid, document_text: &str, questions: &[String]) -> Vec<AnswerRecord> {
        let system_prompt = self.config.render_prompt(document_text);
        let mut answers = Vec::with_capacity(questions.len());

        for (index, question) in questions.iter().enumerate() {
            let messages = [Message::system(system_prompt.as_str()), Message::user(question.as_str())];
            let answer = self.answer_one(request_id, index, &messages).await;
            answers.push(AnswerRecord {
                question: question.clone(),
                answer,
            });
        }

        answers
    }

    async fn answer_one(&self, request_id: Uuid, index: usize, messages: &[Message]) -> String {
        let token_count = self.counter.count(messages);
        log::debug!("[{}] Question {} uses {} tokens", request_id, index, token_count);

        if token_count > self.config.max_token_limit {
            log::info!(
                "[{}] Question {} skipped: {} tokens exceeds limit of {}",
                request_id,
                index,
                token_count,
                self.config.max_token_limit
            );
            return TOKEN_LIMIT_SENTINEL.to_string();
        }

        let completion = self.generator.generate(messages).await;
        if let Some(answer) = completion.first_answer() {
            return answer.to_string();
        }

        match &completion {
            Completion::Failure { detail, .. } => {
                log::warn!("[{}] Question {} failed: {}", request_id, index, detail);
            }
            Completion::Success(_) => {
                log::warn!("[{}] Question {} got a completion with no answer", request_id, index);
            }
        }
        GENERATION_FAILED_SENTINEL.to_string()
    }

    fn persist(&self, request_id: Uuid, upload: &UploadedFile, extension: &str) -> Result<StoredUpload, PipelineError> {
        self.store.persist(upload, extension).map_err(|e| {
            log::error!(
                "[{}] Failed to store '{}' in {}: {}",
                request_id,
                upload.filename,
                self.store.dir().display(),
                e
            );
            PipelineError::Storage(e)
        })
    }

    async fn extract_text(&self, stored: &StoredUpload) -> Result<String> {
        let extractor = Arc::clone(&self.extractor);
        let path = stored.path().to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .context("text extraction task did not complete")?
    }
}

/// Checks that both parts are present and carry the expected extensions,
/// document first.
pub fn validate_upload(upload: &UploadRequest) -> Result<(&UploadedFile, &UploadedFile), PipelineError> {
    let (Some(document), Some(question_set)) = (&upload.document, &upload.question_set) else {
        return Err(PipelineError::MissingFiles);
    };

    if !has_extension(&document.filename, DOCUMENT_EXTENSION) {
        return Err(PipelineError::WrongFileType {
            slot: UploadSlot::Document,
        });
    }
    if !has_extension(&question_set.filename, QUESTION_SET_EXTENSION) {
        return Err(PipelineError::WrongFileType {
            slot: UploadSlot::QuestionSet,
        });
    }

    Ok((document, question_set))
}

fn has_extension(filename: &str, extension: &str) -> bool {
    filename.to_lowercase().ends_with(extension)
}

/// Decodes a question set. Anything other than a JSON array of strings is rejected.
pub fn parse_questions(bytes: &[u8]) -> Result<Vec<String>> {
    serde_json::from_slice(bytes).context("question set must be a JSON array of strings")
}

fn read_questions(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_questions(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedExtractor(std::result::Result<String, String>);

    impl TextExtractor for FixedExtractor {
        fn extract(&self, _path: &Path) -> Result<String> {
            self.0.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    struct PanickingExtractor;

    impl TextExtractor for PanickingExtractor {
        fn extract(&self, _path: &Path) -> Result<String> {
            panic!("corrupt xref table");
        }
    }

    /// Ten tokens per message, a million if the question mentions LONG.
    struct KeywordCounter;

    impl TokenCounter for KeywordCounter {
        fn count(&self, messages: &[Message]) -> usize {
            if messages.iter().any(|m| m.role == Role::User && m.content.contains("LONG")) {
                1_000_000
            } else {
                10 * messages.len()
            }
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Echo,
        Fail,
        NoChoices,
    }

    struct RecordingGenerator {
        reply: Reply,
        calls: Mutex<Vec<Vec<Message>>>,
    }

    impl RecordingGenerator {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn generate(&self, messages: &[Message]) -> Completion {
            self.calls.lock().unwrap().push(messages.to_vec());
            match self.reply {
                Reply::Echo => {
                    let body = serde_json::json!({
                        "id": "chatcmpl-test",
                        "choices": [{
                            "index": 0,
                            "message": {"role": "assistant", "content": format!("answer to {}", messages[1].content)},
                            "finish_reason": "stop"
                        }]
                    });
                    Completion::Success(serde_json::from_value(body).unwrap())
                }
                Reply::Fail => Completion::Failure {
                    message: "Something went wrong. Please try again later.".to_string(),
                    detail: "connection reset".to_string(),
                },
                Reply::NoChoices => {
                    Completion::Success(serde_json::from_str(r#"{"choices": []}"#).unwrap())
                }
            }
        }
    }

    struct Harness {
        pipeline: QaPipeline,
        generator: Arc<RecordingGenerator>,
        upload_dir: TempDir,
    }

    fn harness_with(extractor: Arc<dyn TextExtractor>, reply: Reply) -> Harness {
        let upload_dir = tempfile::tempdir().unwrap();
        let mut config = Config::new("sk-test");
        config.upload_dir = upload_dir.path().to_path_buf();
        config.max_token_limit = 100;
        config.prompt_template = "SOURCE: {}".to_string();

        let generator = RecordingGenerator::new(reply);
        let pipeline = QaPipeline::new(
            Arc::new(config),
            extractor,
            Arc::new(KeywordCounter),
            generator.clone(),
        );
        Harness {
            pipeline,
            generator,
            upload_dir,
        }
    }

    fn harness(reply: Reply) -> Harness {
        harness_with(Arc::new(FixedExtractor(Ok("The sky is blue.".to_string()))), reply)
    }

    fn upload(pdf_name: &str, json_name: &str, questions: &str) -> UploadRequest {
        UploadRequest {
            document: Some(UploadedFile::new(pdf_name, b"%PDF-1.4 fake".to_vec())),
            question_set: Some(UploadedFile::new(json_name, questions.as_bytes().to_vec())),
        }
    }

    #[tokio::test]
    async fn answers_follow_question_order() {
        let h = harness(Reply::Echo);
        let answers = h
            .pipeline
            .run(upload("doc.pdf", "q.json", r#"["first?", "second?", "third?"]"#))
            .await
            .unwrap();

        assert_eq!(
            answers,
            vec![
                AnswerRecord { question: "first?".into(), answer: "answer to first?".into() },
                AnswerRecord { question: "second?".into(), answer: "answer to second?".into() },
                AnswerRecord { question: "third?".into(), answer: "answer to third?".into() },
            ]
        );
        assert_eq!(h.generator.call_count(), 3);
    }

    #[tokio::test]
    async fn system_message_carries_document_text() {
        let h = harness(Reply::Echo);
        h.pipeline
            .run(upload("doc.pdf", "q.json", r#"["colour?"]"#))
            .await
            .unwrap();

        let calls = h.generator.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec![Message::system("SOURCE: The sky is blue."), Message::user("colour?")]
        );
    }

    #[tokio::test]
    async fn missing_part_is_rejected_without_calls() {
        let h = harness(Reply::Echo);
        let mut request = upload("doc.pdf", "q.json", r#"["q"]"#);
        request.question_set = None;

        let err = h.pipeline.run(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingFiles));

        let err = h.pipeline.run(UploadRequest::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingFiles));
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn wrong_extensions_name_the_slot() {
        let h = harness(Reply::Echo);

        let err = h.pipeline.run(upload("doc.docx", "q.json", "[]")).await.unwrap_err();
        assert!(matches!(err, PipelineError::WrongFileType { slot: UploadSlot::Document }));

        let err = h.pipeline.run(upload("doc.pdf", "q.txt", "[]")).await.unwrap_err();
        assert!(matches!(err, PipelineError::WrongFileType { slot: UploadSlot::QuestionSet }));

        // The document slot is checked first.
        let err = h.pipeline.run(upload("doc.txt", "q.txt", "[]")).await.unwrap_err();
        assert!(matches!(err, PipelineError::WrongFileType { slot: UploadSlot::Document }));
    }

    #[tokio::test]
    async fn extension_check_ignores_case() {
        let h = harness(Reply::Echo);
        let answers = h
            .pipeline
            .run(upload("REPORT.PDF", "Questions.JSON", r#"["q"]"#))
            .await
            .unwrap();
        assert_eq!(answers.len(), 1);
    }

    #[tokio::test]
    async fn over_budget_question_is_not_sent() {
        let h = harness(Reply::Echo);
        let answers = h
            .pipeline
            .run(upload("doc.pdf", "q.json", r#"["short", "a LONG one", "also short"]"#))
            .await
            .unwrap();

        assert_eq!(answers[0].answer, "answer to short");
        assert_eq!(answers[1].answer, "max token excceded");
        assert_eq!(answers[2].answer, "answer to also short");
        assert_eq!(h.generator.call_count(), 2);
    }

    #[tokio::test]
    async fn budget_is_inclusive_of_the_limit() {
        let h = harness(Reply::Echo);
        // KeywordCounter gives 20 tokens for two messages.
        let mut config = h.pipeline.config().clone();
        config.max_token_limit = 20;
        let pipeline = QaPipeline::new(
            Arc::new(config),
            Arc::new(FixedExtractor(Ok("text".to_string()))),
            Arc::new(KeywordCounter),
            h.generator.clone(),
        );

        let answers = pipeline.answer_all(Uuid::new_v4(), "text", &["q".to_string()]).await;
        assert_eq!(answers[0].answer, "answer to q");
    }

    #[tokio::test]
    async fn generator_failure_becomes_sentinel() {
        let h = harness(Reply::Fail);
        let answers = h
            .pipeline
            .run(upload("doc.pdf", "q.json", r#"["one", "two"]"#))
            .await
            .unwrap();

        assert_eq!(answers.len(), 2);
        assert!(answers.iter().all(|a| a.answer == "Error in genrating answer"));
        assert_eq!(h.generator.call_count(), 2);
    }

    #[tokio::test]
    async fn success_without_choices_becomes_sentinel() {
        let h = harness(Reply::NoChoices);
        let answers = h.pipeline.answer_all(Uuid::new_v4(), "text", &["q".to_string()]).await;
        assert_eq!(answers[0].answer, GENERATION_FAILED_SENTINEL);
    }

    #[tokio::test]
    async fn extraction_error_aborts_request() {
        let h = harness_with(Arc::new(FixedExtractor(Err("not a PDF".to_string()))), Reply::Echo);
        let err = h
            .pipeline
            .run(upload("doc.pdf", "q.json", r#"["q"]"#))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidDocument { .. }));
        assert_eq!(err.user_message(), "Invalid PDF File");
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn extractor_panic_is_an_invalid_document() {
        let h = harness_with(Arc::new(PanickingExtractor), Reply::Echo);
        let err = h
            .pipeline
            .run(upload("doc.pdf", "q.json", r#"["q"]"#))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDocument { .. }));
    }

    #[tokio::test]
    async fn malformed_question_set_aborts_request() {
        let h = harness(Reply::Echo);
        for body in [r#"["unterminated"#, r#"{"question": "x"}"#, "[1, 2, 3]", r#""just a string""#] {
            let err = h.pipeline.run(upload("doc.pdf", "q.json", body)).await.unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidQuestionSet { .. }),
                "body {body} should be rejected"
            );
            assert_eq!(err.user_message(), "Invalid Json File");
        }
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_question_list_yields_empty_answers() {
        let h = harness(Reply::Echo);
        let answers = h.pipeline.run(upload("doc.pdf", "q.json", "[]")).await.unwrap();
        assert!(answers.is_empty());
    }

    #[tokio::test]
    async fn stored_uploads_are_removed_after_the_request() {
        let h = harness(Reply::Echo);
        h.pipeline
            .run(upload("doc.pdf", "q.json", r#"["q"]"#))
            .await
            .unwrap();
        let _ = h
            .pipeline
            .run(upload("doc.pdf", "q.json", "not json"))
            .await
            .unwrap_err();

        let leftovers = fs::read_dir(h.upload_dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn parse_questions_accepts_string_arrays() {
        let questions = parse_questions(br#"["What is covered?", "Who pays?"]"#).unwrap();
        assert_eq!(questions, vec!["What is covered?", "Who pays?"]);
    }
}
