use crate::form::UPLOAD_FORM;
use crate::qa_response::QaError;
use crate::upload_request::read_upload;
use crate::AppState;
use qa_system::UploadRequest;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// A request that is not a multipart form at all carries neither file, so it
/// is answered like any other upload with both parts missing.
pub async fn answer_questions(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let upload = match multipart {
        Ok(mut multipart) => match read_upload(&mut multipart).await {
            Ok(upload) => upload,
            Err(e) => {
                log::warn!("Malformed multipart body: {}", e);
                return e.into_response();
            }
        },
        Err(MultipartRejection::InvalidBoundary(e)) => {
            log::info!("POST without a multipart body: {}", e);
            UploadRequest::default()
        }
        Err(e) => return e.into_response(),
    };

    match state.pipeline.run(upload).await {
        Ok(answers) => Json(answers).into_response(),
        Err(e) => QaError::from(e).into_response(),
    }
}
