use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qa_system::{ErrorResponse, PipelineError};

/// Renders a pipeline failure as the flat `{"Success": false, "Message": ..}`
/// body. Upload problems are reported with 200, our own failures with 500.
pub struct QaError(pub PipelineError);

impl From<PipelineError> for QaError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for QaError {
    fn into_response(self) -> Response {
        let status = if self.0.is_internal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };
        (status, Json(ErrorResponse::new(self.0.user_message()))).into_response()
    }
}
