use axum::extract::multipart::{Multipart, MultipartError};
use qa_system::{UploadRequest, UploadedFile};

pub const DOCUMENT_FIELD: &str = "pdf_doc";
pub const QUESTION_SET_FIELD: &str = "json_doc";

/// Collects the `pdf_doc` and `json_doc` file parts of a multipart body.
///
/// Only parts sent with a filename count as files. If a field name repeats,
/// the first part wins and the rest are skipped.
pub async fn read_upload(multipart: &mut Multipart) -> Result<UploadRequest, MultipartError> {
    let mut upload = UploadRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let Some(filename) = field.file_name().map(str::to_owned) else {
            log::debug!("Ignoring non-file field '{}'", name);
            continue;
        };

        let slot = match name.as_str() {
            DOCUMENT_FIELD => &mut upload.document,
            QUESTION_SET_FIELD => &mut upload.question_set,
            _ => {
                log::debug!("Ignoring unexpected file field '{}'", name);
                continue;
            }
        };
        if slot.is_some() {
            continue;
        }

        let bytes = field.bytes().await?;
        *slot = Some(UploadedFile::new(filename, bytes.to_vec()));
    }

    Ok(upload)
}
