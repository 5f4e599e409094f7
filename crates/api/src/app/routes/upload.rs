use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Multipart, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};

use catalog_ingest::UploadedFile;

use crate::app::errors;
use crate::app::services::AppServices;

/// Multipart field carrying the uploaded spreadsheets; may repeat.
const FILE_FIELD: &str = "file";

/// `POST /api/products/upload/`
///
/// A request that is not multipart at all is treated as carrying no files.
pub async fn upload_products(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    let files = match multipart {
        Ok(multipart) => match collect_files(multipart).await {
            Ok(files) => files,
            Err(resp) => return resp,
        },
        Err(_) => Vec::new(),
    };

    match services.ingestor.ingest_batch(&files).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::ingest_error_to_response(e),
    }
}

async fn collect_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>, axum::response::Response> {
    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(errors::json_error(e.status(), "invalid_multipart", e.body_text()));
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(errors::json_error(e.status(), "invalid_multipart", e.body_text()));
            }
        };
        files.push(UploadedFile::new(name, bytes.to_vec()));
    }
    Ok(files)
}
