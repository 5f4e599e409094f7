use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Index of the available endpoints.
pub async fn api_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "products": "/api/products/",
        "product_detail": "/api/products/{id}/",
        "product_upload": "/api/products/upload/",
    }))
}
