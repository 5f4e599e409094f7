use axum::{Router, routing::get};

pub mod products;
pub mod system;
pub mod upload;

/// Routes under `/api`. Paths are registered in their trailing-slash form;
/// a `"/"` route inside `nest` would only answer the bare prefix.
pub fn router() -> Router {
    Router::new()
        .route("/api/", get(system::api_root))
        .merge(products::router())
}
