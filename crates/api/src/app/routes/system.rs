use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::ProviderContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<ProviderContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "principal_id": ctx.principal_id().to_string(),
        "provider_id": ctx.provider_id().to_string(),
        "roles": ctx.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}
