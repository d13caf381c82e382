use std::sync::Arc;

use axum::{
    Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::get,
};
use chrono::Utc;

use clinicore_core::DayRange;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new().route("/", get(summary))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "analytics.read") {
        return resp;
    }

    let day = DayRange::containing(Utc::now());
    match services.analytics(ctx.provider_id(), day).await {
        Ok(s) => (StatusCode::OK, Json(dto::analytics_to_json(&s))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
