use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use clinicore_pharmacy::{BatchId, MedicineId};
use clinicore_store::NewBatch;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new().route("/", post(receive_batch).get(list_batches))
}

pub async fn receive_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateBatchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "batches.write") {
        return resp;
    }

    let medicine_id = match dto::required(body.medicine_id, "medicine_id")
        .and_then(|s| dto::parse_id(&s, "medicine id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let expiry_date = match dto::required(body.expiry_date, "expiry_date")
        .and_then(|s| dto::parse_date(&s, "expiry_date"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let new = NewBatch {
        id: BatchId::new(clinicore_core::RecordId::new()),
        medicine_id: MedicineId::new(medicine_id),
        batch_number: body.batch_number.unwrap_or_default(),
        quantity: body.quantity.unwrap_or(0),
        expiry_date,
    };

    match services.batch_receive(new, Utc::now()).await {
        Ok(b) => (StatusCode::CREATED, Json(dto::batch_to_json(&b))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_batches(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "batches.read") {
        return resp;
    }
    let medicine = match filter
        .medicine_id
        .map(|s| dto::parse_id(&s, "medicine id"))
        .transpose()
    {
        Ok(v) => v.map(MedicineId::new),
        Err(resp) => return resp,
    };

    match services.batch_list(medicine).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::batch_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
