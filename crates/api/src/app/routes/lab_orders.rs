use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;

use clinicore_clinical::{LabOrderId, LabOrderStatus};
use clinicore_records::PatientId;
use clinicore_store::{NewLabOrder, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_lab_order).get(list_lab_orders))
        .route("/:id", get(get_lab_order))
        .route("/:id/status", patch(set_lab_order_status))
}

pub async fn create_lab_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateLabOrderRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "lab-orders.write") {
        return resp;
    }

    let patient_id = match dto::required(body.patient_id, "patient_id")
        .and_then(|s| dto::parse_id(&s, "patient id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, patient_id).await
    {
        return resp;
    }

    let new = NewLabOrder {
        id: LabOrderId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        owner: ctx.provider_id(),
        test_name: body.test_name.unwrap_or_default(),
    };

    match services.lab_order_create(new, Utc::now()).await {
        Ok(o) => (StatusCode::CREATED, Json(dto::lab_order_to_json(&o))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_lab_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "lab-orders.read") {
        return resp;
    }
    let patient = match filter
        .patient_id
        .map(|s| dto::parse_id(&s, "patient id"))
        .transpose()
    {
        Ok(v) => v.map(PatientId::new),
        Err(resp) => return resp,
    };

    match services.lab_order_list(ctx.provider_id(), patient).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::lab_order_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_lab_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "lab-orders.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "lab order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::LabOrder, id).await {
        return resp;
    }

    match services.lab_order_get(LabOrderId::new(id)).await {
        Ok(o) => (StatusCode::OK, Json(dto::lab_order_to_json(&o))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn set_lab_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetLabOrderStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "lab-orders.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "lab order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: LabOrderStatus = match dto::required(body.status, "status")
        .and_then(|s| dto::parse_enum(&s, "lab order status"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::LabOrder, id).await {
        return resp;
    }

    match services
        .lab_order_set_status(LabOrderId::new(id), status, body.result, Utc::now())
        .await
    {
        Ok(o) => (StatusCode::OK, Json(dto::lab_order_to_json(&o))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
