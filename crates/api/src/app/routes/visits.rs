use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use clinicore_clinical::VisitId;
use clinicore_records::PatientId;
use clinicore_store::{NewVisit, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_visit).get(list_visits))
        .route("/:id", get(get_visit))
}

pub async fn create_visit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateVisitRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "visits.write") {
        return resp;
    }

    let patient_id = match dto::required(body.patient_id, "patient_id")
        .and_then(|s| dto::parse_id(&s, "patient id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let now = Utc::now();
    let occurred_at = match body
        .occurred_at
        .map(|s| dto::parse_rfc3339(&s, "occurred_at"))
        .transpose()
    {
        Ok(v) => v.unwrap_or(now),
        Err(resp) => return resp,
    };

    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, patient_id).await
    {
        return resp;
    }

    let new = NewVisit {
        id: VisitId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        owner: ctx.provider_id(),
        occurred_at,
        chief_complaint: body.chief_complaint.unwrap_or_default(),
        notes: body.notes,
        diagnosis: body.diagnosis,
    };

    match services.visit_create(new, now).await {
        Ok(v) => (StatusCode::CREATED, Json(dto::visit_to_json(&v))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_visits(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "visits.read") {
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

    match services.visit_list(ctx.provider_id(), patient).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::visit_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_visit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "visits.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "visit id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Visit, id).await {
        return resp;
    }

    match services.visit_get(VisitId::new(id)).await {
        Ok(v) => (StatusCode::OK, Json(dto::visit_to_json(&v))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
