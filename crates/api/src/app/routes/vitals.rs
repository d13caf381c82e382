use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use clinicore_clinical::VitalsId;
use clinicore_records::PatientId;
use clinicore_store::{NewVitals, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new().route("/", post(record_vitals).get(list_vitals))
}

pub async fn record_vitals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateVitalsRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "vitals.write") {
        return resp;
    }

    let patient_id = match dto::required(body.patient_id, "patient_id")
        .and_then(|s| dto::parse_id(&s, "patient id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let recorded_at = match body
        .recorded_at
        .map(|s| dto::parse_rfc3339(&s, "recorded_at"))
        .transpose()
    {
        Ok(v) => v.unwrap_or_else(Utc::now),
        Err(resp) => return resp,
    };

    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, patient_id).await
    {
        return resp;
    }

    let new = NewVitals {
        id: VitalsId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        recorded_at,
        systolic_mmhg: body.systolic_mmhg,
        diastolic_mmhg: body.diastolic_mmhg,
        heart_rate_bpm: body.heart_rate_bpm,
        temperature_tenths_c: body.temperature_tenths_c,
        weight_grams: body.weight_grams,
        height_mm: body.height_mm,
    };

    match services.vitals_record(new).await {
        Ok(v) => (StatusCode::CREATED, Json(dto::vitals_to_json(&v))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_vitals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "vitals.read") {
        return resp;
    }

    // Vitals are always read in a patient's context.
    let patient_id = match dto::required(filter.patient_id, "patient_id")
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

    match services.vitals_list(PatientId::new(patient_id)).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::vitals_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
