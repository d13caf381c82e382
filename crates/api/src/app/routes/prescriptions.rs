use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use clinicore_clinical::PrescriptionId;
use clinicore_pharmacy::MedicineId;
use clinicore_records::PatientId;
use clinicore_store::{NewPrescription, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_prescription).get(list_prescriptions))
        .route("/:id", get(get_prescription))
        .route("/:id/dispense", post(dispense_prescription))
        .route("/:id/cancel", post(cancel_prescription))
}

pub async fn create_prescription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreatePrescriptionRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "prescriptions.write") {
        return resp;
    }

    let patient_id = match dto::required(body.patient_id, "patient_id")
        .and_then(|s| dto::parse_id(&s, "patient id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let medicine_id = match dto::required(body.medicine_id, "medicine_id")
        .and_then(|s| dto::parse_id(&s, "medicine id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, patient_id).await
    {
        return resp;
    }

    let new = NewPrescription {
        id: PrescriptionId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        owner: ctx.provider_id(),
        medicine_id: MedicineId::new(medicine_id),
        quantity: body.quantity.unwrap_or(0),
        dosage: body.dosage.unwrap_or_default(),
    };

    match services.prescription_create(new, Utc::now()).await {
        Ok(p) => (StatusCode::CREATED, Json(dto::prescription_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_prescriptions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "prescriptions.read") {
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

    // Dispensing staff see the whole clinic's queue; prescribers see their
    // own orders.
    let owner = if authz::has_permission(&ctx, "prescriptions.dispense") {
        None
    } else {
        Some(ctx.provider_id())
    };

    match services.prescription_list(owner, patient).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::prescription_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_prescription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "prescriptions.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "prescription id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !authz::has_permission(&ctx, "prescriptions.dispense") {
        if let Err(resp) =
            authz::require_access(&services, &ctx, OwnedResource::Prescription, id).await
        {
            return resp;
        }
    }

    match services.prescription_get(PrescriptionId::new(id)).await {
        Ok(p) => (StatusCode::OK, Json(dto::prescription_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn dispense_prescription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "prescriptions.dispense") {
        return resp;
    }
    let id = match dto::parse_id(&id, "prescription id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .prescription_dispense(PrescriptionId::new(id), Utc::now())
        .await
    {
        Ok(p) => (StatusCode::OK, Json(dto::prescription_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn cancel_prescription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "prescriptions.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "prescription id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Prescription, id).await
    {
        return resp;
    }

    match services
        .prescription_cancel(PrescriptionId::new(id), Utc::now())
        .await
    {
        Ok(p) => (StatusCode::OK, Json(dto::prescription_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
