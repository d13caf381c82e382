use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;

use clinicore_records::PatientId;
use clinicore_scheduling::{AppointmentId, AppointmentStatus};
use clinicore_store::{NewAppointment, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_appointment).get(list_appointments))
        .route("/:id", get(get_appointment).delete(delete_appointment))
        .route("/:id/status", patch(set_appointment_status))
}

pub async fn create_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateAppointmentRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "appointments.write") {
        return resp;
    }

    let patient_id = match dto::required(body.patient_id, "patient_id")
        .and_then(|s| dto::parse_id(&s, "patient id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scheduled_for = match dto::required(body.scheduled_for, "scheduled_for")
        .and_then(|s| dto::parse_rfc3339(&s, "scheduled_for"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, patient_id).await
    {
        return resp;
    }

    let new = NewAppointment {
        id: AppointmentId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        owner: ctx.provider_id(),
        scheduled_for,
        reason: body.reason,
    };

    match services.appointment_create(new, Utc::now()).await {
        Ok(a) => (StatusCode::CREATED, Json(dto::appointment_to_json(&a))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_appointments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "appointments.read") {
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

    match services.appointment_list(ctx.provider_id(), patient).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::appointment_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "appointments.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "appointment id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Appointment, id).await
    {
        return resp;
    }

    match services.appointment_get(AppointmentId::new(id)).await {
        Ok(a) => (StatusCode::OK, Json(dto::appointment_to_json(&a))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn set_appointment_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "appointments.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "appointment id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: AppointmentStatus = match dto::required(body.status, "status")
        .and_then(|s| dto::parse_enum(&s, "appointment status"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Appointment, id).await
    {
        return resp;
    }

    match services
        .appointment_set_status(AppointmentId::new(id), status, Utc::now())
        .await
    {
        Ok(a) => (StatusCode::OK, Json(dto::appointment_to_json(&a))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "appointments.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "appointment id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Appointment, id).await
    {
        return resp;
    }

    match services.appointment_delete(AppointmentId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
