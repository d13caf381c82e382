use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use chrono::Utc;

use clinicore_records::{EnrollmentId, PatientId, ProgramId};
use clinicore_store::{NewEnrollment, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_enrollment).get(list_enrollments))
        .route("/:id", delete(delete_enrollment))
}

pub async fn create_enrollment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateEnrollmentRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "enrollments.write") {
        return resp;
    }

    let patient_id = match dto::required(body.patient_id, "patient_id")
        .and_then(|s| dto::parse_id(&s, "patient id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let program_id = match dto::required(body.program_id, "program_id")
        .and_then(|s| dto::parse_id(&s, "program id"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Both referenced rows must be the caller's.
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, patient_id).await
    {
        return resp;
    }
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Program, program_id).await
    {
        return resp;
    }

    let new = NewEnrollment {
        id: EnrollmentId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        program_id: ProgramId::new(program_id),
    };

    match services.enrollment_create(new, Utc::now()).await {
        Ok(e) => (StatusCode::CREATED, Json(dto::enrollment_to_json(&e))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_enrollments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "enrollments.read") {
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
    let program = match filter
        .program_id
        .map(|s| dto::parse_id(&s, "program id"))
        .transpose()
    {
        Ok(v) => v.map(ProgramId::new),
        Err(resp) => return resp,
    };

    match services
        .enrollment_list(ctx.provider_id(), patient, program)
        .await
    {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::enrollment_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_enrollment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "enrollments.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "enrollment id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Enrollments are guarded through their patient's ownership.
    let enrollment = match services.enrollment_get(EnrollmentId::new(id)).await {
        Ok(e) => e,
        Err(e) => return errors::store_error_to_response(e),
    };
    if let Err(resp) =
        authz::require_access(&services, &ctx, OwnedResource::Patient, enrollment.patient_id.0)
            .await
    {
        return resp;
    }

    match services.enrollment_delete(EnrollmentId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
