use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use clinicore_records::{Demographics, PatientId};
use clinicore_store::{NewPatient, OwnedResource, PatientUpdate};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_patient).get(list_patients))
        .route(
            "/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}

pub async fn create_patient(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreatePatientRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "patients.write") {
        return resp;
    }

    let new = NewPatient {
        id: PatientId::new(clinicore_core::RecordId::new()),
        owner: ctx.provider_id(),
        // An absent name falls through to the domain's "name is required".
        name: body.name.unwrap_or_default(),
        demographics: Demographics {
            date_of_birth: body.date_of_birth,
            sex: body.sex,
            phone: body.phone,
            email: body.email,
            address: body.address,
        },
    };

    match services.patient_create(new, Utc::now()).await {
        Ok(p) => (StatusCode::CREATED, Json(dto::patient_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_patients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "patients.read") {
        return resp;
    }
    match services.patient_list(ctx.provider_id()).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::patient_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_patient(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "patients.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "patient id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Patient, id).await {
        return resp;
    }

    match services.patient_get(PatientId::new(id)).await {
        Ok(p) => (StatusCode::OK, Json(dto::patient_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_patient(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePatientRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "patients.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "patient id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Patient, id).await {
        return resp;
    }

    let update = PatientUpdate {
        name: body.name,
        demographics: Some(Demographics {
            date_of_birth: body.date_of_birth,
            sex: body.sex,
            phone: body.phone,
            email: body.email,
            address: body.address,
        }),
    };

    match services
        .patient_update(PatientId::new(id), update, Utc::now())
        .await
    {
        Ok(p) => (StatusCode::OK, Json(dto::patient_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_patient(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "patients.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "patient id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Patient, id).await {
        return resp;
    }

    match services.patient_delete(PatientId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
