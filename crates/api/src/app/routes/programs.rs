use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use clinicore_records::ProgramId;
use clinicore_store::{NewProgram, OwnedResource, ProgramUpdate};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_program).get(list_programs))
        .route(
            "/:id",
            get(get_program).put(update_program).delete(delete_program),
        )
}

pub async fn create_program(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateProgramRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "programs.write") {
        return resp;
    }

    let new = NewProgram {
        id: ProgramId::new(clinicore_core::RecordId::new()),
        owner: ctx.provider_id(),
        name: body.name.unwrap_or_default(),
        description: body.description,
    };

    match services.program_create(new, Utc::now()).await {
        Ok(p) => (StatusCode::CREATED, Json(dto::program_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_programs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "programs.read") {
        return resp;
    }
    match services.program_list(ctx.provider_id()).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::program_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_program(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "programs.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "program id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Program, id).await {
        return resp;
    }

    match services.program_get(ProgramId::new(id)).await {
        Ok(p) => (StatusCode::OK, Json(dto::program_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_program(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProgramRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "programs.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "program id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Program, id).await {
        return resp;
    }

    let update = ProgramUpdate {
        name: body.name,
        description: body.description.map(Some),
        active: body.active,
    };

    match services
        .program_update(ProgramId::new(id), update, Utc::now())
        .await
    {
        Ok(p) => (StatusCode::OK, Json(dto::program_to_json(&p))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_program(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "programs.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "program id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Program, id).await {
        return resp;
    }

    match services.program_delete(ProgramId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
