use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use clinicore_core::Money;
use clinicore_pharmacy::MedicineId;
use clinicore_store::{MedicineUpdate, NewMedicine};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_medicine).get(list_medicines))
        .route("/:id", get(get_medicine).put(update_medicine))
}

fn parse_price(cents: Option<i64>) -> Result<Money, axum::response::Response> {
    let cents = dto::required(cents, "unit_price_cents")?;
    Money::from_cents(cents).map_err(errors::domain_error_to_response)
}

pub async fn create_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateMedicineRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "medicines.write") {
        return resp;
    }

    let unit_price = match parse_price(body.unit_price_cents) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let new = NewMedicine {
        id: MedicineId::new(clinicore_core::RecordId::new()),
        name: body.name.unwrap_or_default(),
        generic_name: body.generic_name,
        form: body.form,
        unit_price,
        reorder_level: body.reorder_level.unwrap_or(0),
    };

    match services.medicine_create(new, Utc::now()).await {
        Ok(m) => (StatusCode::CREATED, Json(dto::medicine_to_json(&m))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_medicines(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "medicines.read") {
        return resp;
    }
    match services.medicine_list().await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::medicine_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "medicines.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "medicine id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.medicine_get(MedicineId::new(id)).await {
        Ok(m) => (StatusCode::OK, Json(dto::medicine_to_json(&m))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateMedicineRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "medicines.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "medicine id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let unit_price = match body
        .unit_price_cents
        .map(|c| Money::from_cents(c).map_err(errors::domain_error_to_response))
        .transpose()
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let update = MedicineUpdate {
        name: body.name,
        unit_price,
        reorder_level: body.reorder_level,
    };

    match services
        .medicine_update(MedicineId::new(id), update, Utc::now())
        .await
    {
        Ok(m) => (StatusCode::OK, Json(dto::medicine_to_json(&m))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
