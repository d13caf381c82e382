use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use clinicore_billing::{BillId, BillLine, ItemType, PaymentMethod};
use clinicore_core::Money;
use clinicore_records::PatientId;
use clinicore_store::{NewBill, OwnedResource};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ProviderContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_bill).get(list_bills))
        .route("/:id", get(get_bill))
        .route("/:id/payments", post(record_payment).get(list_payments))
        .route("/:id/cancel", post(cancel_bill))
}

fn build_lines(
    req_lines: Vec<dto::BillLineRequest>,
) -> Result<Vec<BillLine>, axum::response::Response> {
    let mut lines = Vec::with_capacity(req_lines.len());
    for l in req_lines {
        let unit_price = Money::from_cents(dto::required(l.unit_price_cents, "unit_price_cents")?)
            .map_err(errors::domain_error_to_response)?;
        let item_type: ItemType = match l.item_type {
            Some(s) => dto::parse_enum(&s, "item type")?,
            None => ItemType::Other,
        };
        let line = BillLine::new(
            l.description.as_deref().unwrap_or_default(),
            l.quantity.unwrap_or(0),
            unit_price,
            item_type,
        )
        .map_err(errors::domain_error_to_response)?;
        lines.push(line);
    }
    Ok(lines)
}

pub async fn create_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Json(body): Json<dto::CreateBillRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "billing.write") {
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

    let lines = match build_lines(body.lines.unwrap_or_default()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let discount_percent = match body.discount_percent.unwrap_or(0) {
        d @ 0..=100 => d as u8,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "discount percent must be between 0 and 100",
            );
        }
    };

    let new = NewBill {
        id: BillId::new(clinicore_core::RecordId::new()),
        patient_id: PatientId::new(patient_id),
        owner: ctx.provider_id(),
        lines,
        discount_percent,
        notes: body.notes,
    };

    match services.bill_create(new, Utc::now()).await {
        Ok(b) => (StatusCode::CREATED, Json(dto::bill_to_json(&b))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_bills(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Query(filter): Query<dto::ListFilter>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "billing.read") {
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

    match services.bill_list(ctx.provider_id(), patient).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::bill_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "billing.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "bill id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Bill, id).await {
        return resp;
    }

    match services.bill_get(BillId::new(id)).await {
        Ok(b) => (StatusCode::OK, Json(dto::bill_to_json(&b))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_payments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "billing.read") {
        return resp;
    }
    let id = match dto::parse_id(&id, "bill id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Bill, id).await {
        return resp;
    }

    match services.bill_payments(BillId::new(id)).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": items.iter().map(dto::payment_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordPaymentRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "billing.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "bill id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let amount = match dto::required(body.amount_cents, "amount_cents")
        .and_then(|c| Money::from_cents(c).map_err(errors::domain_error_to_response))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let method: PaymentMethod = match dto::required(body.method, "method")
        .and_then(|s| dto::parse_enum(&s, "payment method"))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Bill, id).await {
        return resp;
    }

    match services
        .bill_record_payment(BillId::new(id), amount, method, Utc::now())
        .await
    {
        Ok(b) => (StatusCode::OK, Json(dto::bill_to_json(&b))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn cancel_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ProviderContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_permission(&ctx, "billing.write") {
        return resp;
    }
    let id = match dto::parse_id(&id, "bill id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_access(&services, &ctx, OwnedResource::Bill, id).await {
        return resp;
    }

    match services.bill_cancel(BillId::new(id), Utc::now()).await {
        Ok(b) => (StatusCode::OK, Json(dto::bill_to_json(&b))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
