//! Request-side authorization guards.
//!
//! Two layers, both checked before any mutation:
//!
//! 1. `require_permission`: RBAC, derived from token roles.
//! 2. `require_access`: row-level ownership, one capability check
//!    parameterized by resource kind and id. Missing rows are 404; rows
//!    owned by another provider are 403. The two are never conflated.

use axum::http::StatusCode;

use clinicore_auth::{Permission, Principal, authorize, permissions_for_roles};
use clinicore_core::RecordId;
use clinicore_store::{Access, OwnedResource};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ProviderContext;

/// RBAC check; returns the ready-to-send 403 on failure.
pub fn require_permission(
    ctx: &ProviderContext,
    permission: &'static str,
) -> Result<(), axum::response::Response> {
    let principal = Principal {
        principal_id: ctx.principal_id(),
        provider_id: ctx.provider_id(),
        roles: ctx.roles().to_vec(),
        permissions: permissions_for_roles(ctx.roles()),
    };

    authorize(&principal, &Permission::new(permission))
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

/// Non-erroring permission probe, for routes whose scope widens with role
/// (e.g. dispensers see all prescriptions, owners see their own).
pub fn has_permission(ctx: &ProviderContext, permission: &'static str) -> bool {
    require_permission(ctx, permission).is_ok()
}

/// Row-level capability check for one owned resource.
pub async fn require_access(
    services: &AppServices,
    ctx: &ProviderContext,
    resource: OwnedResource,
    id: RecordId,
) -> Result<(), axum::response::Response> {
    match services.access(resource, id, ctx.provider_id()).await {
        Ok(Access::Granted) => Ok(()),
        Ok(Access::Denied) => Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "record belongs to another provider",
        )),
        Ok(Access::NotFound) => Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "record not found",
        )),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}
