//! Roles, permissions, and the pure authorization check.

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Principal;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; `permissions_for_roles` maps them
/// to permissions before any check runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission identifier (e.g. "patients.write").
///
/// The wildcard `"*"` lets policy layers express "allow all" without
/// enumerating domain permissions in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Static role → permission mapping.
///
/// Intentionally simple until a real policy source exists (e.g. DB-backed):
/// "admin" grants everything; "doctor" grants the clinical surface plus
/// read-only pharmacy; "pharmacist" grants pharmacy plus dispensing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();

    for role in roles {
        match role.as_str() {
            "admin" => return vec![Permission::new("*")],
            "doctor" => out.extend(
                [
                    "patients.read",
                    "patients.write",
                    "programs.read",
                    "programs.write",
                    "enrollments.read",
                    "enrollments.write",
                    "appointments.read",
                    "appointments.write",
                    "visits.read",
                    "visits.write",
                    "vitals.read",
                    "vitals.write",
                    "prescriptions.read",
                    "prescriptions.write",
                    "lab-orders.read",
                    "lab-orders.write",
                    "billing.read",
                    "billing.write",
                    "medicines.read",
                    "analytics.read",
                ]
                .into_iter()
                .map(Permission::new),
            ),
            "pharmacist" => out.extend(
                [
                    "medicines.read",
                    "medicines.write",
                    "batches.read",
                    "batches.write",
                    "prescriptions.read",
                    "prescriptions.dispense",
                ]
                .into_iter()
                .map(Permission::new),
            ),
            _ => {}
        }
    }

    out
}

/// Authorize a principal for one required permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicore_core::ProviderId;
    use crate::PrincipalId;

    fn principal_with(roles: Vec<Role>) -> Principal {
        let permissions = permissions_for_roles(&roles);
        Principal {
            principal_id: PrincipalId::new(),
            provider_id: ProviderId::new(),
            roles,
            permissions,
        }
    }

    #[test]
    fn admin_wildcard_grants_everything() {
        let p = principal_with(vec![Role::new("admin")]);
        assert!(authorize(&p, &Permission::new("medicines.write")).is_ok());
        assert!(authorize(&p, &Permission::new("billing.write")).is_ok());
    }

    #[test]
    fn doctor_cannot_write_pharmacy() {
        let p = principal_with(vec![Role::new("doctor")]);
        assert!(authorize(&p, &Permission::new("patients.write")).is_ok());
        assert!(authorize(&p, &Permission::new("medicines.read")).is_ok());
        assert!(matches!(
            authorize(&p, &Permission::new("medicines.write")),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let p = principal_with(vec![Role::new("viewer")]);
        assert!(authorize(&p, &Permission::new("patients.read")).is_err());
    }
}
