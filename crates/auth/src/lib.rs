//! `clinicore-auth` — authentication/authorization boundary.
//!
//! Pure claims + policy checks, plus an HS256 token validator. Decoupled
//! from HTTP and storage; row-level ownership checks live in the store.

pub mod claims;
pub mod jwt;
pub mod principal;
pub mod rbac;

pub use claims::{Claims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use principal::{Principal, PrincipalId};
pub use rbac::{AuthzError, Permission, Role, authorize, permissions_for_roles};
