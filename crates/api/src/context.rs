use clinicore_auth::{PrincipalId, Role};
use clinicore_core::ProviderId;

/// Authenticated request context.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    principal_id: PrincipalId,
    provider_id: ProviderId,
    roles: Vec<Role>,
}

impl ProviderContext {
    pub fn new(principal_id: PrincipalId, provider_id: ProviderId, roles: Vec<Role>) -> Self {
        Self {
            principal_id,
            provider_id,
            roles,
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// The clinician identity that owns rows created under this request.
    pub fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
