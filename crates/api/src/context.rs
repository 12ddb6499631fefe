use devtrack_auth::Principal;
use devtrack_core::UserId;

/// Authenticated principal for a request.
///
/// Inserted by the auth middleware after the bearer token has been resolved
/// against the user store; handlers pass it explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> UserId {
        self.principal.id
    }
}
