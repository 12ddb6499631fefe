use serde::{Deserialize, Serialize};

use devtrack_core::UserId;

/// An authenticated identity.
///
/// Resolved per request from a bearer token and passed explicitly to every
/// authorization and store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub name: String,
}
