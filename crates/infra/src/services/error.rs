use devtrack_auth::{AuthzError, DenyReason, PasswordError};
use devtrack_core::DomainError;

use crate::store::{Constraint, StoreError};

/// Coarse error category, used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Invalid,
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("forbidden: {}", .0.code())]
    Forbidden(DenyReason),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email already registered")]
    EmailTaken,

    #[error("user is already a member of this project")]
    DuplicateMembership,

    #[error("a ticket with this title already exists in this project")]
    DuplicateTitle,

    #[error("{0}")]
    InvalidAssignee(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidCredentials | ServiceError::InvalidToken => {
                ErrorKind::Unauthenticated
            }
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::EmailTaken
            | ServiceError::DuplicateMembership
            | ServiceError::DuplicateTitle
            | ServiceError::InvalidAssignee(_)
            | ServiceError::Validation(_) => ErrorKind::Invalid,
            ServiceError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Only infrastructure failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }

    /// Stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidCredentials => "invalid_credentials",
            ServiceError::InvalidToken => "invalid_token",
            ServiceError::Forbidden(reason) => reason.code(),
            ServiceError::NotFound(_) => "not_found",
            ServiceError::EmailTaken => "email_taken",
            ServiceError::DuplicateMembership => "duplicate_membership",
            ServiceError::DuplicateTitle => "duplicate_title",
            ServiceError::InvalidAssignee(_) => "invalid_assignee",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(Constraint::UserEmail) => ServiceError::EmailTaken,
            StoreError::UniqueViolation(Constraint::Membership) => ServiceError::DuplicateMembership,
            StoreError::UniqueViolation(Constraint::TicketTitle) => ServiceError::DuplicateTitle,
            StoreError::Unavailable(msg) => ServiceError::Unavailable(msg),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound => ServiceError::NotFound("resource"),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        ServiceError::Forbidden(err.0)
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Unavailable(err.to_string())
    }
}
