use super::store::StoreError;

/// Error taxonomy surfaced by every marketplace operation. All variants are
/// caller-intent or caller-state outcomes and are never retried; only
/// `Store` covers infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("missing or invalid credentials")]
    Unauthenticated,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(StoreError),
}

impl MarketplaceError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<StoreError> for MarketplaceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => MarketplaceError::Conflict(reason),
            StoreError::PreconditionFailed(reason) => MarketplaceError::InvalidTransition(reason),
            other => MarketplaceError::Store(other),
        }
    }
}
