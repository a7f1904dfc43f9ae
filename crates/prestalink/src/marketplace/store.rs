//! Storage abstraction for the marketplace. Each trait method is one
//! transactional boundary: the compound mutating operations re-validate their
//! status preconditions and enforce uniqueness internally, so concurrent
//! callers observe either the full effect or a clean failure — never a
//! check-then-act race and never partial state.

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, CategoryId, Message, ProviderRating, RequestId, Review,
    ServiceRequest, UserId,
};

/// Everything mutated by a successful acceptance, returned in one piece so
/// callers can fan out notifications without re-reading state.
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub accepted: Application,
    pub request: ServiceRequest,
    pub auto_rejected: Vec<Application>,
}

/// Filters for the published-request listing.
#[derive(Debug, Clone, Default)]
pub struct PublishedFilter {
    pub category_id: Option<CategoryId>,
    pub locality: Option<String>,
}

pub trait MarketplaceStore: Send + Sync {
    fn category_exists(&self, id: CategoryId) -> Result<bool, StoreError>;

    /// Insert a request, assigning its id. Listing order for all request
    /// reads is newest-first.
    fn insert_request(&self, request: ServiceRequest) -> Result<ServiceRequest, StoreError>;
    fn request(&self, id: RequestId) -> Result<Option<ServiceRequest>, StoreError>;
    fn save_request(&self, request: ServiceRequest) -> Result<(), StoreError>;
    fn requests_by_requester(&self, requester: UserId) -> Result<Vec<ServiceRequest>, StoreError>;
    fn published_requests(&self, filter: &PublishedFilter)
        -> Result<Vec<ServiceRequest>, StoreError>;
    /// Case-insensitive substring search over title and description of
    /// published requests.
    fn search_published(&self, keyword: &str) -> Result<Vec<ServiceRequest>, StoreError>;

    /// Insert a bid, assigning its id. Atomically: fails `PreconditionFailed`
    /// unless the parent request is published, fails `Conflict` if the
    /// (request, provider) pair already has an application in any status, and
    /// increments the parent's `application_count`.
    fn insert_application(&self, application: Application) -> Result<Application, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;
    fn applications_by_provider(&self, provider: UserId) -> Result<Vec<Application>, StoreError>;
    fn applications_by_request(&self, request: RequestId) -> Result<Vec<Application>, StoreError>;
    /// Accepted applications where the user is the provider or owns the
    /// parent request.
    fn accepted_applications_for_user(&self, user: UserId) -> Result<Vec<Application>, StoreError>;

    /// Atomically withdraw a pending bid and decrement the parent's
    /// `application_count` (floored at zero). Fails `PreconditionFailed` if
    /// the bid is no longer pending.
    fn withdraw_application(
        &self,
        id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError>;

    /// Atomically accept a pending bid: stamp it accepted, move the parent
    /// request to matched with this provider selected, and reject every
    /// sibling pending bid with `note` as the requester response. Both the
    /// pending precondition and the parent's published status are re-checked
    /// under the transaction, so a lost race fails `PreconditionFailed`, at
    /// most one bid per request is ever accepted, and a cancelled request
    /// never leaves its terminal state.
    fn accept_application(
        &self,
        id: ApplicationId,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, StoreError>;

    /// Atomically reject a pending bid, storing the optional requester
    /// response. Fails `PreconditionFailed` if no longer pending.
    fn reject_application(
        &self,
        id: ApplicationId,
        response: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError>;

    /// Insert a message, assigning its id.
    fn insert_message(&self, message: Message) -> Result<Message, StoreError>;
    /// Messages of one conversation, oldest-first.
    fn conversation_messages(&self, application: ApplicationId)
        -> Result<Vec<Message>, StoreError>;
    /// Mark every unread message in the conversation not sent by `reader` as
    /// read. Idempotent; returns the number of messages newly marked.
    fn mark_conversation_read(
        &self,
        application: ApplicationId,
        reader: UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
    /// Unread messages addressed to the user across all accepted
    /// conversations they participate in.
    fn unread_count(&self, user: UserId) -> Result<u64, StoreError>;

    /// Insert a review, assigning its id. Fails `Conflict` if the application
    /// already has one.
    fn insert_review(&self, review: Review) -> Result<Review, StoreError>;
    fn reviews_by_provider(&self, provider: UserId) -> Result<Vec<Review>, StoreError>;
    fn recent_reviews(&self, limit: usize) -> Result<Vec<Review>, StoreError>;
    fn provider_rating(&self, provider: UserId) -> Result<Option<ProviderRating>, StoreError>;
    fn save_provider_rating(
        &self,
        provider: UserId,
        rating: ProviderRating,
    ) -> Result<(), StoreError>;
}

/// Storage failures. `Conflict` and `PreconditionFailed` are mapped to the
/// caller-facing taxonomy; the rest surface as infrastructure errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    PreconditionFailed(&'static str),
    #[error("record not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
