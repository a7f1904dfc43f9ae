use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrappers. Ids are assigned by the store on insert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CategoryId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RequestId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ApplicationId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReviewId(pub u64);

/// Platform roles. Account lifecycle is owned by the identity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Requester,
    Provider,
    Administrator,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Requester => "requester",
            Role::Provider => "provider",
            Role::Administrator => "administrator",
        }
    }
}

/// Urgency of a posted request, display-level only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    VeryUrgent,
}

/// Lifecycle of a service request: draft -> published -> matched ->
/// completed, with cancellation available outside of an active match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Published,
    Matched,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Published => "published",
            RequestStatus::Matched => "matched",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

/// Lifecycle of a bid. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// A posted job seeking a provider.
///
/// Invariant: `selected_provider_id` is `Some` exactly when `status` is
/// `Matched` or `Completed`. `application_count` caches the number of
/// non-withdrawn applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub locality: String,
    /// Precise address, disclosed only to the owner and the matched provider.
    pub address: Option<String>,
    pub budget_min: Option<u32>,
    pub budget_max: Option<u32>,
    pub desired_date: Option<NaiveDate>,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub application_count: u32,
    pub selected_provider_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A provider's bid on a request. Unique per (request, provider) pair; at
/// most one per request is ever `Accepted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub request_id: RequestId,
    pub provider_id: UserId,
    pub message: Option<String>,
    pub proposed_price: Option<u32>,
    pub proposed_days: Option<u32>,
    pub status: ApplicationStatus,
    pub requester_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// One message in the conversation scoped to an accepted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub application_id: ApplicationId,
    pub sender_id: UserId,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Post-completion rating left by the requester for the provider. Immutable
/// once created; at most one per application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub application_id: ApplicationId,
    pub client_id: UserId,
    pub provider_id: UserId,
    /// Overall rating in 1..=5; the only input to the provider average.
    pub rating: u8,
    pub comment: Option<String>,
    pub quality: Option<u8>,
    pub punctuality: Option<u8>,
    pub communication: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate kept per provider; always the full recompute of that provider's
/// reviews, never an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderRating {
    pub average: f64,
    pub count: u32,
}

/// Fields supplied when posting a new request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub locality: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub budget_min: Option<u32>,
    #[serde(default)]
    pub budget_max: Option<u32>,
    #[serde(default)]
    pub desired_date: Option<NaiveDate>,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Partial update of an editable request; only present fields apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPatch {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub budget_min: Option<u32>,
    #[serde(default)]
    pub budget_max: Option<u32>,
    #[serde(default)]
    pub desired_date: Option<NaiveDate>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    /// When true and the request is still a draft, publishes it.
    #[serde(default)]
    pub publish: bool,
}

/// Optional terms attached to a bid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bid {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub proposed_price: Option<u32>,
    #[serde(default)]
    pub proposed_days: Option<u32>,
}

/// Ratings supplied by the requester after completion.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub punctuality: Option<u8>,
    #[serde(default)]
    pub communication: Option<u8>,
}

/// Response text stamped on sibling bids when one is accepted.
pub const AUTO_REJECT_NOTE: &str = "Another provider was selected for this request";
