//! Viewer-dependent projections of marketplace entities. Visibility of the
//! address and contact fields is computed here from entity state plus the
//! viewing user — never stored on the entity itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::identity::UserRecord;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, CategoryId, Message, MessageId, ProviderRating,
    RequestId, RequestStatus, Review, ReviewId, ServiceRequest, Urgency, UserId,
};

/// Display length for conversation previews.
const PREVIEW_LEN: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub requester_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub locality: String,
    /// Present only for the owner and the selected provider.
    pub address: Option<String>,
    pub budget_min: Option<u32>,
    pub budget_max: Option<u32>,
    pub desired_date: Option<NaiveDate>,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub application_count: u32,
    pub selected_provider_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl RequestView {
    /// Project a request for the given viewer; `None` means an anonymous
    /// bulk-listing context, which never sees the address.
    pub fn project(request: &ServiceRequest, viewer: Option<UserId>) -> Self {
        let is_owner = viewer == Some(request.requester_id);
        let is_selected = viewer.is_some() && viewer == request.selected_provider_id;
        let address = if is_owner || is_selected {
            request.address.clone()
        } else {
            None
        };

        Self {
            id: request.id,
            requester_id: request.requester_id,
            category_id: request.category_id,
            title: request.title.clone(),
            description: request.description.clone(),
            locality: request.locality.clone(),
            address,
            budget_min: request.budget_min,
            budget_max: request.budget_max,
            desired_date: request.desired_date,
            urgency: request.urgency,
            status: request.status,
            application_count: request.application_count,
            selected_provider_id: request.selected_provider_id,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub request_id: RequestId,
    pub request_title: String,
    pub request_locality: String,
    pub provider_id: UserId,
    pub provider_name: Option<String>,
    /// Withheld until the request is matched and this is the accepted bid.
    pub provider_phone: Option<String>,
    pub provider_rating: Option<f64>,
    pub message: Option<String>,
    pub proposed_price: Option<u32>,
    pub proposed_days: Option<u32>,
    pub status: ApplicationStatus,
    pub requester_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl ApplicationView {
    pub fn project(
        application: &Application,
        request: &ServiceRequest,
        provider: Option<&UserRecord>,
        rating: Option<&ProviderRating>,
    ) -> Self {
        let matched = matches!(
            request.status,
            RequestStatus::Matched | RequestStatus::Completed
        );
        let show_contact = matched && application.status == ApplicationStatus::Accepted;
        let provider_phone = if show_contact {
            provider.and_then(|p| p.phone.clone())
        } else {
            None
        };

        Self {
            id: application.id,
            request_id: request.id,
            request_title: request.title.clone(),
            request_locality: request.locality.clone(),
            provider_id: application.provider_id,
            provider_name: provider.map(|p| p.name.clone()),
            provider_phone,
            provider_rating: rating.map(|r| r.average),
            message: application.message.clone(),
            proposed_price: application.proposed_price,
            proposed_days: application.proposed_days,
            status: application.status,
            requester_response: application.requester_response.clone(),
            created_at: application.created_at,
            responded_at: application.responded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub application_id: ApplicationId,
    pub sender_id: UserId,
    pub sender_name: Option<String>,
    pub is_own: bool,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl MessageView {
    pub fn project(message: &Message, viewer: UserId, sender: Option<&UserRecord>) -> Self {
        Self {
            id: message.id,
            application_id: message.application_id,
            sender_id: message.sender_id,
            sender_name: sender.map(|s| s.name.clone()),
            is_own: message.sender_id == viewer,
            content: message.content.clone(),
            is_read: message.is_read,
            created_at: message.created_at,
            read_at: message.read_at,
        }
    }
}

/// Summary of one conversation for the inbox listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub application_id: ApplicationId,
    pub request_id: RequestId,
    pub request_title: String,
    pub other_user_id: UserId,
    pub other_user_name: Option<String>,
    pub other_user_role: &'static str,
    /// Visible: a conversation only exists once the parties are matched.
    pub other_user_phone: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub has_unread: bool,
}

/// Truncate a preview to `PREVIEW_LEN` characters, appending an ellipsis.
pub(crate) fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_LEN {
        return content.to_string();
    }
    let truncated: String = content.chars().take(PREVIEW_LEN).collect();
    format!("{truncated}...")
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub application_id: ApplicationId,
    pub request_title: Option<String>,
    pub client_id: UserId,
    pub client_name: Option<String>,
    pub provider_id: UserId,
    pub provider_name: Option<String>,
    pub rating: u8,
    pub comment: Option<String>,
    pub quality: Option<u8>,
    pub punctuality: Option<u8>,
    pub communication: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl ReviewView {
    pub fn project(
        review: &Review,
        request_title: Option<String>,
        client: Option<&UserRecord>,
        provider: Option<&UserRecord>,
    ) -> Self {
        Self {
            id: review.id,
            application_id: review.application_id,
            request_title,
            client_id: review.client_id,
            client_name: client.map(|c| c.name.clone()),
            provider_id: review.provider_id,
            provider_name: provider.map(|p| p.name.clone()),
            rating: review.rating,
            comment: review.comment.clone(),
            quality: review.quality,
            punctuality: review.punctuality,
            communication: review.communication,
            created_at: review.created_at,
        }
    }
}
