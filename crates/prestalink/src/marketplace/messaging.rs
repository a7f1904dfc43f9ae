//! Conversation gate: messaging exists only for an accepted application and
//! only between the request owner and the accepted provider.

use chrono::{DateTime, Utc};

use crate::identity::{IdentityDirectory, Notifier};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Message, MessageId, ServiceRequest, UserId,
};
use super::error::MarketplaceError;
use super::store::MarketplaceStore;
use super::views::{preview, ConversationView, MessageView};
use super::Marketplace;

impl<S, D, N> Marketplace<S, D, N>
where
    S: MarketplaceStore,
    D: IdentityDirectory,
    N: Notifier,
{
    /// Append a message to the conversation of an accepted application.
    pub fn send_message(
        &self,
        application_id: ApplicationId,
        sender: UserId,
        content: String,
    ) -> Result<MessageView, MarketplaceError> {
        if content.trim().is_empty() {
            return Err(MarketplaceError::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        let (application, _request) = self.conversation_guard(application_id, sender)?;

        let message = Message {
            id: MessageId(0),
            application_id: application.id,
            sender_id: sender,
            content,
            is_read: false,
            created_at: Utc::now(),
            read_at: None,
        };
        let stored = self.store().insert_message(message)?;
        let sender_record = self.directory().user(sender);
        Ok(MessageView::project(&stored, sender, sender_record.as_ref()))
    }

    /// Return the conversation oldest-first, marking everything addressed to
    /// the caller as read first. The read-marking is idempotent.
    pub fn conversation(
        &self,
        application_id: ApplicationId,
        caller: UserId,
    ) -> Result<Vec<MessageView>, MarketplaceError> {
        let (application, _request) = self.conversation_guard(application_id, caller)?;

        self.store()
            .mark_conversation_read(application.id, caller, Utc::now())?;
        let messages = self.store().conversation_messages(application.id)?;
        Ok(messages
            .iter()
            .map(|message| {
                let sender = self.directory().user(message.sender_id);
                MessageView::project(message, caller, sender.as_ref())
            })
            .collect())
    }

    /// Inbox listing: one summary per accepted application the caller
    /// participates in, most recent activity first; conversations without
    /// messages sort after those with, falling back to the acceptance time.
    pub fn conversations(
        &self,
        caller: UserId,
    ) -> Result<Vec<ConversationView>, MarketplaceError> {
        let applications = self.store().accepted_applications_for_user(caller)?;

        let mut entries: Vec<(ConversationView, Option<DateTime<Utc>>)> = Vec::new();
        for application in &applications {
            let request = self.require_request(application.request_id)?;

            let (other_id, other_role) = if caller == request.requester_id {
                (application.provider_id, "provider")
            } else {
                (request.requester_id, "requester")
            };
            let other = self.directory().user(other_id);

            let messages = self.store().conversation_messages(application.id)?;
            let last = messages.last();
            let has_unread = messages
                .iter()
                .any(|m| !m.is_read && m.sender_id != caller);

            entries.push((
                ConversationView {
                    application_id: application.id,
                    request_id: request.id,
                    request_title: request.title.clone(),
                    other_user_id: other_id,
                    other_user_name: other.as_ref().map(|u| u.name.clone()),
                    other_user_role: other_role,
                    other_user_phone: other.and_then(|u| u.phone),
                    last_message: last.map(|m| preview(&m.content)),
                    last_message_at: last.map(|m| m.created_at),
                    has_unread,
                },
                application.responded_at,
            ));
        }

        entries.sort_by(|(a, accepted_a), (b, accepted_b)| {
            let activity = match (a.last_message_at, b.last_message_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => accepted_b.cmp(accepted_a),
            };
            activity.then(b.application_id.cmp(&a.application_id))
        });

        Ok(entries.into_iter().map(|(view, _)| view).collect())
    }

    /// Total unread messages addressed to the caller across all of their
    /// accepted conversations.
    pub fn unread_count(&self, caller: UserId) -> Result<u64, MarketplaceError> {
        Ok(self.store().unread_count(caller)?)
    }

    /// Shared guard: the conversation exists only for an accepted
    /// application, and only its two participants may touch it.
    fn conversation_guard(
        &self,
        application_id: ApplicationId,
        caller: UserId,
    ) -> Result<(Application, ServiceRequest), MarketplaceError> {
        let application = self.require_application(application_id)?;
        if application.status != ApplicationStatus::Accepted {
            return Err(MarketplaceError::InvalidTransition(
                "conversation is only available for an accepted application",
            ));
        }
        let request = self.require_request(application.request_id)?;
        if caller != request.requester_id && caller != application.provider_id {
            return Err(MarketplaceError::Forbidden(
                "not a participant in this conversation",
            ));
        }
        Ok((application, request))
    }
}
