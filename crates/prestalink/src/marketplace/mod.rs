//! The marketplace core: request catalog, application ledger, conversation
//! gate, and reputation engine composed over one transactional store.

pub mod applications;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod memory;
pub mod messaging;
pub mod reviews;
pub mod router;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::identity::{IdentityDirectory, NotificationEvent, Notifier, UserRecord};
use store::MarketplaceStore;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, Bid, CategoryId, Message, MessageId, NewRequest,
    NewReview, ProviderRating, RequestId, RequestPatch, RequestStatus, Review, ReviewId, Role,
    ServiceRequest, Urgency, UserId, AUTO_REJECT_NOTE,
};
pub use error::MarketplaceError;
pub use memory::MemoryStore;
pub use router::marketplace_router;
pub use store::{AcceptOutcome, MarketplaceStore as Store, PublishedFilter, StoreError};
pub use views::{ApplicationView, ConversationView, MessageView, RequestView, ReviewView};

/// Marketplace service composing the store with the external identity and
/// notification collaborators. Operation groups live in their component
/// modules: `catalog`, `applications`, `messaging`, `reviews`.
pub struct Marketplace<S, D, N> {
    store: Arc<S>,
    directory: Arc<D>,
    notifier: Arc<N>,
}

impl<S, D, N> Marketplace<S, D, N>
where
    S: MarketplaceStore,
    D: IdentityDirectory,
    N: Notifier,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Resolve an `Authorization` header value to a caller identity.
    pub fn authenticate(&self, bearer: Option<&str>) -> Result<UserRecord, MarketplaceError> {
        let header = bearer.ok_or(MarketplaceError::Unauthenticated)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(MarketplaceError::Unauthenticated)?;
        self.directory
            .resolve(token)
            .map_err(|_| MarketplaceError::Unauthenticated)
    }

    /// Notification delivery never fails the triggering operation.
    fn notify_best_effort(&self, user: UserId, event: NotificationEvent) {
        if let Err(err) = self.notifier.notify(user, event) {
            tracing::warn!(user = user.0, error = %err, "notification delivery failed");
        }
    }
}
