//! Reference in-memory store. One mutex guards every table, so each trait
//! call runs serialized and all-or-nothing — the same contract a relational
//! backend would provide with row locks and transactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, CategoryId, Message, MessageId, ProviderRating,
    RequestId, RequestStatus, Review, ReviewId, ServiceRequest, UserId,
};
use super::store::{AcceptOutcome, MarketplaceStore, PublishedFilter, StoreError};

#[derive(Default)]
struct Tables {
    categories: BTreeMap<CategoryId, String>,
    requests: BTreeMap<RequestId, ServiceRequest>,
    applications: BTreeMap<ApplicationId, Application>,
    messages: BTreeMap<MessageId, Message>,
    reviews: BTreeMap<ReviewId, Review>,
    ratings: HashMap<UserId, ProviderRating>,
    next_category: u64,
    next_request: u64,
    next_application: u64,
    next_message: u64,
    next_review: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category, assigning its id. Categories are an external
    /// taxonomy; the store only answers existence checks.
    pub fn register_category(&self, name: &str) -> CategoryId {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.next_category += 1;
        let id = CategoryId(tables.next_category);
        tables.categories.insert(id, name.to_string());
        id
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn newest_first(requests: &mut [ServiceRequest]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

fn newest_applications_first(applications: &mut [Application]) {
    applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

impl Tables {
    fn is_participant(&self, application: &Application, user: UserId) -> bool {
        if application.provider_id == user {
            return true;
        }
        self.requests
            .get(&application.request_id)
            .is_some_and(|request| request.requester_id == user)
    }
}

impl MarketplaceStore for MemoryStore {
    fn category_exists(&self, id: CategoryId) -> Result<bool, StoreError> {
        Ok(self.lock()?.categories.contains_key(&id))
    }

    fn insert_request(&self, mut request: ServiceRequest) -> Result<ServiceRequest, StoreError> {
        let mut tables = self.lock()?;
        tables.next_request += 1;
        request.id = RequestId(tables.next_request);
        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn request(&self, id: RequestId) -> Result<Option<ServiceRequest>, StoreError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    fn save_request(&self, request: ServiceRequest) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.requests.contains_key(&request.id) {
            return Err(StoreError::NotFound);
        }
        tables.requests.insert(request.id, request);
        Ok(())
    }

    fn requests_by_requester(&self, requester: UserId) -> Result<Vec<ServiceRequest>, StoreError> {
        let tables = self.lock()?;
        let mut requests: Vec<_> = tables
            .requests
            .values()
            .filter(|r| r.requester_id == requester)
            .cloned()
            .collect();
        newest_first(&mut requests);
        Ok(requests)
    }

    fn published_requests(
        &self,
        filter: &PublishedFilter,
    ) -> Result<Vec<ServiceRequest>, StoreError> {
        let tables = self.lock()?;
        let mut requests: Vec<_> = tables
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Published)
            .filter(|r| {
                filter
                    .category_id
                    .map_or(true, |category| r.category_id == category)
            })
            .filter(|r| {
                filter
                    .locality
                    .as_deref()
                    .map_or(true, |locality| r.locality == locality)
            })
            .cloned()
            .collect();
        newest_first(&mut requests);
        Ok(requests)
    }

    fn search_published(&self, keyword: &str) -> Result<Vec<ServiceRequest>, StoreError> {
        let needle = keyword.to_lowercase();
        let tables = self.lock()?;
        let mut requests: Vec<_> = tables
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Published)
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        newest_first(&mut requests);
        Ok(requests)
    }

    fn insert_application(&self, mut application: Application) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let request = tables
            .requests
            .get(&application.request_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        if request.status != RequestStatus::Published {
            return Err(StoreError::PreconditionFailed(
                "request is not accepting applications",
            ));
        }
        let duplicate = tables.applications.values().any(|a| {
            a.request_id == application.request_id && a.provider_id == application.provider_id
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "provider has already applied to this request",
            ));
        }

        tables.next_application += 1;
        application.id = ApplicationId(tables.next_application);
        tables
            .applications
            .insert(application.id, application.clone());
        if let Some(stored) = tables.requests.get_mut(&application.request_id) {
            stored.application_count += 1;
        }
        Ok(application)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    fn applications_by_provider(&self, provider: UserId) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut applications: Vec<_> = tables
            .applications
            .values()
            .filter(|a| a.provider_id == provider)
            .cloned()
            .collect();
        newest_applications_first(&mut applications);
        Ok(applications)
    }

    fn applications_by_request(&self, request: RequestId) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut applications: Vec<_> = tables
            .applications
            .values()
            .filter(|a| a.request_id == request)
            .cloned()
            .collect();
        newest_applications_first(&mut applications);
        Ok(applications)
    }

    fn accepted_applications_for_user(&self, user: UserId) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut applications: Vec<_> = tables
            .applications
            .values()
            .filter(|a| a.status == ApplicationStatus::Accepted)
            .filter(|a| tables.is_participant(a, user))
            .cloned()
            .collect();
        newest_applications_first(&mut applications);
        Ok(applications)
    }

    fn withdraw_application(
        &self,
        id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let application = tables.applications.get(&id).ok_or(StoreError::NotFound)?;
        if application.status != ApplicationStatus::Pending {
            return Err(StoreError::PreconditionFailed(
                "application is no longer pending",
            ));
        }
        let request_id = application.request_id;

        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        application.status = ApplicationStatus::Withdrawn;
        application.responded_at = Some(now);
        let withdrawn = application.clone();

        if let Some(request) = tables.requests.get_mut(&request_id) {
            request.application_count = request.application_count.saturating_sub(1);
            request.updated_at = now;
        }
        Ok(withdrawn)
    }

    fn accept_application(
        &self,
        id: ApplicationId,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, StoreError> {
        let mut tables = self.lock()?;
        let application = tables
            .applications
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        // Re-checked under the lock: the loser of a concurrent accept lands here.
        if application.status != ApplicationStatus::Pending {
            return Err(StoreError::PreconditionFailed(
                "application is no longer pending",
            ));
        }
        let request_status = tables
            .requests
            .get(&application.request_id)
            .map(|request| request.status)
            .ok_or(StoreError::NotFound)?;
        if request_status != RequestStatus::Published {
            return Err(StoreError::PreconditionFailed(
                "request is no longer open for matching",
            ));
        }

        let accepted = {
            let stored = tables
                .applications
                .get_mut(&id)
                .ok_or(StoreError::NotFound)?;
            stored.status = ApplicationStatus::Accepted;
            stored.responded_at = Some(now);
            stored.clone()
        };

        let request = {
            let stored = tables
                .requests
                .get_mut(&accepted.request_id)
                .ok_or(StoreError::NotFound)?;
            stored.status = RequestStatus::Matched;
            stored.selected_provider_id = Some(accepted.provider_id);
            stored.updated_at = now;
            stored.clone()
        };

        let mut auto_rejected = Vec::new();
        for sibling in tables.applications.values_mut() {
            if sibling.request_id == accepted.request_id
                && sibling.id != accepted.id
                && sibling.status == ApplicationStatus::Pending
            {
                sibling.status = ApplicationStatus::Rejected;
                sibling.requester_response = Some(note.to_string());
                sibling.responded_at = Some(now);
                auto_rejected.push(sibling.clone());
            }
        }

        Ok(AcceptOutcome {
            accepted,
            request,
            auto_rejected,
        })
    }

    fn reject_application(
        &self,
        id: ApplicationId,
        response: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        if application.status != ApplicationStatus::Pending {
            return Err(StoreError::PreconditionFailed(
                "application is no longer pending",
            ));
        }
        application.status = ApplicationStatus::Rejected;
        application.requester_response = response;
        application.responded_at = Some(now);
        Ok(application.clone())
    }

    fn insert_message(&self, mut message: Message) -> Result<Message, StoreError> {
        let mut tables = self.lock()?;
        if !tables.applications.contains_key(&message.application_id) {
            return Err(StoreError::NotFound);
        }
        tables.next_message += 1;
        message.id = MessageId(tables.next_message);
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    fn conversation_messages(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Message>, StoreError> {
        let tables = self.lock()?;
        let mut messages: Vec<_> = tables
            .messages
            .values()
            .filter(|m| m.application_id == application)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    fn mark_conversation_read(
        &self,
        application: ApplicationId,
        reader: UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut tables = self.lock()?;
        let mut marked = 0;
        for message in tables.messages.values_mut() {
            if message.application_id == application
                && message.sender_id != reader
                && !message.is_read
            {
                message.is_read = true;
                message.read_at = Some(now);
                marked += 1;
            }
        }
        Ok(marked)
    }

    fn unread_count(&self, user: UserId) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        let mut count = 0;
        for message in tables.messages.values() {
            if message.is_read || message.sender_id == user {
                continue;
            }
            let accepted = tables
                .applications
                .get(&message.application_id)
                .filter(|a| a.status == ApplicationStatus::Accepted);
            if accepted.is_some_and(|a| tables.is_participant(a, user)) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn insert_review(&self, mut review: Review) -> Result<Review, StoreError> {
        let mut tables = self.lock()?;
        let duplicate = tables
            .reviews
            .values()
            .any(|r| r.application_id == review.application_id);
        if duplicate {
            return Err(StoreError::Conflict(
                "a review already exists for this application",
            ));
        }
        tables.next_review += 1;
        review.id = ReviewId(tables.next_review);
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn reviews_by_provider(&self, provider: UserId) -> Result<Vec<Review>, StoreError> {
        let tables = self.lock()?;
        let mut reviews: Vec<_> = tables
            .reviews
            .values()
            .filter(|r| r.provider_id == provider)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    fn recent_reviews(&self, limit: usize) -> Result<Vec<Review>, StoreError> {
        let tables = self.lock()?;
        let mut reviews: Vec<_> = tables.reviews.values().cloned().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews.truncate(limit);
        Ok(reviews)
    }

    fn provider_rating(&self, provider: UserId) -> Result<Option<ProviderRating>, StoreError> {
        Ok(self.lock()?.ratings.get(&provider).copied())
    }

    fn save_provider_rating(
        &self,
        provider: UserId,
        rating: ProviderRating,
    ) -> Result<(), StoreError> {
        self.lock()?.ratings.insert(provider, rating);
        Ok(())
    }
}
