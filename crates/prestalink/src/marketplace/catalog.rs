//! Request catalog: creation, editing, lifecycle transitions, and filtered
//! reads of service requests.

use chrono::Utc;

use crate::identity::{IdentityDirectory, Notifier};

use super::domain::{NewRequest, RequestId, RequestPatch, RequestStatus, ServiceRequest, UserId};
use super::error::MarketplaceError;
use super::store::{MarketplaceStore, PublishedFilter};
use super::views::RequestView;
use super::Marketplace;

impl<S, D, N> Marketplace<S, D, N>
where
    S: MarketplaceStore,
    D: IdentityDirectory,
    N: Notifier,
{
    /// Post a new request, published immediately or kept as a draft.
    pub fn create_request(
        &self,
        requester: UserId,
        input: NewRequest,
        publish_now: bool,
    ) -> Result<RequestView, MarketplaceError> {
        if !self.store().category_exists(input.category_id)? {
            return Err(MarketplaceError::not_found("category", input.category_id.0));
        }

        let now = Utc::now();
        let request = ServiceRequest {
            id: RequestId(0),
            requester_id: requester,
            category_id: input.category_id,
            title: input.title,
            description: input.description,
            locality: input.locality,
            address: input.address,
            budget_min: input.budget_min,
            budget_max: input.budget_max,
            desired_date: input.desired_date,
            urgency: input.urgency,
            status: if publish_now {
                RequestStatus::Published
            } else {
                RequestStatus::Draft
            },
            application_count: 0,
            selected_provider_id: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store().insert_request(request)?;
        tracing::info!(request = stored.id.0, status = stored.status.label(), "request created");
        Ok(RequestView::project(&stored, Some(requester)))
    }

    /// Apply a partial update to an owned draft or published request.
    pub fn update_request(
        &self,
        id: RequestId,
        requester: UserId,
        patch: RequestPatch,
    ) -> Result<RequestView, MarketplaceError> {
        let mut request = self.require_request(id)?;
        if request.requester_id != requester {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can edit it",
            ));
        }
        if matches!(request.status, RequestStatus::Matched) || request.status.is_terminal() {
            return Err(MarketplaceError::InvalidTransition(
                "request can no longer be edited",
            ));
        }

        if let Some(category_id) = patch.category_id {
            if !self.store().category_exists(category_id)? {
                return Err(MarketplaceError::not_found("category", category_id.0));
            }
            request.category_id = category_id;
        }
        if let Some(title) = patch.title {
            request.title = title;
        }
        if let Some(description) = patch.description {
            request.description = description;
        }
        if let Some(locality) = patch.locality {
            request.locality = locality;
        }
        if let Some(address) = patch.address {
            request.address = Some(address);
        }
        if let Some(budget_min) = patch.budget_min {
            request.budget_min = Some(budget_min);
        }
        if let Some(budget_max) = patch.budget_max {
            request.budget_max = Some(budget_max);
        }
        if let Some(desired_date) = patch.desired_date {
            request.desired_date = Some(desired_date);
        }
        if let Some(urgency) = patch.urgency {
            request.urgency = urgency;
        }
        if patch.publish && request.status == RequestStatus::Draft {
            request.status = RequestStatus::Published;
        }
        request.updated_at = Utc::now();

        self.store().save_request(request.clone())?;
        Ok(RequestView::project(&request, Some(requester)))
    }

    /// Cancel an owned request. An active match cannot be unilaterally
    /// cancelled through this path, and terminal states stay terminal.
    pub fn cancel_request(
        &self,
        id: RequestId,
        requester: UserId,
    ) -> Result<(), MarketplaceError> {
        let mut request = self.require_request(id)?;
        if request.requester_id != requester {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can cancel it",
            ));
        }
        if request.status == RequestStatus::Matched {
            return Err(MarketplaceError::InvalidTransition(
                "a matched request cannot be cancelled",
            ));
        }
        if request.status.is_terminal() {
            return Err(MarketplaceError::InvalidTransition(
                "request is already closed",
            ));
        }

        request.status = RequestStatus::Cancelled;
        request.updated_at = Utc::now();
        self.store().save_request(request)?;
        tracing::info!(request = id.0, "request cancelled");
        Ok(())
    }

    /// Mark a matched request as completed, unlocking the review path.
    pub fn complete_request(
        &self,
        id: RequestId,
        requester: UserId,
    ) -> Result<RequestView, MarketplaceError> {
        let mut request = self.require_request(id)?;
        if request.requester_id != requester {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can complete it",
            ));
        }
        if request.status != RequestStatus::Matched {
            return Err(MarketplaceError::InvalidTransition(
                "only a matched request can be completed",
            ));
        }

        request.status = RequestStatus::Completed;
        request.updated_at = Utc::now();
        self.store().save_request(request.clone())?;
        tracing::info!(request = id.0, "request completed");
        Ok(RequestView::project(&request, Some(requester)))
    }

    /// Fetch one request; the address is disclosed only to the owner or the
    /// selected provider.
    pub fn request_by_id(
        &self,
        id: RequestId,
        caller: UserId,
    ) -> Result<RequestView, MarketplaceError> {
        let request = self.require_request(id)?;
        Ok(RequestView::project(&request, Some(caller)))
    }

    /// Published requests, optionally filtered, newest-first. No caller
    /// context: addresses are always withheld.
    pub fn list_published(
        &self,
        filter: PublishedFilter,
    ) -> Result<Vec<RequestView>, MarketplaceError> {
        let requests = self.store().published_requests(&filter)?;
        Ok(requests
            .iter()
            .map(|r| RequestView::project(r, None))
            .collect())
    }

    /// Keyword search over published requests, newest-first.
    pub fn search(&self, keyword: &str) -> Result<Vec<RequestView>, MarketplaceError> {
        let requests = self.store().search_published(keyword)?;
        Ok(requests
            .iter()
            .map(|r| RequestView::project(r, None))
            .collect())
    }

    /// All requests owned by the requester, newest-first, owner view.
    pub fn list_mine(&self, requester: UserId) -> Result<Vec<RequestView>, MarketplaceError> {
        let requests = self.store().requests_by_requester(requester)?;
        Ok(requests
            .iter()
            .map(|r| RequestView::project(r, Some(requester)))
            .collect())
    }

    pub(crate) fn require_request(
        &self,
        id: RequestId,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.store()
            .request(id)?
            .ok_or(MarketplaceError::not_found("request", id.0))
    }
}
