//! Application ledger: the bid state machine. Pending bids move to exactly
//! one of Accepted, Rejected, or Withdrawn; acceptance atomically matches the
//! parent request and rejects every rival pending bid.

use chrono::Utc;

use crate::identity::{IdentityDirectory, NotificationEvent, Notifier, UserRecord};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Bid, RequestId, RequestStatus, Role,
    ServiceRequest, UserId, AUTO_REJECT_NOTE,
};
use super::error::MarketplaceError;
use super::store::MarketplaceStore;
use super::views::ApplicationView;
use super::Marketplace;

impl<S, D, N> Marketplace<S, D, N>
where
    S: MarketplaceStore,
    D: IdentityDirectory,
    N: Notifier,
{
    /// Bid on a published request. The pair uniqueness check and the counter
    /// increment happen inside one store transaction.
    pub fn apply(
        &self,
        request_id: RequestId,
        caller: &UserRecord,
        bid: Bid,
    ) -> Result<ApplicationView, MarketplaceError> {
        if caller.role != Role::Provider {
            return Err(MarketplaceError::Forbidden(
                "only providers can apply to requests",
            ));
        }
        let request = self.require_request(request_id)?;

        let application = Application {
            id: ApplicationId(0),
            request_id,
            provider_id: caller.id,
            message: bid.message,
            proposed_price: bid.proposed_price,
            proposed_days: bid.proposed_days,
            status: ApplicationStatus::Pending,
            requester_response: None,
            created_at: Utc::now(),
            responded_at: None,
        };
        let stored = self.store().insert_application(application)?;
        tracing::info!(
            application = stored.id.0,
            request = request_id.0,
            provider = caller.id.0,
            "application received"
        );

        self.notify_best_effort(
            request.requester_id,
            NotificationEvent::ApplicationReceived {
                request_id,
                application_id: stored.id,
            },
        );

        let request = self.require_request(request_id)?;
        self.application_view(&stored, &request)
    }

    /// Withdraw an own pending bid; decrements the parent's counter.
    pub fn withdraw(
        &self,
        id: ApplicationId,
        provider: UserId,
    ) -> Result<(), MarketplaceError> {
        let application = self.require_application(id)?;
        if application.provider_id != provider {
            return Err(MarketplaceError::Forbidden(
                "only the applying provider can withdraw this application",
            ));
        }
        self.store().withdraw_application(id, Utc::now())?;
        tracing::info!(application = id.0, "application withdrawn");
        Ok(())
    }

    /// Accept a pending bid. One atomic unit: the bid becomes Accepted, the
    /// request becomes Matched with this provider selected, and every rival
    /// pending bid is rejected with a system note.
    pub fn accept(
        &self,
        id: ApplicationId,
        requester: UserId,
    ) -> Result<ApplicationView, MarketplaceError> {
        let application = self.require_application(id)?;
        let request = self.require_request(application.request_id)?;
        if request.requester_id != requester {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can respond to its applications",
            ));
        }
        if request.status != RequestStatus::Published {
            return Err(MarketplaceError::InvalidTransition(
                "request is no longer open for matching",
            ));
        }
        if application.status != ApplicationStatus::Pending {
            return Err(MarketplaceError::InvalidTransition(
                "application is no longer pending",
            ));
        }

        let outcome = self
            .store()
            .accept_application(id, AUTO_REJECT_NOTE, Utc::now())?;
        tracing::info!(
            application = id.0,
            request = outcome.request.id.0,
            provider = outcome.accepted.provider_id.0,
            auto_rejected = outcome.auto_rejected.len(),
            "application accepted"
        );

        self.notify_best_effort(
            outcome.accepted.provider_id,
            NotificationEvent::ApplicationAccepted { application_id: id },
        );
        for rejected in &outcome.auto_rejected {
            self.notify_best_effort(
                rejected.provider_id,
                NotificationEvent::ApplicationRejected {
                    application_id: rejected.id,
                },
            );
        }

        self.application_view(&outcome.accepted, &outcome.request)
    }

    /// Reject a pending bid with an optional reason.
    pub fn reject(
        &self,
        id: ApplicationId,
        requester: UserId,
        reason: Option<String>,
    ) -> Result<ApplicationView, MarketplaceError> {
        let application = self.require_application(id)?;
        let request = self.require_request(application.request_id)?;
        if request.requester_id != requester {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can respond to its applications",
            ));
        }
        if request.status != RequestStatus::Published {
            return Err(MarketplaceError::InvalidTransition(
                "request is no longer open for matching",
            ));
        }
        if application.status != ApplicationStatus::Pending {
            return Err(MarketplaceError::InvalidTransition(
                "application is no longer pending",
            ));
        }

        let rejected = self.store().reject_application(id, reason, Utc::now())?;
        tracing::info!(application = id.0, "application rejected");

        self.notify_best_effort(
            rejected.provider_id,
            NotificationEvent::ApplicationRejected { application_id: id },
        );

        self.application_view(&rejected, &request)
    }

    /// All bids by a provider, newest-first.
    pub fn list_by_provider(
        &self,
        provider: UserId,
    ) -> Result<Vec<ApplicationView>, MarketplaceError> {
        let applications = self.store().applications_by_provider(provider)?;
        applications
            .iter()
            .map(|application| {
                let request = self.require_request(application.request_id)?;
                self.application_view(application, &request)
            })
            .collect()
    }

    /// All bids on an owned request, newest-first.
    pub fn list_by_request(
        &self,
        request_id: RequestId,
        requester: UserId,
    ) -> Result<Vec<ApplicationView>, MarketplaceError> {
        let request = self.require_request(request_id)?;
        if request.requester_id != requester {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can list its applications",
            ));
        }
        let applications = self.store().applications_by_request(request_id)?;
        applications
            .iter()
            .map(|application| self.application_view(application, &request))
            .collect()
    }

    pub(crate) fn require_application(
        &self,
        id: ApplicationId,
    ) -> Result<Application, MarketplaceError> {
        self.store()
            .application(id)?
            .ok_or(MarketplaceError::not_found("application", id.0))
    }

    fn application_view(
        &self,
        application: &Application,
        request: &ServiceRequest,
    ) -> Result<ApplicationView, MarketplaceError> {
        let provider = self.directory().user(application.provider_id);
        let rating = self.store().provider_rating(application.provider_id)?;
        Ok(ApplicationView::project(
            application,
            request,
            provider.as_ref(),
            rating.as_ref(),
        ))
    }
}
