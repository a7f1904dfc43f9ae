//! Reputation engine: one review per completed engagement, with a full
//! recompute of the provider aggregate on every write.

use chrono::Utc;

use crate::identity::{IdentityDirectory, Notifier};

use super::domain::{
    ApplicationId, NewReview, ProviderRating, RequestStatus, Review, ReviewId, UserId,
};
use super::error::MarketplaceError;
use super::store::MarketplaceStore;
use super::views::ReviewView;
use super::Marketplace;

/// Upper bound on the recent-reviews listing.
const RECENT_REVIEWS_CAP: usize = 20;

fn valid_rating(value: u8) -> bool {
    (1..=5).contains(&value)
}

impl<S, D, N> Marketplace<S, D, N>
where
    S: MarketplaceStore,
    D: IdentityDirectory,
    N: Notifier,
{
    /// Leave a review for a completed engagement. The provider's aggregate
    /// rating is recomputed from the full review set, never patched
    /// incrementally.
    pub fn create_review(
        &self,
        application_id: ApplicationId,
        client: UserId,
        input: NewReview,
    ) -> Result<ReviewView, MarketplaceError> {
        let sub_ratings = [input.quality, input.punctuality, input.communication];
        if !valid_rating(input.rating) || sub_ratings.iter().flatten().any(|&r| !valid_rating(r)) {
            return Err(MarketplaceError::Validation(
                "ratings must be between 1 and 5".to_string(),
            ));
        }

        let application = self.require_application(application_id)?;
        let request = self.require_request(application.request_id)?;
        if request.requester_id != client {
            return Err(MarketplaceError::Forbidden(
                "only the request owner can review this engagement",
            ));
        }
        if request.status != RequestStatus::Completed {
            return Err(MarketplaceError::InvalidTransition(
                "reviews are only allowed after the request is completed",
            ));
        }

        let review = Review {
            id: ReviewId(0),
            application_id,
            client_id: client,
            provider_id: application.provider_id,
            rating: input.rating,
            comment: input.comment,
            quality: input.quality,
            punctuality: input.punctuality,
            communication: input.communication,
            created_at: Utc::now(),
        };
        let stored = self.store().insert_review(review)?;

        self.recompute_provider_rating(application.provider_id)?;
        tracing::info!(
            review = stored.id.0,
            provider = application.provider_id.0,
            rating = stored.rating,
            "review recorded"
        );

        self.review_view(&stored)
    }

    /// A provider's reviews, newest-first.
    pub fn reviews_by_provider(
        &self,
        provider: UserId,
    ) -> Result<Vec<ReviewView>, MarketplaceError> {
        let reviews = self.store().reviews_by_provider(provider)?;
        reviews.iter().map(|r| self.review_view(r)).collect()
    }

    /// Mean of the provider's overall ratings, `None` when unreviewed.
    pub fn average_rating(&self, provider: UserId) -> Result<Option<f64>, MarketplaceError> {
        let reviews = self.store().reviews_by_provider(provider)?;
        if reviews.is_empty() {
            return Ok(None);
        }
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        Ok(Some(f64::from(sum) / reviews.len() as f64))
    }

    /// Most recent reviews across all providers, capped.
    pub fn recent_reviews(&self, limit: usize) -> Result<Vec<ReviewView>, MarketplaceError> {
        let reviews = self
            .store()
            .recent_reviews(limit.min(RECENT_REVIEWS_CAP))?;
        reviews.iter().map(|r| self.review_view(r)).collect()
    }

    fn recompute_provider_rating(&self, provider: UserId) -> Result<(), MarketplaceError> {
        let reviews = self.store().reviews_by_provider(provider)?;
        if reviews.is_empty() {
            return Ok(());
        }
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        let rating = ProviderRating {
            average: f64::from(sum) / reviews.len() as f64,
            count: reviews.len() as u32,
        };
        Ok(self.store().save_provider_rating(provider, rating)?)
    }

    fn review_view(&self, review: &Review) -> Result<ReviewView, MarketplaceError> {
        let request_title = self
            .store()
            .application(review.application_id)?
            .and_then(|application| {
                self.store()
                    .request(application.request_id)
                    .ok()
                    .flatten()
                    .map(|request| request.title)
            });
        let client = self.directory().user(review.client_id);
        let provider = self.directory().user(review.provider_id);
        Ok(ReviewView::project(
            review,
            request_title,
            client.as_ref(),
            provider.as_ref(),
        ))
    }
}
