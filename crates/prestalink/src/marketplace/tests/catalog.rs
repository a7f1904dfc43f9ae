use super::common::*;
use crate::marketplace::domain::{CategoryId, RequestId, RequestPatch, RequestStatus};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::store::PublishedFilter;

#[test]
fn create_publishes_immediately_when_asked() {
    let fx = fixture();
    let view = fx
        .marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), true)
        .expect("request created");
    assert_eq!(view.status, RequestStatus::Published);
    assert_eq!(view.application_count, 0);
    assert_eq!(view.selected_provider_id, None);
}

#[test]
fn create_keeps_draft_otherwise() {
    let fx = fixture();
    let view = fx
        .marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), false)
        .expect("draft created");
    assert_eq!(view.status, RequestStatus::Draft);
}

#[test]
fn create_fails_for_unknown_category() {
    let fx = fixture();
    let mut input = new_request(fx.plumbing);
    input.category_id = CategoryId(999);
    match fx.marketplace.create_request(fx.requester.id, input, true) {
        Err(MarketplaceError::NotFound { entity, .. }) => assert_eq!(entity, "category"),
        other => panic!("expected category not found, got {other:?}"),
    }
}

#[test]
fn update_applies_only_present_fields_and_can_publish_a_draft() {
    let fx = fixture();
    let draft = fx
        .marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), false)
        .expect("draft created");

    let patch = RequestPatch {
        title: Some("Fix leaking pipe urgently".to_string()),
        publish: true,
        ..RequestPatch::default()
    };
    let updated = fx
        .marketplace
        .update_request(draft.id, fx.requester.id, patch)
        .expect("update succeeds");

    assert_eq!(updated.title, "Fix leaking pipe urgently");
    assert_eq!(updated.status, RequestStatus::Published);
    // Untouched fields survive the patch.
    assert_eq!(updated.locality, "Plateau");
    assert_eq!(updated.budget_max, Some(20_000));
}

#[test]
fn update_forbidden_for_non_owner() {
    let fx = fixture();
    let request = published_request(&fx);
    match fx
        .marketplace
        .update_request(request.id, fx.provider.id, RequestPatch::default())
    {
        Err(MarketplaceError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[test]
fn update_rejected_once_matched() {
    let fx = fixture();
    let (request_id, _) = matched_engagement(&fx);
    match fx
        .marketplace
        .update_request(request_id, fx.requester.id, RequestPatch::default())
    {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn update_fails_for_missing_request() {
    let fx = fixture();
    match fx
        .marketplace
        .update_request(RequestId(404), fx.requester.id, RequestPatch::default())
    {
        Err(MarketplaceError::NotFound { entity, id }) => {
            assert_eq!(entity, "request");
            assert_eq!(id, 404);
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn cancel_blocked_while_matched() {
    let fx = fixture();
    let (request_id, _) = matched_engagement(&fx);
    match fx.marketplace.cancel_request(request_id, fx.requester.id) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn cancelled_request_stays_terminal() {
    let fx = fixture();
    let request = published_request(&fx);
    fx.marketplace
        .cancel_request(request.id, fx.requester.id)
        .expect("cancel succeeds");

    match fx
        .marketplace
        .update_request(request.id, fx.requester.id, RequestPatch::default())
    {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
    match fx.marketplace.cancel_request(request.id, fx.requester.id) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn complete_requires_matched_state_and_ownership() {
    let fx = fixture();
    let request = published_request(&fx);
    match fx.marketplace.complete_request(request.id, fx.requester.id) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }

    let (request_id, _) = matched_engagement(&fx);
    match fx.marketplace.complete_request(request_id, fx.provider.id) {
        Err(MarketplaceError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    let completed = fx
        .marketplace
        .complete_request(request_id, fx.requester.id)
        .expect("owner completes");
    assert_eq!(completed.status, RequestStatus::Completed);
    assert_eq!(completed.selected_provider_id, Some(fx.provider.id));
}

#[test]
fn address_leaks_only_to_matched_parties() {
    let fx = fixture();
    let request = published_request(&fx);

    let owner_view = fx
        .marketplace
        .request_by_id(request.id, fx.requester.id)
        .expect("owner reads");
    assert_eq!(owner_view.address.as_deref(), Some("12 Rue des Jardins"));

    let stranger_view = fx
        .marketplace
        .request_by_id(request.id, fx.provider.id)
        .expect("provider reads");
    assert_eq!(stranger_view.address, None);

    let (request_id, _) = matched_engagement(&fx);
    let selected_view = fx
        .marketplace
        .request_by_id(request_id, fx.provider.id)
        .expect("selected provider reads");
    assert_eq!(selected_view.address.as_deref(), Some("12 Rue des Jardins"));

    let rival_view = fx
        .marketplace
        .request_by_id(request_id, fx.second_provider.id)
        .expect("rival reads");
    assert_eq!(rival_view.address, None);
}

#[test]
fn published_listing_filters_and_hides_addresses() {
    let fx = fixture();
    published_request(&fx);
    let mut other = new_request(fx.electrical);
    other.title = "Rewire living room sockets".to_string();
    other.locality = "Cocody".to_string();
    fx.marketplace
        .create_request(fx.requester.id, other, true)
        .expect("second request publishes");
    // Drafts never appear in the public listing.
    fx.marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), false)
        .expect("draft created");

    let all = fx
        .marketplace
        .list_published(PublishedFilter::default())
        .expect("listing succeeds");
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|view| view.address.is_none()));

    let plateau_only = fx
        .marketplace
        .list_published(PublishedFilter {
            locality: Some("Plateau".to_string()),
            ..PublishedFilter::default()
        })
        .expect("filtered listing succeeds");
    assert_eq!(plateau_only.len(), 1);
    assert_eq!(plateau_only[0].locality, "Plateau");

    let electrical_only = fx
        .marketplace
        .list_published(PublishedFilter {
            category_id: Some(fx.electrical),
            ..PublishedFilter::default()
        })
        .expect("category filter succeeds");
    assert_eq!(electrical_only.len(), 1);
    assert_eq!(electrical_only[0].category_id, fx.electrical);
}

#[test]
fn search_matches_title_and_description_case_insensitively() {
    let fx = fixture();
    published_request(&fx);

    let by_title = fx.marketplace.search("LEAKING").expect("search runs");
    assert_eq!(by_title.len(), 1);

    let by_description = fx.marketplace.search("under the sink").expect("search runs");
    assert_eq!(by_description.len(), 1);

    let no_match = fx.marketplace.search("gardening").expect("search runs");
    assert!(no_match.is_empty());
}

#[test]
fn list_mine_includes_drafts_with_addresses() {
    let fx = fixture();
    published_request(&fx);
    fx.marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), false)
        .expect("draft created");

    let mine = fx
        .marketplace
        .list_mine(fx.requester.id)
        .expect("owner listing succeeds");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|view| view.address.is_some()));
}
