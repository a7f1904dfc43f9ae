use super::common::*;
use crate::identity::NotificationEvent;
use crate::marketplace::domain::{ApplicationStatus, RequestStatus, AUTO_REJECT_NOTE};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::store::MarketplaceStore;

#[test]
fn apply_requires_provider_role() {
    let fx = fixture();
    let request = published_request(&fx);
    match fx.marketplace.apply(request.id, &fx.requester, bid(15_000)) {
        Err(MarketplaceError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[test]
fn apply_requires_published_request() {
    let fx = fixture();
    let draft = fx
        .marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), false)
        .expect("draft created");
    match fx.marketplace.apply(draft.id, &fx.provider, bid(15_000)) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn duplicate_application_conflicts() {
    let fx = fixture();
    let request = published_request(&fx);
    fx.marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("first bid lands");
    match fx.marketplace.apply(request.id, &fx.provider, bid(12_000)) {
        Err(MarketplaceError::Conflict(_)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn apply_increments_counter_and_notifies_requester() {
    let fx = fixture();
    let request = published_request(&fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    let stored = fx
        .store
        .request(request.id)
        .expect("fetch succeeds")
        .expect("request present");
    assert_eq!(stored.application_count, 1);

    let events = fx.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, fx.requester.id);
    assert_eq!(
        events[0].1,
        NotificationEvent::ApplicationReceived {
            request_id: request.id,
            application_id: application.id,
        }
    );
}

#[test]
fn withdraw_decrements_counter_and_floors_at_zero() {
    let fx = fixture();
    let request = published_request(&fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    fx.marketplace
        .withdraw(application.id, fx.provider.id)
        .expect("withdraw succeeds");

    let stored = fx
        .store
        .request(request.id)
        .expect("fetch succeeds")
        .expect("request present");
    assert_eq!(stored.application_count, 0);

    // Counter always matches the live non-withdrawn count.
    let live = fx
        .store
        .applications_by_request(request.id)
        .expect("listing succeeds")
        .iter()
        .filter(|a| a.status != ApplicationStatus::Withdrawn)
        .count() as u32;
    assert_eq!(stored.application_count, live);
}

#[test]
fn withdraw_requires_the_applying_provider_and_pending_status() {
    let fx = fixture();
    let request = published_request(&fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    match fx
        .marketplace
        .withdraw(application.id, fx.second_provider.id)
    {
        Err(MarketplaceError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }

    fx.marketplace
        .accept(application.id, fx.requester.id)
        .expect("accept succeeds");
    match fx.marketplace.withdraw(application.id, fx.provider.id) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn accept_matches_request_and_rejects_rivals_atomically() {
    let fx = fixture();
    let request = published_request(&fx);
    let winner = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("first bid lands");
    let rival = fx
        .marketplace
        .apply(request.id, &fx.second_provider, bid(13_000))
        .expect("second bid lands");

    let accepted = fx
        .marketplace
        .accept(winner.id, fx.requester.id)
        .expect("accept succeeds");
    assert_eq!(accepted.status, ApplicationStatus::Accepted);
    assert!(accepted.responded_at.is_some());

    let stored_request = fx
        .store
        .request(request.id)
        .expect("fetch succeeds")
        .expect("request present");
    assert_eq!(stored_request.status, RequestStatus::Matched);
    assert_eq!(stored_request.selected_provider_id, Some(fx.provider.id));

    let stored_rival = fx
        .store
        .application(rival.id)
        .expect("fetch succeeds")
        .expect("rival present");
    assert_eq!(stored_rival.status, ApplicationStatus::Rejected);
    assert_eq!(
        stored_rival.requester_response.as_deref(),
        Some(AUTO_REJECT_NOTE)
    );
    assert!(stored_rival.responded_at.is_some());

    let events = fx.notifier.events();
    assert!(events.contains(&(
        fx.provider.id,
        NotificationEvent::ApplicationAccepted {
            application_id: winner.id
        }
    )));
    assert!(events.contains(&(
        fx.second_provider.id,
        NotificationEvent::ApplicationRejected {
            application_id: rival.id
        }
    )));
}

#[test]
fn accept_guards_ownership_and_pending_status() {
    let fx = fixture();
    let request = published_request(&fx);
    let winner = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    match fx.marketplace.accept(winner.id, fx.provider.id) {
        Err(MarketplaceError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }

    fx.marketplace
        .accept(winner.id, fx.requester.id)
        .expect("accept succeeds");
    match fx.marketplace.accept(winner.id, fx.requester.id) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn cancelled_request_cannot_be_matched_through_accept() {
    let fx = fixture();
    let request = published_request(&fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");
    fx.marketplace
        .cancel_request(request.id, fx.requester.id)
        .expect("cancel succeeds");

    match fx.marketplace.accept(application.id, fx.requester.id) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
    match fx.marketplace.reject(application.id, fx.requester.id, None) {
        Err(MarketplaceError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }

    let stored_request = fx
        .store
        .request(request.id)
        .expect("fetch succeeds")
        .expect("request present");
    assert_eq!(stored_request.status, RequestStatus::Cancelled);
    assert_eq!(stored_request.selected_provider_id, None);

    let stored_application = fx
        .store
        .application(application.id)
        .expect("fetch succeeds")
        .expect("application present");
    assert_eq!(stored_application.status, ApplicationStatus::Pending);
}

#[test]
fn notification_failure_never_fails_the_acceptance() {
    let fx = fixture();
    let request = published_request(&fx);
    let winner = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    fx.notifier.start_failing();
    let accepted = fx
        .marketplace
        .accept(winner.id, fx.requester.id)
        .expect("accept survives notifier outage");
    assert_eq!(accepted.status, ApplicationStatus::Accepted);
}

#[test]
fn reject_stores_the_reason_and_stamps_responded_at() {
    let fx = fixture();
    let request = published_request(&fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    let rejected = fx
        .marketplace
        .reject(
            application.id,
            fx.requester.id,
            Some("Budget too high".to_string()),
        )
        .expect("reject succeeds");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    assert_eq!(rejected.requester_response.as_deref(), Some("Budget too high"));
    assert!(rejected.responded_at.is_some());

    // The request keeps accepting other bids.
    let stored_request = fx
        .store
        .request(request.id)
        .expect("fetch succeeds")
        .expect("request present");
    assert_eq!(stored_request.status, RequestStatus::Published);
}

#[test]
fn provider_phone_hidden_until_matched() {
    let fx = fixture();
    let request = published_request(&fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("bid lands");

    let before = fx
        .marketplace
        .list_by_request(request.id, fx.requester.id)
        .expect("listing succeeds");
    assert_eq!(before[0].provider_phone, None);

    fx.marketplace
        .accept(application.id, fx.requester.id)
        .expect("accept succeeds");

    let after = fx
        .marketplace
        .list_by_request(request.id, fx.requester.id)
        .expect("listing succeeds");
    let accepted_view = after
        .iter()
        .find(|view| view.id == application.id)
        .expect("accepted bid listed");
    assert_eq!(
        accepted_view.provider_phone.as_deref(),
        Some("+225 05 44 55 66")
    );
}

#[test]
fn rejected_rival_never_exposes_contact_details() {
    let fx = fixture();
    let request = published_request(&fx);
    let winner = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("first bid lands");
    let rival = fx
        .marketplace
        .apply(request.id, &fx.second_provider, bid(13_000))
        .expect("second bid lands");
    fx.marketplace
        .accept(winner.id, fx.requester.id)
        .expect("accept succeeds");

    let listed = fx
        .marketplace
        .list_by_request(request.id, fx.requester.id)
        .expect("listing succeeds");
    let rival_view = listed
        .iter()
        .find(|view| view.id == rival.id)
        .expect("rival listed");
    assert_eq!(rival_view.provider_phone, None);
}

#[test]
fn listing_by_request_requires_ownership() {
    let fx = fixture();
    let request = published_request(&fx);
    match fx
        .marketplace
        .list_by_request(request.id, fx.provider.id)
    {
        Err(MarketplaceError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[test]
fn provider_sees_their_applications_newest_first() {
    let fx = fixture();
    let first_request = published_request(&fx);
    let mut other = new_request(fx.electrical);
    other.title = "Install ceiling fan".to_string();
    let second_request = fx
        .marketplace
        .create_request(fx.requester.id, other, true)
        .expect("second request publishes");

    fx.marketplace
        .apply(first_request.id, &fx.provider, bid(15_000))
        .expect("first bid lands");
    let latest = fx
        .marketplace
        .apply(second_request.id, &fx.provider, bid(8_000))
        .expect("second bid lands");

    let mine = fx
        .marketplace
        .list_by_provider(fx.provider.id)
        .expect("listing succeeds");
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, latest.id);
}
