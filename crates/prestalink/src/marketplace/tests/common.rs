use std::sync::{Arc, Mutex};

use crate::identity::{
    NotificationEvent, Notifier, NotifyError, StaticDirectory, UserRecord,
};
use crate::marketplace::domain::{
    Bid, CategoryId, NewRequest, RequestId, Role, Urgency, UserId,
};
use crate::marketplace::memory::MemoryStore;
use crate::marketplace::views::RequestView;
use crate::marketplace::Marketplace;

/// Notifier capturing every event so tests can assert the outbound hooks.
#[derive(Default)]
pub(super) struct RecordingNotifier {
    events: Mutex<Vec<(UserId, NotificationEvent)>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<(UserId, NotificationEvent)> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    /// Make every subsequent delivery fail, to prove best-effort semantics.
    pub(super) fn start_failing(&self) {
        *self.fail.lock().expect("notifier mutex poisoned") = true;
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user: UserId, event: NotificationEvent) -> Result<(), NotifyError> {
        if *self.fail.lock().expect("notifier mutex poisoned") {
            return Err(NotifyError::Transport("smtp relay down".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push((user, event));
        Ok(())
    }
}

pub(super) type TestMarketplace = Marketplace<MemoryStore, StaticDirectory, RecordingNotifier>;

pub(super) struct Fixture {
    pub(super) marketplace: TestMarketplace,
    pub(super) store: Arc<MemoryStore>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) requester: UserRecord,
    pub(super) provider: UserRecord,
    pub(super) second_provider: UserRecord,
    pub(super) plumbing: CategoryId,
    pub(super) electrical: CategoryId,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticDirectory::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let plumbing = store.register_category("Plumbing");
    let electrical = store.register_category("Electrical");

    let requester = UserRecord {
        id: UserId(1),
        role: Role::Requester,
        active: true,
        name: "Awa Kone".to_string(),
        phone: Some("+225 07 01 02 03".to_string()),
        email: "awa@example.com".to_string(),
    };
    let provider = UserRecord {
        id: UserId(2),
        role: Role::Provider,
        active: true,
        name: "Yao Kouassi".to_string(),
        phone: Some("+225 05 44 55 66".to_string()),
        email: "yao@example.com".to_string(),
    };
    let second_provider = UserRecord {
        id: UserId(3),
        role: Role::Provider,
        active: true,
        name: "Moussa Diarra".to_string(),
        phone: Some("+225 01 77 88 99".to_string()),
        email: "moussa@example.com".to_string(),
    };
    directory.register("awa-token", requester.clone());
    directory.register("yao-token", provider.clone());
    directory.register("moussa-token", second_provider.clone());

    let marketplace = Marketplace::new(store.clone(), directory.clone(), notifier.clone());

    Fixture {
        marketplace,
        store,
        notifier,
        requester,
        provider,
        second_provider,
        plumbing,
        electrical,
    }
}

pub(super) fn new_request(category: CategoryId) -> NewRequest {
    NewRequest {
        category_id: category,
        title: "Fix leaking pipe".to_string(),
        description: "Kitchen pipe leaks under the sink, needs urgent repair".to_string(),
        locality: "Plateau".to_string(),
        address: Some("12 Rue des Jardins".to_string()),
        budget_min: Some(10_000),
        budget_max: Some(20_000),
        desired_date: None,
        urgency: Urgency::Urgent,
    }
}

pub(super) fn bid(price: u32) -> Bid {
    Bid {
        message: Some("Available today".to_string()),
        proposed_price: Some(price),
        proposed_days: Some(1),
    }
}

/// Publish a fresh request owned by the fixture requester.
pub(super) fn published_request(fx: &Fixture) -> RequestView {
    fx.marketplace
        .create_request(fx.requester.id, new_request(fx.plumbing), true)
        .expect("request publishes")
}

/// Publish, bid, and accept: returns (request id, accepted application id).
pub(super) fn matched_engagement(fx: &Fixture) -> (RequestId, crate::marketplace::ApplicationId) {
    let request = published_request(fx);
    let application = fx
        .marketplace
        .apply(request.id, &fx.provider, bid(15_000))
        .expect("provider applies");
    fx.marketplace
        .accept(application.id, fx.requester.id)
        .expect("requester accepts");
    (request.id, application.id)
}
