use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use prestalink::identity::{NotificationEvent, Notifier, NotifyError, StaticDirectory, UserRecord};
use prestalink::marketplace::{CategoryId, MemoryStore, Role, UserId};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier that writes deliveries to the log. Stands in for the mail or
/// push adapter of a full deployment.
#[derive(Default, Clone)]
pub(crate) struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user: UserId, event: NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(user = user.0, ?event, "notification dispatched");
        Ok(())
    }
}

/// Bearer tokens for the seeded demo accounts.
pub(crate) const CLIENT_TOKEN: &str = "demo-client";
pub(crate) const PLUMBER_TOKEN: &str = "demo-plumber";
pub(crate) const ELECTRICIAN_TOKEN: &str = "demo-electrician";

pub(crate) struct DemoWorld {
    pub(crate) client: UserRecord,
    pub(crate) plumber: UserRecord,
    pub(crate) electrician: UserRecord,
    pub(crate) plumbing: CategoryId,
    pub(crate) electrical: CategoryId,
}

/// Seed the store and directory with the demo categories and accounts used
/// by both the CLI demo and the development server.
pub(crate) fn seed_demo_world(store: &MemoryStore, directory: &StaticDirectory) -> DemoWorld {
    let plumbing = store.register_category("Plumbing");
    let electrical = store.register_category("Electrical");

    let client = UserRecord {
        id: UserId(1),
        role: Role::Requester,
        active: true,
        name: "Awa Kone".to_string(),
        phone: Some("+225 07 01 02 03".to_string()),
        email: "awa@prestalink.example".to_string(),
    };
    let plumber = UserRecord {
        id: UserId(2),
        role: Role::Provider,
        active: true,
        name: "Yao Kouassi".to_string(),
        phone: Some("+225 05 44 55 66".to_string()),
        email: "yao@prestalink.example".to_string(),
    };
    let electrician = UserRecord {
        id: UserId(3),
        role: Role::Provider,
        active: true,
        name: "Moussa Diarra".to_string(),
        phone: Some("+225 01 77 88 99".to_string()),
        email: "moussa@prestalink.example".to_string(),
    };

    directory.register(CLIENT_TOKEN, client.clone());
    directory.register(PLUMBER_TOKEN, plumber.clone());
    directory.register(ELECTRICIAN_TOKEN, electrician.clone());

    DemoWorld {
        client,
        plumber,
        electrician,
        plumbing,
        electrical,
    }
}
