//! External collaborator seams: the identity directory that resolves opaque
//! caller tokens to user records, and the outbound notification hook.
//!
//! The marketplace core trusts identity resolution entirely; it only applies
//! the ownership and role checks layered on top. Notification delivery is
//! best-effort and must never fail the operation that triggered it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::marketplace::domain::{ApplicationId, RequestId, Role, UserId};

/// User record as resolved by the identity directory. The marketplace reads
/// these; account lifecycle is owned elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub role: Role,
    pub active: bool,
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
}

/// Resolves caller credentials and user ids to user records.
pub trait IdentityDirectory: Send + Sync {
    /// Resolve an opaque bearer token to the user it belongs to.
    fn resolve(&self, token: &str) -> Result<UserRecord, IdentityError>;

    /// Look up a user by id, for participant display data.
    fn user(&self, id: UserId) -> Option<UserRecord>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("unknown or expired credentials")]
    UnknownToken,
    #[error("account is deactivated")]
    Inactive,
}

/// Events the marketplace emits towards users. The transport (email, SMS,
/// push) is the notifier's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NotificationEvent {
    ApplicationReceived {
        request_id: RequestId,
        application_id: ApplicationId,
    },
    ApplicationAccepted {
        application_id: ApplicationId,
    },
    ApplicationRejected {
        application_id: ApplicationId,
    },
}

/// Outbound notification hook (e.g., an email adapter).
pub trait Notifier: Send + Sync {
    fn notify(&self, user: UserId, event: NotificationEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Token-table directory backed by a mutex-guarded map. Serves the demo
/// wiring and tests; a production deployment would put a real credential
/// service behind the same trait.
#[derive(Default, Clone)]
pub struct StaticDirectory {
    users: Arc<Mutex<DirectoryTables>>,
}

#[derive(Default)]
struct DirectoryTables {
    by_token: HashMap<String, UserId>,
    by_id: HashMap<UserId, UserRecord>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user under the given bearer token.
    pub fn register(&self, token: &str, record: UserRecord) {
        let mut tables = self.users.lock().expect("directory mutex poisoned");
        tables.by_token.insert(token.to_string(), record.id);
        tables.by_id.insert(record.id, record);
    }
}

impl IdentityDirectory for StaticDirectory {
    fn resolve(&self, token: &str) -> Result<UserRecord, IdentityError> {
        let tables = self.users.lock().expect("directory mutex poisoned");
        let id = tables
            .by_token
            .get(token)
            .ok_or(IdentityError::UnknownToken)?;
        let record = tables.by_id.get(id).ok_or(IdentityError::UnknownToken)?;
        if !record.active {
            return Err(IdentityError::Inactive);
        }
        Ok(record.clone())
    }

    fn user(&self, id: UserId) -> Option<UserRecord> {
        let tables = self.users.lock().expect("directory mutex poisoned");
        tables.by_id.get(&id).cloned()
    }
}
