//! FitTrack notification engine.
//!
//! Activity notifications emitted after workout, progress and nutrition
//! writes, a daily reminder job, and the REST API the dashboard's
//! notification panel uses.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod notification;
pub mod store;

use notification::{EventEmitter, PreferenceGate};
use store::{ActivityStore, NotificationStore, UserDirectory};

/// Shared application state passed to handlers.
pub struct AppState {
    pub notifications: Arc<dyn NotificationStore>,
    pub users: Arc<dyn UserDirectory>,
    pub activities: Arc<dyn ActivityStore>,
    pub emitter: EventEmitter,
    pub config: config::Config,
}

impl AppState {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        activities: Arc<dyn ActivityStore>,
        config: config::Config,
    ) -> Self {
        let emitter = EventEmitter::new(notifications.clone(), PreferenceGate::new(users.clone()));
        Self {
            notifications,
            users,
            activities,
            emitter,
            config,
        }
    }

    /// All three stores backed by one implementation.
    pub fn with_store<S>(store: S, config: config::Config) -> Self
    where
        S: NotificationStore + UserDirectory + ActivityStore + 'static,
    {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, config)
    }
}
