pub mod game;
pub mod grid;
pub mod ids;
pub mod room;
pub mod session_store;

use std::sync::Arc;

use tokio::sync::watch;

use crate::{config::AppConfig, dao::kv_store::KeyValueStore};

use self::{
    ids::{IdGenerator, RandomIds},
    room::Rooms,
    session_store::SessionStore,
};

pub type SharedState = Arc<AppState>;

/// Central application state: game records, per-game broadcast rooms and the degraded flag.
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: SessionStore,
    rooms: Rooms,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_id_generator(config, Arc::new(RandomIds))
    }

    /// Same as [`AppState::new`] with a custom identifier source.
    pub fn with_id_generator(config: AppConfig, ids: Arc<dyn IdGenerator>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            sessions: SessionStore::new(ids, config.lock_timeout()),
            rooms: Rooms::new(config.room_capacity()),
            config: Arc::new(config),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Store owning every game record.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Broadcast rooms keyed by game id.
    pub fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn KeyValueStore>) {
        self.sessions.install_backend(store).await;
        self.update_degraded(false);
    }

    /// Remove the current backend and enter degraded mode.
    pub async fn clear_store(&self) {
        self.sessions.clear_backend().await;
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
