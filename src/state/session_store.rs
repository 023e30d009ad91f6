use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::{
    sync::{Mutex, OwnedMutexGuard, RwLock},
    time::timeout,
};

use crate::{
    dao::{
        kv_store::KeyValueStore,
        models::GameRecordEntity,
        storage::{StorageError, StorageResult},
    },
    state::{
        game::{CorruptRecordError, Departure, GameRecord, TransitionError},
        grid::Seat,
        ids::IdGenerator,
    },
};

/// Lock acquisition bound used when none is configured.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_ID_ATTEMPTS: usize = 8;

/// Result alias for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures surfaced by [`SessionStore`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transition was rejected by the game rules or its preconditions.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// No record exists for the requested id.
    #[error("game `{0}` not found")]
    GameNotFound(String),
    /// Another transition held the game lock for too long.
    #[error("game `{0}` is busy, try again")]
    Busy(String),
    /// The backend failed or is missing.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The stored record could not be trusted.
    #[error("stored record for game `{game_id}` is corrupt")]
    Corrupt {
        /// Game whose record failed to load.
        game_id: String,
        /// What was wrong with it.
        #[source]
        source: CorruptRecordError,
    },
    /// The record could not be serialized.
    #[error("failed to encode game `{game_id}`")]
    Encode {
        /// Game being saved.
        game_id: String,
        /// Serializer failure.
        #[source]
        source: serde_json::Error,
    },
    /// The id generator kept producing ids that are already taken.
    #[error("could not allocate a fresh game id")]
    IdCollision,
}

impl SessionError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Busy(_) | SessionError::Storage(_))
    }
}

/// Owner of every persisted [`GameRecord`].
///
/// Each mutating operation loads the whole record, applies one transition and
/// writes the whole record back while holding the lock of that game only.
pub struct SessionStore {
    backend: RwLock<Option<Arc<dyn KeyValueStore>>>,
    ids: Arc<dyn IdGenerator>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    lock_timeout: Duration,
}

impl SessionStore {
    /// Store without a backend; operations fail until one is installed.
    pub fn new(ids: Arc<dyn IdGenerator>, lock_timeout: Duration) -> Self {
        Self {
            backend: RwLock::new(None),
            ids,
            locks: DashMap::new(),
            lock_timeout,
        }
    }

    /// Replace the key-value backend.
    pub async fn install_backend(&self, backend: Arc<dyn KeyValueStore>) {
        let mut guard = self.backend.write().await;
        *guard = Some(backend);
    }

    /// Drop the backend, returning to degraded operation.
    pub async fn clear_backend(&self) {
        let mut guard = self.backend.write().await;
        guard.take();
    }

    /// Currently installed backend, if any.
    pub async fn backend(&self) -> Option<Arc<dyn KeyValueStore>> {
        let guard = self.backend.read().await;
        guard.as_ref().cloned()
    }

    /// Fresh identifier for a player joining without one.
    pub fn new_player_id(&self) -> String {
        self.ids.player_id()
    }

    /// Generate an id and persist an empty record under it.
    pub async fn create(&self) -> SessionResult<String> {
        let backend = self.require_backend().await?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let game_id = self.ids.game_id();
            let _guard = self.lock(&game_id).await?;
            if backend.get(&game_id).await?.is_some() {
                continue;
            }

            save(backend.as_ref(), &GameRecord::new(game_id.clone())).await?;
            return Ok(game_id);
        }

        Err(SessionError::IdCollision)
    }

    /// Read-only snapshot of a game.
    pub async fn get(&self, game_id: &str) -> SessionResult<Option<GameRecord>> {
        let backend = self.require_backend().await?;
        load(backend.as_ref(), game_id).await
    }

    /// Seat assigned to every player of the game.
    pub async fn players(&self, game_id: &str) -> SessionResult<IndexMap<String, Seat>> {
        Ok(self.existing(game_id).await?.player_positions)
    }

    /// Open connection count of one player, `None` when it has no entry.
    pub async fn open_connections(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> SessionResult<Option<u32>> {
        let record = self.existing(game_id).await?;
        Ok(record.player_open_connections.get(player_id).copied())
    }

    /// Seat a new player. See [`GameRecord::add_player`].
    pub async fn add_player(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> SessionResult<(Seat, GameRecord)> {
        self.transition(game_id, |record| record.add_player(player_id))
            .await
    }

    /// Count a new connection of a seated player.
    pub async fn add_connection(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> SessionResult<(u32, GameRecord)> {
        self.transition(game_id, |record| record.add_connection(player_id))
            .await
    }

    /// Count a closed connection without releasing the seat.
    pub async fn remove_connection(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> SessionResult<(u32, GameRecord)> {
        self.transition(game_id, |record| record.remove_connection(player_id))
            .await
    }

    /// Release a player's seat.
    pub async fn remove_player(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> SessionResult<GameRecord> {
        self.transition(game_id, |record| record.remove_player(player_id))
            .await
            .map(|(_, record)| record)
    }

    /// Close one connection and release the seat if it was the last.
    pub async fn disconnect(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> SessionResult<(Departure, GameRecord)> {
        self.transition(game_id, |record| record.disconnect(player_id))
            .await
    }

    /// Drop a disc in `column` on behalf of `player_id`.
    pub async fn play_turn(
        &self,
        game_id: &str,
        player_id: &str,
        column: usize,
    ) -> SessionResult<GameRecord> {
        self.transition(game_id, |record| record.play_turn(player_id, column))
            .await
            .map(|(_, record)| record)
    }

    /// Reset a finished game.
    pub async fn restart(&self, game_id: &str) -> SessionResult<GameRecord> {
        self.transition(game_id, GameRecord::restart)
            .await
            .map(|(_, record)| record)
    }

    async fn transition<T, F>(&self, game_id: &str, apply: F) -> SessionResult<(T, GameRecord)>
    where
        F: FnOnce(&mut GameRecord) -> Result<T, TransitionError>,
    {
        let _guard = self.lock(game_id).await?;
        let backend = self.require_backend().await?;

        let mut record = load(backend.as_ref(), game_id)
            .await?
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        let value = apply(&mut record)?;
        save(backend.as_ref(), &record).await?;
        Ok((value, record))
    }

    async fn existing(&self, game_id: &str) -> SessionResult<GameRecord> {
        self.get(game_id)
            .await?
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))
    }

    async fn require_backend(&self) -> StorageResult<Arc<dyn KeyValueStore>> {
        self.backend().await.ok_or(StorageError::NotInstalled)
    }

    pub(crate) async fn lock(&self, game_id: &str) -> SessionResult<GameLock<'_>> {
        let gate = self.locks.entry(game_id.to_string()).or_default().clone();
        match timeout(self.lock_timeout, gate.lock_owned()).await {
            Ok(guard) => Ok(GameLock {
                locks: &self.locks,
                game_id: game_id.to_string(),
                guard: Some(guard),
            }),
            Err(_) => {
                prune_lock(&self.locks, game_id);
                Err(SessionError::Busy(game_id.to_string()))
            }
        }
    }
}

/// Exclusive hold on one game; the map entry goes away with the last user.
pub(crate) struct GameLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    game_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GameLock<'_> {
    fn drop(&mut self) {
        // Release before pruning.
        self.guard.take();
        prune_lock(self.locks, &self.game_id);
    }
}

fn prune_lock(locks: &DashMap<String, Arc<Mutex<()>>>, game_id: &str) {
    locks.remove_if(game_id, |_, gate| Arc::strong_count(gate) == 1);
}

async fn load(backend: &dyn KeyValueStore, game_id: &str) -> SessionResult<Option<GameRecord>> {
    let Some(bytes) = backend.get(game_id).await? else {
        return Ok(None);
    };

    let corrupt = |source| SessionError::Corrupt {
        game_id: game_id.to_string(),
        source,
    };
    let entity = GameRecordEntity::from_bytes(&bytes)
        .map_err(|err| corrupt(CorruptRecordError::Decode(err)))?;
    GameRecord::try_from(entity).map(Some).map_err(corrupt)
}

async fn save(backend: &dyn KeyValueStore, record: &GameRecord) -> SessionResult<()> {
    let bytes = GameRecordEntity::from(record)
        .to_bytes()
        .map_err(|source| SessionError::Encode {
            game_id: record.game_id.clone(),
            source,
        })?;
    backend.set(&record.game_id, bytes).await?;
    Ok(())
}
