//! Login sessions persisted next to the `users` table.
//!
//! [`SessionBackend::for_credentials`] picks the database store when the
//! credential pool is up and the in-memory store otherwise. Memory sessions
//! end when the process exits.

use super::session;
use super::CredentialStore;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;
use std::time::Duration;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion};
use tower_sessions::{MemoryStore, SessionStore};
use tracing::{debug, info, warn};

/// How often expired rows are swept by [`SessionBackend::run_expired_deletion`].
pub const EXPIRED_SWEEP_PERIOD: Duration = Duration::from_secs(60);

fn backend_err(e: DbErr) -> session_store::Error {
    session_store::Error::Backend(e.to_string())
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// `SessionStore` over the `tower_sessions` table.
#[derive(Debug, Clone)]
pub struct SeaOrmSessionStore {
    db: DatabaseConnection,
}

impl SeaOrmSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn exists(&self, id: &Id) -> session_store::Result<bool> {
        Ok(session::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(backend_err)?
            .is_some())
    }

    /// Remove every row whose expiry is in the past. Returns the row count.
    pub async fn purge_expired(&self) -> session_store::Result<u64> {
        let res = session::Entity::delete_many()
            .filter(session::Column::ExpiryDate.lt(now_unix()))
            .exec(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl SessionStore for SeaOrmSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.exists(&record.id).await? {
            record.id = Id::default();
        }
        self.save(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;
        let row = session::ActiveModel {
            id: Set(record.id.to_string()),
            data: Set(data),
            expiry_date: Set(record.expiry_date.unix_timestamp()),
        };

        session::Entity::insert(row)
            .on_conflict(
                OnConflict::column(session::Column::Id)
                    .update_columns([session::Column::Data, session::Column::ExpiryDate])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let row = session::Entity::find_by_id(session_id.to_string())
            .filter(session::Column::ExpiryDate.gt(now_unix()))
            .one(&self.db)
            .await
            .map_err(backend_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let data: HashMap<String, serde_json::Value> = serde_json::from_str(&row.data)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        let expiry_date = OffsetDateTime::from_unix_timestamp(row.expiry_date)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;

        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        session::Entity::delete_by_id(session_id.to_string())
            .exec(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SeaOrmSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        self.purge_expired().await.map(|_| ())
    }
}

/// The session store the router is built with.
#[derive(Debug, Clone)]
pub enum SessionBackend {
    Database(SeaOrmSessionStore),
    /// Used only while the credential store is unavailable.
    Memory(MemoryStore),
}

impl SessionBackend {
    pub fn for_credentials(credentials: &CredentialStore) -> Self {
        match credentials.connection() {
            Some(db) => Self::Database(SeaOrmSessionStore::new(db.clone())),
            None => {
                warn!("Sessions fall back to memory and end on restart");
                Self::Memory(MemoryStore::default())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Sweep expired sessions every `period` until the task is dropped.
    ///
    /// Returns at once for the memory store. It hides expired records on
    /// load but offers no sweep.
    pub async fn run_expired_deletion(self, period: Duration) {
        let Self::Database(store) = self else {
            return;
        };
        info!("Expired-session sweep every {:?}", period);

        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => debug!("Deleted {} expired sessions", n),
                Err(e) => warn!("Expired-session sweep failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            Self::Database(store) => store.create(record).await,
            Self::Memory(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            Self::Database(store) => store.save(record).await,
            Self::Memory(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            Self::Database(store) => store.load(session_id).await,
            Self::Memory(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            Self::Database(store) => store.delete(session_id).await,
            Self::Memory(store) => store.delete(session_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_sessions::cookie::time::Duration as TimeDuration;

    async fn sqlite_sessions(dir: &tempfile::TempDir) -> SeaOrmSessionStore {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("users.db").display());
        let credentials = CredentialStore::connect(&url).await;
        match SessionBackend::for_credentials(&credentials) {
            SessionBackend::Database(store) => store,
            SessionBackend::Memory(_) => panic!("sqlite should give a database store"),
        }
    }

    fn record(expires_in: TimeDuration) -> Record {
        let mut data = HashMap::new();
        data.insert("user".to_string(), serde_json::json!({"id": 1, "name": "Ada"}));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn saved_session_loads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_sessions(&tmp).await;

        let mut rec = record(TimeDuration::hours(1));
        store.create(&mut rec).await.unwrap();
        let loaded = store.load(&rec.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, rec.id);
        assert_eq!(loaded.data, rec.data);
        assert_eq!(loaded.expiry_date.unix_timestamp(), rec.expiry_date.unix_timestamp());
    }

    #[tokio::test]
    async fn save_overwrites_existing_row() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_sessions(&tmp).await;

        let mut rec = record(TimeDuration::hours(1));
        store.create(&mut rec).await.unwrap();
        rec.data.insert("_flashes".into(), serde_json::json!([]));
        store.save(&rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert!(loaded.data.contains_key("_flashes"));
    }

    #[tokio::test]
    async fn deleted_session_is_gone() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_sessions(&tmp).await;

        let mut rec = record(TimeDuration::hours(1));
        store.create(&mut rec).await.unwrap();
        store.delete(&rec.id).await.unwrap();

        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_hidden_then_purged() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_sessions(&tmp).await;

        let mut stale = record(TimeDuration::hours(-1));
        let mut live = record(TimeDuration::hours(1));
        store.create(&mut stale).await.unwrap();
        store.create(&mut live).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.load(&live.id).await.unwrap().is_some());
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unavailable_database_falls_back_to_memory() {
        let backend = SessionBackend::for_credentials(&CredentialStore::unavailable());
        assert!(!backend.is_persistent());

        let mut rec = record(TimeDuration::hours(1));
        backend.create(&mut rec).await.unwrap();
        assert!(backend.load(&rec.id).await.unwrap().is_some());

        // Returns at once for the memory store.
        backend.run_expired_deletion(Duration::from_millis(1)).await;
    }
}
