//! Credential store: the `users` table behind a sea-orm connection pool.
//!
//! The same pool also carries the `tower_sessions` table (see [`sessions`]).
//!
//! The pool is opened once at startup. If the database cannot be reached the
//! server still starts; the store is then *unavailable* and every operation
//! returns [`AuthError::Unavailable`], which the auth layer logs and swallows.

pub mod session;
pub mod sessions;
pub mod user;

use crate::error::AuthError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, QueryFilter, Schema, Set, SqlErr,
};
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct CredentialStore {
    db: Option<DatabaseConnection>,
}

impl CredentialStore {
    /// Open a pool for `database_url` and create the `users` table if missing.
    ///
    /// Never fails: a connection or schema error is logged and yields an
    /// unavailable store.
    pub async fn connect(database_url: &str) -> Self {
        let mut opts = ConnectOptions::new(database_url.to_owned());
        opts.sqlx_logging(false);

        let store = match Database::connect(opts).await {
            Ok(db) => Self::from_connection(db),
            Err(e) => {
                error!("Database connection failed: {}", e);
                return Self::unavailable();
            }
        };

        if let Err(e) = store.init_schema().await {
            error!("Failed to create tables: {}", e);
        }
        store
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db: Some(db) }
    }

    pub fn unavailable() -> Self {
        Self { db: None }
    }

    pub fn is_available(&self) -> bool {
        self.db.is_some()
    }

    /// The live pool, if any. Shared with the session store.
    pub fn connection(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }

    fn db(&self) -> Result<&DatabaseConnection, AuthError> {
        self.db.as_ref().ok_or(AuthError::Unavailable)
    }

    /// `CREATE TABLE IF NOT EXISTS` for `users` and `tower_sessions`.
    pub async fn init_schema(&self) -> Result<(), AuthError> {
        let db = self.db()?;
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        let mut users = schema.create_table_from_entity(user::Entity);
        users.if_not_exists();
        db.execute(backend.build(&users)).await?;

        let mut sessions = schema.create_table_from_entity(session::Entity);
        sessions.if_not_exists();
        db.execute(backend.build(&sessions)).await?;

        info!("users and tower_sessions tables ready ({:?})", backend);
        Ok(())
    }

    /// Insert a new user with an already-hashed password.
    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<user::Model, AuthError> {
        let db = self.db()?;
        let model = user::ActiveModel {
            name: Set(name.to_owned()),
            email: Set(email.to_owned()),
            password: Set(password_hash),
            ..Default::default()
        };

        model.insert(db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AuthError::DuplicateEmail(email.to_owned()),
            _ => AuthError::Database(e),
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AuthError> {
        let db = self.db()?;
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sqlite_store(dir: &tempfile::TempDir) -> CredentialStore {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("users.db").display());
        let store = CredentialStore::connect(&url).await;
        assert!(store.is_available());
        store
    }

    #[tokio::test]
    async fn insert_then_find() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(&tmp).await;

        let created = store
            .insert_user("Ada", "ada@example.com", "hash".into())
            .await
            .unwrap();
        let found = store.find_by_email("ada@example.com").await.unwrap().unwrap();

        assert_eq!(created, found);
        assert_eq!(found.name, "Ada");
        assert!(store.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(&tmp).await;

        store.insert_user("Ada", "ada@example.com", "h1".into()).await.unwrap();
        let err = store
            .insert_user("Imposter", "ada@example.com", "h2".into())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::DuplicateEmail(ref e) if e == "ada@example.com"));
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(&tmp).await;
        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn unavailable_store_refuses_everything() {
        let store = CredentialStore::unavailable();
        assert!(store.connection().is_none());
        assert!(matches!(
            store.find_by_email("a@b.c").await,
            Err(AuthError::Unavailable)
        ));
        assert!(matches!(
            store.insert_user("a", "a@b.c", "h".into()).await,
            Err(AuthError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn bad_url_yields_unavailable_store() {
        let store = CredentialStore::connect("not-a-database-url").await;
        assert!(!store.is_available());
    }
}
