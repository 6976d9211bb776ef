use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::crypto::DrawKey;
use crate::entities::{draws, security_events};

pub mod migrator;
pub mod repositories;

pub use repositories::draw::{DrawOutcome, DrawRepository};
pub use repositories::security_events::SecurityEventRepository;
pub use repositories::user::{AuthParts, NewUser, Role, User, UserRepository};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn draw_repo(&self) -> DrawRepository {
        DrawRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn security_event_repo(&self) -> SecurityEventRepository {
        SecurityEventRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn get_auth_parts(&self, email: &str) -> Result<Option<AuthParts>> {
        self.user_repo().get_auth_parts(email).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.user_repo().create(new_user).await
    }

    pub async fn record_login(&self, user_id: i32) -> Result<User> {
        self.user_repo().record_login(user_id).await
    }

    pub async fn user_draw_key(&self, user_id: i32) -> Result<DrawKey> {
        self.user_repo().draw_key(user_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    // ========== Draw Repository Methods ==========

    pub async fn insert_draw(&self, owner_id: i32, ciphertext: String) -> Result<draws::Model> {
        self.draw_repo().insert(owner_id, ciphertext).await
    }

    pub async fn playable_draws(&self, owner_id: i32) -> Result<Vec<draws::Model>> {
        self.draw_repo().playable_for(owner_id).await
    }

    pub async fn played_draws(&self, owner_id: i32) -> Result<Vec<draws::Model>> {
        self.draw_repo().played_for(owner_id).await
    }

    pub async fn clear_played_draws(&self, owner_id: i32) -> Result<u64> {
        self.draw_repo().clear_played(owner_id).await
    }

    pub async fn unplayed_master_draw(&self) -> Result<Option<draws::Model>> {
        self.draw_repo().unplayed_master().await
    }

    pub async fn unplayed_user_draws(&self) -> Result<Vec<draws::Model>> {
        self.draw_repo().unplayed_user_draws().await
    }

    pub async fn replace_master_draw(
        &self,
        admin_id: i32,
        ciphertext: String,
    ) -> Result<draws::Model> {
        self.draw_repo().replace_master(admin_id, ciphertext).await
    }

    pub async fn apply_round(
        &self,
        master_id: i32,
        round: i32,
        outcomes: &[DrawOutcome],
    ) -> Result<()> {
        self.draw_repo()
            .apply_round(master_id, round, outcomes)
            .await
    }

    // ========== Security Event Methods ==========

    pub async fn add_security_event(
        &self,
        message: &str,
        actor_id: Option<i32>,
        actor_email: Option<&str>,
        role: Option<&str>,
        origin: &str,
    ) -> Result<()> {
        self.security_event_repo()
            .add(message, actor_id, actor_email, role, origin)
            .await
    }

    pub async fn recent_security_events(&self, limit: u64) -> Result<Vec<security_events::Model>> {
        self.security_event_repo().recent(limit).await
    }
}
