use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task;

use crate::crypto::{self, DrawKey};
use crate::entities::users;

/// Fixed role set. Anything else in the role column is data corruption,
/// surfaced as an error rather than a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// User data returned from the repository. Carries no password hash, TOTP
/// seed, or draw key; those stay behind dedicated accessors.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub role: Role,
    pub registered_on: String,
    pub current_login: Option<String>,
    pub last_login: Option<String>,
}

impl TryFrom<users::Model> for User {
    type Error = anyhow::Error;

    fn try_from(model: users::Model) -> Result<Self> {
        let role = Role::parse(&model.role)
            .ok_or_else(|| anyhow::anyhow!("unrecognized role for user {}", model.id))?;

        Ok(Self {
            id: model.id,
            email: model.email,
            firstname: model.firstname,
            lastname: model.lastname,
            phone: model.phone,
            role,
            registered_on: model.registered_on,
            current_login: model.current_login,
            last_login: model.last_login,
        })
    }
}

/// Credential material needed by the login verification step, fetched in a
/// single query so the flow does not hit the table three times.
pub struct AuthParts {
    pub user: User,
    pub password_hash: String,
    pub totp_seed: String,
}

/// Input for user creation. The caller supplies already-hashed and
/// already-generated secret material.
pub struct NewUser {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub totp_seed: String,
    pub draw_key: Vec<u8>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        user.map(User::try_from).transpose()
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(User::try_from).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    /// Fetch the credential material for a login attempt. `None` means the
    /// email is unknown; callers fold that into the generic failure path.
    pub async fn get_auth_parts(&self, email: &str) -> Result<Option<AuthParts>> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for verification")?;

        let Some(model) = model else {
            return Ok(None);
        };

        let password_hash = model.password_hash.clone();
        let totp_seed = model.totp_seed.clone();

        Ok(Some(AuthParts {
            user: User::try_from(model)?,
            password_hash,
            totp_seed,
        }))
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            firstname: Set(new_user.firstname),
            lastname: Set(new_user.lastname),
            phone: Set(new_user.phone),
            role: Set(new_user.role.as_str().to_string()),
            registered_on: Set(now),
            current_login: Set(None),
            last_login: Set(None),
            draw_key: Set(new_user.draw_key),
            totp_seed: Set(new_user.totp_seed),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        User::try_from(model)
    }

    /// Shift the login timestamps on a successful login:
    /// last_login <- current_login, current_login <- now. Single-row update.
    pub async fn record_login(&self, user_id: i32) -> Result<User> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for login update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let now = chrono::Utc::now().to_rfc3339();
        let previous = model.current_login.clone();

        let mut active: users::ActiveModel = model.into();
        active.last_login = Set(previous);
        active.current_login = Set(Some(now));
        let updated = active.update(&self.conn).await?;

        User::try_from(updated)
    }

    /// Verify a password against the stored hash.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, password_hash: String, password: String) -> Result<bool> {
        let is_valid =
            task::spawn_blocking(move || crypto::verify_password(&password, &password_hash))
                .await
                .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// The owner's draw key, rebuilt from its persisted BLOB. Never leaves
    /// the server side of the call chain.
    pub async fn draw_key(&self, user_id: i32) -> Result<DrawKey> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for draw key")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        DrawKey::from_bytes(&model.draw_key)
            .map_err(|_| anyhow::anyhow!("stored draw key for user {user_id} is malformed"))
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let models = users::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        models.into_iter().map(User::try_from).collect()
    }
}
