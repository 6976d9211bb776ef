use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

use crate::config::SecurityConfig;
use crate::crypto;

#[derive(DeriveMigrationName)]
pub struct Migration;

const ADMIN_EMAIL: &str = "admin@example.com";

/// Bootstrap password, overridable via LOTTARR_ADMIN_PASSWORD. Must be
/// changed in any real deployment.
const DEFAULT_ADMIN_PASSWORD: &str = "Admin1!";

/// Bootstrap TOTP seed (base32), overridable via LOTTARR_ADMIN_TOTP_SEED.
/// Deterministic so a fresh install can enrol an authenticator before the
/// first login; must be replaced in any real deployment.
const DEFAULT_ADMIN_TOTP_SEED: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

fn hash_admin_password() -> Result<String, DbErr> {
    let password = std::env::var("LOTTARR_ADMIN_PASSWORD")
        .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

    crypto::hash_password(&password, &SecurityConfig::default())
        .map_err(|e| DbErr::Migration(format!("failed to hash seeded admin password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Draws)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SecurityEvents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the administrator account. Secrets come from the environment
        // where provided; the fallbacks are flagged as bootstrap-only.
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_admin_password()?;
        let totp_seed = std::env::var("LOTTARR_ADMIN_TOTP_SEED")
            .unwrap_or_else(|_| DEFAULT_ADMIN_TOTP_SEED.to_string());
        let draw_key = crypto::generate_draw_key().to_vec();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Email,
                crate::entities::users::Column::PasswordHash,
                crate::entities::users::Column::Firstname,
                crate::entities::users::Column::Lastname,
                crate::entities::users::Column::Phone,
                crate::entities::users::Column::Role,
                crate::entities::users::Column::RegisteredOn,
                crate::entities::users::Column::DrawKey,
                crate::entities::users::Column::TotpSeed,
            ])
            .values_panic([
                ADMIN_EMAIL.into(),
                password_hash.into(),
                "Alice".into(),
                "Jones".into(),
                "0191-123-4567".into(),
                "admin".into(),
                now.into(),
                draw_key.into(),
                totp_seed.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Draws).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SecurityEvents).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
