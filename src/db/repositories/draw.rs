use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::draws;

/// Outcome of comparing one user draw against the master selection, ready
/// to be applied when the round resolves.
pub struct DrawOutcome {
    pub draw_id: i32,
    pub matches_master: bool,
}

pub struct DrawRepository {
    conn: DatabaseConnection,
}

impl DrawRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a freshly submitted draw. The `numbers` argument is already
    /// ciphertext; plaintext never reaches this layer.
    pub async fn insert(&self, owner_id: i32, numbers_ciphertext: String) -> Result<draws::Model> {
        let active = draws::ActiveModel {
            user_id: Set(owner_id),
            numbers: Set(numbers_ciphertext),
            been_played: Set(false),
            matches_master: Set(false),
            master_draw: Set(false),
            lottery_round: Set(0),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert draw")
    }

    /// Unplayed draws owned by the requester.
    pub async fn playable_for(&self, owner_id: i32) -> Result<Vec<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::UserId.eq(owner_id))
            .filter(draws::Column::BeenPlayed.eq(false))
            .filter(draws::Column::MasterDraw.eq(false))
            .order_by_asc(draws::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query playable draws")
    }

    /// Played draws owned by the requester.
    pub async fn played_for(&self, owner_id: i32) -> Result<Vec<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::UserId.eq(owner_id))
            .filter(draws::Column::BeenPlayed.eq(true))
            .filter(draws::Column::MasterDraw.eq(false))
            .order_by_asc(draws::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query played draws")
    }

    /// Delete the owner's played, non-master draws. The owner filter is part
    /// of the delete statement itself, so the scope cannot widen however the
    /// call is composed. Deleting nothing is a normal outcome.
    pub async fn clear_played(&self, owner_id: i32) -> Result<u64> {
        let result = draws::Entity::delete_many()
            .filter(draws::Column::UserId.eq(owner_id))
            .filter(draws::Column::BeenPlayed.eq(true))
            .filter(draws::Column::MasterDraw.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to delete played draws")?;

        Ok(result.rows_affected)
    }

    /// The master draw for the round currently being collected, if any.
    pub async fn unplayed_master(&self) -> Result<Option<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::MasterDraw.eq(true))
            .filter(draws::Column::BeenPlayed.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query master draw")
    }

    /// All unplayed user draws, across owners. Used by round resolution.
    pub async fn unplayed_user_draws(&self) -> Result<Vec<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::BeenPlayed.eq(false))
            .filter(draws::Column::MasterDraw.eq(false))
            .order_by_asc(draws::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query unplayed draws")
    }

    /// Replace the active master draw: any unplayed master is discarded and
    /// the new one inserted with the next round number, in one transaction,
    /// so exactly one master is ever active.
    pub async fn replace_master(
        &self,
        admin_id: i32,
        numbers_ciphertext: String,
    ) -> Result<draws::Model> {
        let txn = self.conn.begin().await?;

        draws::Entity::delete_many()
            .filter(draws::Column::MasterDraw.eq(true))
            .filter(draws::Column::BeenPlayed.eq(false))
            .exec(&txn)
            .await
            .context("Failed to discard previous master draw")?;

        let latest_round = draws::Entity::find()
            .filter(draws::Column::MasterDraw.eq(true))
            .order_by_desc(draws::Column::LotteryRound)
            .one(&txn)
            .await
            .context("Failed to query latest master round")?
            .map_or(0, |m| m.lottery_round);

        let active = draws::ActiveModel {
            user_id: Set(admin_id),
            numbers: Set(numbers_ciphertext),
            been_played: Set(false),
            matches_master: Set(false),
            master_draw: Set(true),
            lottery_round: Set(latest_round + 1),
            ..Default::default()
        };

        let model = active
            .insert(&txn)
            .await
            .context("Failed to insert master draw")?;

        txn.commit().await?;
        Ok(model)
    }

    /// Apply a resolved round: every compared draw becomes played with its
    /// match flag and the round number, and the master is marked played.
    /// All-or-nothing; a crash mid-way leaves the round unresolved.
    pub async fn apply_round(
        &self,
        master_id: i32,
        round: i32,
        outcomes: &[DrawOutcome],
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        for outcome in outcomes {
            let active = draws::ActiveModel {
                id: Set(outcome.draw_id),
                been_played: Set(true),
                matches_master: Set(outcome.matches_master),
                lottery_round: Set(round),
                ..Default::default()
            };
            active
                .update(&txn)
                .await
                .with_context(|| format!("Failed to resolve draw {}", outcome.draw_id))?;
        }

        let master = draws::ActiveModel {
            id: Set(master_id),
            been_played: Set(true),
            ..Default::default()
        };
        master
            .update(&txn)
            .await
            .context("Failed to close master draw")?;

        txn.commit().await?;
        Ok(())
    }
}
