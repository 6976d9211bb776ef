//! Draw submission, viewing and round resolution.
//!
//! Draw numbers are encrypted under the owner's key before they are
//! persisted and only ever decrypted into [`DrawView`] values. The view is
//! a detached projection: it has no path back to the database, so decrypted
//! numbers cannot be flushed over the stored ciphertext.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::crypto::{self, CryptoError, DrawKey};
use crate::db::{DrawOutcome, Store, User};
use crate::entities::draws;

#[derive(Debug, Error)]
pub enum LotteryError {
    #[error("no master draw has been created for the next round")]
    NoMasterDraw,

    #[error("stored draw could not be decrypted")]
    Crypto(#[from] CryptoError),

    #[error("stored draw numbers are malformed")]
    CorruptDraw,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for LotteryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Read-only, detached projection of a draw with its numbers in the clear.
#[derive(Debug, Clone, Serialize)]
pub struct DrawView {
    pub id: i32,
    pub numbers: String,
    pub been_played: bool,
    pub matches_master: bool,
    pub lottery_round: i32,
}

impl DrawView {
    fn decrypt_from(model: &draws::Model, key: &DrawKey) -> Result<Self, LotteryError> {
        Ok(Self {
            id: model.id,
            numbers: crypto::decrypt(&model.numbers, key)?,
            been_played: model.been_played,
            matches_master: model.matches_master,
            lottery_round: model.lottery_round,
        })
    }
}

/// Summary of a resolved round.
#[derive(Debug, Serialize)]
pub struct RoundOutcome {
    pub round: i32,
    pub draws_played: usize,
    pub winners: usize,
}

#[derive(Clone)]
pub struct LotteryService {
    store: Store,
}

impl LotteryService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Encrypt and persist a submitted draw. Always starts unplayed, not
    /// matching, round 0.
    pub async fn submit(&self, owner: &User, numbers: [u32; 6]) -> Result<DrawView, LotteryError> {
        let plaintext = canonical_numbers(numbers);
        let key = self.store.user_draw_key(owner.id).await?;
        let ciphertext = crypto::encrypt(&plaintext, &key)?;

        let model = self.store.insert_draw(owner.id, ciphertext).await?;
        DrawView::decrypt_from(&model, &key)
    }

    /// The owner's unplayed draws, decrypted into detached views.
    pub async fn playable(&self, owner: &User) -> Result<Vec<DrawView>, LotteryError> {
        let key = self.store.user_draw_key(owner.id).await?;

        self.store
            .playable_draws(owner.id)
            .await?
            .iter()
            .map(|model| DrawView::decrypt_from(model, &key))
            .collect()
    }

    /// The owner's played draws. An empty list is the normal "no round
    /// resolved yet" state, not an error.
    pub async fn results(&self, owner: &User) -> Result<Vec<DrawView>, LotteryError> {
        let key = self.store.user_draw_key(owner.id).await?;

        self.store
            .played_draws(owner.id)
            .await?
            .iter()
            .map(|model| DrawView::decrypt_from(model, &key))
            .collect()
    }

    /// Delete the owner's played, non-master draws. Idempotent.
    pub async fn clear_played(&self, owner: &User) -> Result<u64, LotteryError> {
        Ok(self.store.clear_played_draws(owner.id).await?)
    }

    /// Author the master draw for the next round, replacing any unplayed
    /// master, encrypted under the authoring admin's key.
    pub async fn create_master(
        &self,
        admin: &User,
        numbers: [u32; 6],
    ) -> Result<DrawView, LotteryError> {
        let plaintext = canonical_numbers(numbers);
        let key = self.store.user_draw_key(admin.id).await?;
        let ciphertext = crypto::encrypt(&plaintext, &key)?;

        let model = self.store.replace_master_draw(admin.id, ciphertext).await?;
        DrawView::decrypt_from(&model, &key)
    }

    /// The master draw currently collecting entries, if one has been set.
    pub async fn current_master(&self) -> Result<Option<DrawView>, LotteryError> {
        let Some(model) = self.store.unplayed_master_draw().await? else {
            return Ok(None);
        };

        // decrypt under the key of whichever admin authored it
        let key = self.store.user_draw_key(model.user_id).await?;
        DrawView::decrypt_from(&model, &key).map(Some)
    }

    /// Resolve the round: compare every unplayed user draw against the
    /// master selection, mark them played with their match flag, stamp the
    /// round, and close the master — transactionally.
    pub async fn resolve_round(&self) -> Result<RoundOutcome, LotteryError> {
        let master = self
            .store
            .unplayed_master_draw()
            .await?
            .ok_or(LotteryError::NoMasterDraw)?;

        let master_key = self.store.user_draw_key(master.user_id).await?;
        let master_numbers = parse_numbers(&crypto::decrypt(&master.numbers, &master_key)?)?;

        let entries = self.store.unplayed_user_draws().await?;

        let mut keys: HashMap<i32, DrawKey> = HashMap::new();
        let mut outcomes = Vec::with_capacity(entries.len());
        let mut winners = 0;

        for entry in &entries {
            if !keys.contains_key(&entry.user_id) {
                keys.insert(entry.user_id, self.store.user_draw_key(entry.user_id).await?);
            }
            let key = &keys[&entry.user_id];

            let numbers = parse_numbers(&crypto::decrypt(&entry.numbers, key)?)?;
            let matches_master = numbers == master_numbers;
            if matches_master {
                winners += 1;
            }

            outcomes.push(DrawOutcome {
                draw_id: entry.id,
                matches_master,
            });
        }

        self.store
            .apply_round(master.id, master.lottery_round, &outcomes)
            .await?;

        Ok(RoundOutcome {
            round: master.lottery_round,
            draws_played: outcomes.len(),
            winners,
        })
    }
}

fn canonical_numbers(numbers: [u32; 6]) -> String {
    numbers.map(|n| n.to_string()).join(" ")
}

/// Parse a decrypted payload back into a sorted selection. Comparison is
/// order-insensitive; a payload that does not parse is corrupt data, not a
/// user error.
fn parse_numbers(plaintext: &str) -> Result<Vec<u32>, LotteryError> {
    let mut numbers = plaintext
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<Vec<u32>, _>>()
        .map_err(|_| LotteryError::CorruptDraw)?;

    numbers.sort_unstable();
    Ok(numbers)
}
