use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};

use crate::entities::security_events;

pub struct SecurityEventRepository {
    conn: DatabaseConnection,
}

impl SecurityEventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one audit row. Rows are never updated or deleted.
    pub async fn add(
        &self,
        message: &str,
        actor_id: Option<i32>,
        actor_email: Option<&str>,
        role: Option<&str>,
        origin: &str,
    ) -> Result<()> {
        let active = security_events::ActiveModel {
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            category: Set("SECURITY".to_string()),
            message: Set(message.to_string()),
            actor_id: Set(actor_id),
            actor_email: Set(actor_email.map(str::to_string)),
            role: Set(role.map(str::to_string)),
            origin: Set(origin.to_string()),
            ..Default::default()
        };

        security_events::Entity::insert(active)
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Most recent events first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<security_events::Model>> {
        let events = security_events::Entity::find()
            .order_by_desc(security_events::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(events)
    }
}
