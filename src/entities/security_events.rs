use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only audit record. Rows are written by `SecurityAudit` and only
/// ever read back for the admin log view.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "security_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub created_at: String,

    pub category: String,

    pub message: String,

    pub actor_id: Option<i32>,

    pub actor_email: Option<String>,

    pub role: Option<String>,

    pub origin: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
