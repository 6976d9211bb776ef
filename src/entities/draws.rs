use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "draws")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// base64(nonce || ciphertext) of the six space-separated numbers,
    /// encrypted under the owner's draw key. Plaintext never lands here.
    pub numbers: String,

    /// Terminal once true; a played draw is only ever deleted.
    pub been_played: bool,

    pub matches_master: bool,

    /// Exactly one unplayed master draw exists at a time.
    pub master_draw: bool,

    pub lottery_round: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
