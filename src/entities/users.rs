use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    pub firstname: String,

    pub lastname: String,

    pub phone: String,

    /// "user" or "admin"
    pub role: String,

    pub registered_on: String,

    pub current_login: Option<String>,

    pub last_login: Option<String>,

    /// 32-byte symmetric key for this user's draws. Never serialized to clients.
    #[sea_orm(column_type = "Blob")]
    pub draw_key: Vec<u8>,

    /// Base32 TOTP seed. Generated once at registration, never rotated.
    pub totp_seed: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::draws::Entity")]
    Draws,
}

impl Related<super::draws::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Draws.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
