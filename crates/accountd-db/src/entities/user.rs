//! User entity for registration, login, and account management

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Numeric user id (primary key, assigned by the store)
    #[sea_orm(primary_key)]
    pub id: i64,

    /// User email (unique)
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string); plaintext is never stored
    pub password_hash: String,

    /// Display name (optional)
    pub name: Option<String>,

    /// When the account was created
    pub created_at: ChronoDateTimeUtc,

    /// When the record was last updated
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
