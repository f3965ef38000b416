//! Account entity - one row per guest, local, or OAuth identity.
//!
//! Beyond the column-level unique `email`, the table carries a composite
//! unique index on `(provider, external_id)`. The derive cannot express it;
//! [`DatabaseAccountStore::create_schema`](crate::store::DatabaseAccountStore::create_schema)
//! creates both.

use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Name of the unique index over `(provider, external_id)`.
pub const PROVIDER_IDENTITY_INDEX: &str = "idx_account_provider_external_id";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub email: Option<String>,
    pub password_hash: Option<String>,
    /// `local`, `google`, `yandex`, or NULL for guests
    pub provider: Option<String>,
    pub external_id: Option<String>,
    /// `user`, `admin` or `guest`
    pub role: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    /// Written by the player; read here only to enrich login responses.
    pub last_track_id: Option<String>,
    pub last_position: f64,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
