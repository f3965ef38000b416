//! SeaORM-backed account store.

use super::{AccountStore, StoreResult};
use crate::account::{Account, AuthProvider, IdentityUpdate, LastTrack, NewAccount, NewOAuthAccount, Role};
use crate::entity::account;
use crate::error::StoreError;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, Schema, sea_query::Index,
};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
pub struct DatabaseAccountStore {
    db: Arc<DatabaseConnection>,
}

impl DatabaseAccountStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates the `account` table and its unique index on
    /// `(provider, external_id)` when they do not exist yet.
    pub async fn create_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(account::Entity);
        table.if_not_exists();
        self.db.execute(backend.build(&table)).await?;

        let index = Index::create()
            .name(account::PROVIDER_IDENTITY_INDEX)
            .table(account::Entity)
            .col(account::Column::Provider)
            .col(account::Column::ExternalId)
            .unique()
            .if_not_exists()
            .to_owned();
        self.db.execute(backend.build(&index)).await?;
        Ok(())
    }

    async fn find_model(&self, id: i64) -> StoreResult<account::Model> {
        account::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, model: account::ActiveModel) -> StoreResult<Account> {
        let inserted = model.insert(self.db.as_ref()).await?;
        Account::try_from(inserted)
    }
}

impl TryFrom<account::Model> for Account {
    type Error = StoreError;

    fn try_from(model: account::Model) -> Result<Self, Self::Error> {
        let provider = model
            .provider
            .as_deref()
            .map(str::parse::<AuthProvider>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("account {}: {e}", model.id)))?;

        Ok(Account {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            provider,
            external_id: model.external_id,
            role: Role::from(model.role.as_str()),
            name: model.name,
            avatar_url: model.avatar_url,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        })
    }
}

#[async_trait]
impl AccountStore for DatabaseAccountStore {
    #[tracing::instrument(skip(self, new), fields(role = %new.role))]
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        self.insert(account::ActiveModel {
            id: NotSet,
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            provider: Set(new.provider.map(|p| p.as_str().to_string())),
            external_id: Set(None),
            role: Set(new.role.as_str().to_string()),
            name: Set(None),
            avatar_url: Set(None),
            last_track_id: Set(None),
            last_position: Set(0.0),
            last_login_at: Set(None),
            created_at: Set(OffsetDateTime::now_utc()),
        })
        .await
    }

    #[tracing::instrument(skip(self, new), fields(provider = %new.provider))]
    async fn create_oauth_account(&self, new: NewOAuthAccount) -> StoreResult<Account> {
        self.insert(account::ActiveModel {
            id: NotSet,
            email: Set(Some(new.email)),
            password_hash: Set(None),
            provider: Set(Some(new.provider.as_str().to_string())),
            external_id: Set(Some(new.external_id)),
            role: Set(Role::User.as_str().to_string()),
            name: Set(new.name),
            avatar_url: Set(None),
            last_track_id: Set(None),
            last_position: Set(0.0),
            last_login_at: Set(None),
            created_at: Set(OffsetDateTime::now_utc()),
        })
        .await
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Account> {
        account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await?
            .ok_or(StoreError::NotFound)
            .and_then(Account::try_from)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Account> {
        self.find_model(id).await.and_then(Account::try_from)
    }

    async fn get_by_provider_and_external_id(
        &self,
        provider: AuthProvider,
        external_id: &str,
    ) -> StoreResult<Account> {
        account::Entity::find()
            .filter(account::Column::Provider.eq(provider.as_str()))
            .filter(account::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?
            .ok_or(StoreError::NotFound)
            .and_then(Account::try_from)
    }

    #[tracing::instrument(skip(self, update))]
    async fn update_account(&self, id: i64, update: IdentityUpdate) -> StoreResult<()> {
        let mut active: account::ActiveModel = self.find_model(id).await?.into();
        active.email = Set(update.email);
        active.name = Set(update.name);
        active.avatar_url = Set(update.avatar_url);
        active.provider = Set(update.provider.map(|p| p.as_str().to_string()));
        active.external_id = Set(update.external_id);
        active.role = Set(update.role.as_str().to_string());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn update_last_login(&self, id: i64, at: OffsetDateTime) -> StoreResult<()> {
        let mut active: account::ActiveModel = self.find_model(id).await?.into();
        active.last_login_at = Set(Some(at));
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn link_provider(
        &self,
        id: i64,
        provider: AuthProvider,
        external_id: &str,
    ) -> StoreResult<()> {
        let mut active: account::ActiveModel = self.find_model(id).await?.into();
        active.provider = Set(Some(provider.as_str().to_string()));
        active.external_id = Set(Some(external_id.to_string()));
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn last_played_track(&self, id: i64) -> StoreResult<Option<LastTrack>> {
        let model = self.find_model(id).await?;
        Ok(model.last_track_id.map(|track_id| LastTrack {
            track_id,
            position_secs: model.last_position,
        }))
    }
}
