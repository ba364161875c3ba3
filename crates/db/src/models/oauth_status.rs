use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryOrder, Set};

use crate::entities::oauth_status;

/// Singleton toggle gating external-identity login.
pub struct OAuthStatus;

impl OAuthStatus {
    pub async fn is_enabled<C: ConnectionTrait>(db: &C) -> Result<bool, DbErr> {
        let record = oauth_status::Entity::find()
            .order_by_asc(oauth_status::Column::Id)
            .one(db)
            .await?;
        Ok(record.map(|row| row.enabled).unwrap_or(false))
    }

    pub async fn toggle<C: ConnectionTrait>(db: &C, enabled: bool) -> Result<bool, DbErr> {
        let record = oauth_status::Entity::find()
            .order_by_asc(oauth_status::Column::Id)
            .one(db)
            .await?;

        match record {
            Some(record) => {
                let mut active: oauth_status::ActiveModel = record.into();
                active.enabled = Set(enabled);
                active.updated_at = Set(Utc::now());
                active.update(db).await?;
            }
            None => {
                let active = oauth_status::ActiveModel {
                    enabled: Set(enabled),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };
                active.insert(db).await?;
            }
        }

        Ok(enabled)
    }
}
