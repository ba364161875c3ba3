use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::priority;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Priority {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl Priority {
    fn from_model(model: priority::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            color: model.color,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = priority::Entity::find()
            .order_by_asc(priority::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = priority::Entity::find()
            .filter(priority::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }
}
