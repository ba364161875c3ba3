use std::str::FromStr;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::status, types::StatusName};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Status {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl Status {
    fn from_model(model: status::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            color: model.color,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = status::Entity::find()
            .order_by_asc(status::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = status::Entity::find()
            .filter(status::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: StatusName,
    ) -> Result<Option<Self>, DbErr> {
        let record = status::Entity::find()
            .filter(status::Column::Name.eq(name.to_string()))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// The workflow name this row carries, if it is one of the seeded five.
    pub fn workflow_name(&self) -> Option<StatusName> {
        StatusName::from_str(&self.name).ok()
    }
}
