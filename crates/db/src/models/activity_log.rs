use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::activity_log,
    models::{Paginated, user::User},
};

/// One stored change-log row, with the causer resolved. The formatter in the
/// services crate turns this into display lines; this model only appends and
/// reads.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub causer: Causer,
    pub subject_type: String,
    pub subject_uuid: Uuid,
    pub event: String,
    #[ts(type = "Record<string, unknown>")]
    pub old_values: Value,
    #[ts(type = "Record<string, unknown>")]
    pub new_values: Value,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Causer {
    pub name: String,
    pub email: Option<String>,
}

pub struct ActivityLog;

impl ActivityLog {
    /// Append one entry. Never updates existing rows.
    pub async fn record<C: ConnectionTrait>(
        db: &C,
        causer_row_id: i64,
        subject_type: &str,
        subject_uuid: Uuid,
        event: &str,
        old_values: Value,
        new_values: Value,
    ) -> Result<(), DbErr> {
        let active = activity_log::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            causer_id: Set(causer_row_id),
            subject_type: Set(subject_type.to_string()),
            subject_uuid: Set(subject_uuid),
            event: Set(event.to_string()),
            old_values: Set(old_values),
            new_values: Set(new_values),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        active.insert(db).await?;
        Ok(())
    }

    /// Entries inside [start, end], newest first.
    pub async fn find_range<C: ConnectionTrait>(
        db: &C,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page: u64,
        per_page: u64,
    ) -> Result<Paginated<ActivityEntry>, DbErr> {
        let paginator = activity_log::Entity::find()
            .filter(activity_log::Column::CreatedAt.gte(start))
            .filter(activity_log::Column::CreatedAt.lte(end))
            .order_by_desc(activity_log::Column::CreatedAt)
            .paginate(db, per_page.max(1));

        let totals = paginator.num_items_and_pages().await?;
        let models = paginator.fetch_page(page.max(1) - 1).await?;

        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(Self::entry_from_model(db, model).await?);
        }

        Ok(Paginated {
            items: entries,
            page: page.max(1),
            per_page: per_page.max(1),
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    pub async fn find_for_subject<C: ConnectionTrait>(
        db: &C,
        subject_uuid: Uuid,
    ) -> Result<Vec<ActivityEntry>, DbErr> {
        let models = activity_log::Entity::find()
            .filter(activity_log::Column::SubjectUuid.eq(subject_uuid))
            .order_by_desc(activity_log::Column::CreatedAt)
            .all(db)
            .await?;

        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(Self::entry_from_model(db, model).await?);
        }
        Ok(entries)
    }

    async fn entry_from_model<C: ConnectionTrait>(
        db: &C,
        model: activity_log::Model,
    ) -> Result<ActivityEntry, DbErr> {
        let causer = User::find_by_row_id(db, model.causer_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(ActivityEntry {
            id: model.uuid,
            causer: Causer {
                name: causer.name,
                email: causer.email,
            },
            subject_type: model.subject_type,
            subject_uuid: model.subject_uuid,
            event: model.event,
            old_values: model.old_values,
            new_values: model.new_values,
            created_at: model.created_at,
        })
    }
}
