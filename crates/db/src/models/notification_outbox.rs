use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{entities::notification_outbox, types::NotificationKind};

/// Transactional outbox for email notifications. Rows are written inside the
/// mutating transaction; the dispatcher drains them after commit, so a
/// rolled-back mutation never leaks a notification.
pub struct NotificationOutbox;

impl NotificationOutbox {
    pub async fn enqueue<C: ConnectionTrait>(
        db: &C,
        kind: NotificationKind,
        recipient_row_id: i64,
        recipient_email: &str,
        work_item_row_id: i64,
        payload: Value,
    ) -> Result<(), DbErr> {
        let active = notification_outbox::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            kind: Set(kind),
            recipient_id: Set(recipient_row_id),
            recipient_email: Set(recipient_email.to_string()),
            work_item_id: Set(work_item_row_id),
            payload: Set(payload),
            created_at: Set(Utc::now()),
            published_at: Set(None),
            attempts: Set(0),
            last_error: Set(None),
            ..Default::default()
        };

        active.insert(db).await?;
        Ok(())
    }

    pub async fn fetch_unpublished<C: ConnectionTrait>(
        db: &C,
        limit: u64,
    ) -> Result<Vec<notification_outbox::Model>, DbErr> {
        notification_outbox::Entity::find()
            .filter(notification_outbox::Column::PublishedAt.is_null())
            .order_by_asc(notification_outbox::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn mark_published<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
        let record = notification_outbox::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Notification outbox record not found".to_string(),
            ))?;

        let mut active: notification_outbox::ActiveModel = record.into();
        active.published_at = Set(Some(Utc::now()));
        active.update(db).await?;
        Ok(())
    }

    pub async fn mark_failed<C: ConnectionTrait>(
        db: &C,
        id: i64,
        error: &str,
    ) -> Result<(), DbErr> {
        let record = notification_outbox::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Notification outbox record not found".to_string(),
            ))?;

        let attempts = record.attempts + 1;
        let mut active: notification_outbox::ActiveModel = record.into();
        active.attempts = Set(attempts);
        active.last_error = Set(Some(error.to_string()));
        active.update(db).await?;
        Ok(())
    }
}
