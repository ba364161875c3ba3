use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::comment,
    events::{EVENT_CREATED, EVENT_DELETED, SUBJECT_COMMENT},
    models::{activity_log::ActivityLog, ids, user::User, work_item::WorkItem},
};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Work item not found")]
    WorkItemNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Comment {
    pub id: Uuid,
    pub work_item_id: Uuid,
    pub content: String,
    pub author: CommentAuthor,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

impl Comment {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: comment::Model,
    ) -> Result<Self, DbErr> {
        let work_item_id = ids::work_item_uuid_by_id(db, model.work_item_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Work item not found".to_string()))?;
        let author = User::find_by_row_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            work_item_id,
            content: model.content,
            author: CommentAuthor {
                id: author.id,
                name: author.name,
                email: author.email,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    /// Comments for one work item, newest first.
    pub async fn find_for_item<C: ConnectionTrait>(
        db: &C,
        work_item_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let row_id = match ids::work_item_id_by_uuid(db, work_item_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = comment::Entity::find()
            .filter(comment::Column::WorkItemId.eq(row_id))
            .order_by_desc(comment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut comments = Vec::with_capacity(models.len());
        for model in models {
            comments.push(Self::from_model(db, model).await?);
        }
        Ok(comments)
    }

    /// Create a comment on a work item and log it with the parent's slug and
    /// name captured at creation time.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        item: &WorkItem,
        content: &str,
        comment_id: Uuid,
        acting: &User,
    ) -> Result<Self, CommentError> {
        let item_row_id = ids::work_item_id_by_uuid(db, item.id)
            .await?
            .ok_or(CommentError::WorkItemNotFound)?;
        let causer_row_id = acting.row_id(db).await?;

        let now = Utc::now();
        let active = comment::ActiveModel {
            uuid: Set(comment_id),
            work_item_id: Set(item_row_id),
            user_id: Set(causer_row_id),
            content: Set(content.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        ActivityLog::record(
            db,
            causer_row_id,
            SUBJECT_COMMENT,
            comment_id,
            EVENT_CREATED,
            Value::Object(Map::new()),
            commentable_snapshot(content, item),
        )
        .await?;

        Ok(Self::from_model(db, model).await?)
    }

    /// Hard delete; the activity entry keeps the old content and the parent
    /// snapshot so the log stays readable after the row is gone.
    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        acting: &User,
    ) -> Result<u64, CommentError> {
        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(id))
            .one(db)
            .await?;

        let Some(record) = record else {
            return Ok(0);
        };

        let item_uuid = ids::work_item_uuid_by_id(db, record.work_item_id)
            .await?
            .ok_or(CommentError::WorkItemNotFound)?;
        // Soft-deleted parents still resolve; the log snapshot needs them.
        let item = WorkItem::find_by_id_including_deleted(db, item_uuid)
            .await?
            .ok_or(CommentError::WorkItemNotFound)?;
        let causer_row_id = acting.row_id(db).await?;
        let content = record.content.clone();

        let result = comment::Entity::delete_many()
            .filter(comment::Column::Uuid.eq(id))
            .exec(db)
            .await?;

        if result.rows_affected > 0 {
            ActivityLog::record(
                db,
                causer_row_id,
                SUBJECT_COMMENT,
                id,
                EVENT_DELETED,
                commentable_snapshot(&content, &item),
                Value::Object(Map::new()),
            )
            .await?;
        }

        Ok(result.rows_affected)
    }
}

fn commentable_snapshot(content: &str, item: &WorkItem) -> Value {
    json!({
        "content": content,
        "commentable.id": item.id,
        "commentable.slug": item.slug,
        "commentable.name": item.name,
    })
}
