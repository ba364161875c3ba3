use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{comment, priority, status, user, work_item};

pub async fn user_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn user_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Uuid)
        .filter(user::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn status_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    status::Entity::find()
        .select_only()
        .column(status::Column::Id)
        .filter(status::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn status_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    status::Entity::find()
        .select_only()
        .column(status::Column::Uuid)
        .filter(status::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn priority_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    priority::Entity::find()
        .select_only()
        .column(priority::Column::Id)
        .filter(priority::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn priority_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    priority::Entity::find()
        .select_only()
        .column(priority::Column::Uuid)
        .filter(priority::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn work_item_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    work_item::Entity::find()
        .select_only()
        .column(work_item::Column::Id)
        .filter(work_item::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn work_item_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    work_item::Entity::find()
        .select_only()
        .column(work_item::Column::Uuid)
        .filter(work_item::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn comment_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    comment::Entity::find()
        .select_only()
        .column(comment::Column::Id)
        .filter(comment::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}
