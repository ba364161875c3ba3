use sea_orm::entity::prelude::*;

use crate::types::WorkItemKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "work_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub kind: WorkItemKind,
    pub parent_id: Option<i64>,
    pub slug: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTimeUtc,
    pub due_date: DateTimeUtc,
    pub status_id: i64,
    pub priority_id: i64,
    pub is_private: bool,
    pub created_by: i64,
    pub updated_by: i64,
    pub supervisor_id: i64,
    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
