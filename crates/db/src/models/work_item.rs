use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{work_item, work_item_assignee, work_item_viewer},
    events::{
        EVENT_ASSIGNEE_ADDED, EVENT_ASSIGNEE_REMOVED, EVENT_CREATED, EVENT_DELETED,
        EVENT_UPDATED, EVENT_VIEWER_ADDED, EVENT_VIEWER_REMOVED, NotificationPayload,
    },
    models::{
        Paginated,
        activity_log::ActivityLog,
        ids,
        notification_outbox::NotificationOutbox,
        priority::Priority,
        status::Status,
        user::User,
    },
    types::{NotificationKind, StatusName, WorkItemKind},
};

#[derive(Debug, Error)]
pub enum WorkItemError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Work item not found")]
    NotFound,
    #[error("Parent work item not found")]
    ParentNotFound,
    #[error("Status not found")]
    StatusNotFound,
    #[error("Priority not found")]
    PriorityNotFound,
    #[error("Supervisor not found")]
    SupervisorNotFound,
    #[error("Assignee not found")]
    AssigneeNotFound,
    #[error("Viewer not found")]
    ViewerNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkItem {
    pub id: Uuid,
    pub kind: WorkItemKind,
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "Date")]
    pub start_date: DateTime<Utc>,
    #[ts(type = "Date")]
    pub due_date: DateTime<Utc>,
    pub status_id: Uuid,
    pub priority_id: Uuid,
    pub is_private: bool,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub supervisor_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// Validated input for create and edit; references are public ids.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateWorkItem {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "Date")]
    pub start_date: DateTime<Utc>,
    #[ts(type = "Date")]
    pub due_date: DateTime<Utc>,
    pub status_id: Uuid,
    pub priority_id: Uuid,
    pub supervisor_id: Uuid,
    pub is_private: bool,
    pub assignees: Vec<Uuid>,
    pub viewers: Vec<Uuid>,
}

/// Assignee and viewer membership of one item, as user public ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct Membership {
    pub assignees: Vec<Uuid>,
    pub viewers: Vec<Uuid>,
}

impl Membership {
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.assignees.contains(&user_id) || self.viewers.contains(&user_id)
    }
}

/// Symmetric-difference result of an edit's membership sync.
#[derive(Debug, Clone, Default)]
pub struct MembershipChanges {
    pub attached_assignees: Vec<Uuid>,
    pub detached_assignees: Vec<Uuid>,
    pub attached_viewers: Vec<Uuid>,
    pub detached_viewers: Vec<Uuid>,
}

impl WorkItem {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: work_item::Model,
    ) -> Result<Self, DbErr> {
        let parent_id = match model.parent_id {
            Some(id) => ids::work_item_uuid_by_id(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Parent not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let status_id = ids::status_uuid_by_id(db, model.status_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Status not found".to_string()))?;
        let priority_id = ids::priority_uuid_by_id(db, model.priority_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Priority not found".to_string()))?;
        let created_by = ids::user_uuid_by_id(db, model.created_by)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let updated_by = ids::user_uuid_by_id(db, model.updated_by)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let supervisor_id = ids::user_uuid_by_id(db, model.supervisor_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            kind: model.kind,
            parent_id,
            slug: model.slug.unwrap_or_default(),
            name: model.name,
            description: model.description,
            start_date: model.start_date,
            due_date: model.due_date,
            status_id,
            priority_id,
            is_private: model.is_private,
            created_by,
            updated_by,
            supervisor_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn live() -> Condition {
        Condition::all().add(work_item::Column::DeletedAt.is_null())
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_page<C: ConnectionTrait>(
        db: &C,
        kind: WorkItemKind,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<Paginated<Self>, DbErr> {
        let mut query = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::Kind.eq(kind));

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(work_item::Column::Name.contains(search))
                    .add(work_item::Column::Slug.contains(search)),
            );
        }

        let paginator = query
            .order_by_desc(work_item::Column::UpdatedAt)
            .paginate(db, per_page.max(1));
        let totals = paginator.num_items_and_pages().await?;
        let page_index = page.max(1) - 1;
        let models = paginator.fetch_page(page_index).await?;

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            items.push(Self::from_model(db, model).await?);
        }

        Ok(Paginated {
            items,
            page: page.max(1),
            per_page: per_page.max(1),
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// Paginated fetch over live rows with a caller-built filter; the
    /// dashboard aggregator assembles its feed through this.
    pub async fn find_page_where<C: ConnectionTrait>(
        db: &C,
        condition: Condition,
        sort: (work_item::Column, Order),
        page: u64,
        per_page: u64,
    ) -> Result<Paginated<Self>, DbErr> {
        let paginator = work_item::Entity::find()
            .filter(Self::live())
            .filter(condition)
            .order_by(sort.0, sort.1)
            .paginate(db, per_page.max(1));

        let totals = paginator.num_items_and_pages().await?;
        let models = paginator.fetch_page(page.max(1) - 1).await?;

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            items.push(Self::from_model(db, model).await?);
        }

        Ok(Paginated {
            items,
            page: page.max(1),
            per_page: per_page.max(1),
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// Resolve an item even after soft deletion; the activity log keeps
    /// pointing at deleted subjects.
    pub async fn find_by_id_including_deleted<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = work_item::Entity::find()
            .filter(work_item::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_children<C: ConnectionTrait>(
        db: &C,
        parent_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let parent_row_id = match ids::work_item_id_by_uuid(db, parent_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::ParentId.eq(parent_row_id))
            .order_by_desc(work_item::Column::CreatedAt)
            .all(db)
            .await?;

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            items.push(Self::from_model(db, model).await?);
        }
        Ok(items)
    }

    pub async fn membership<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Membership, DbErr> {
        let row_id = ids::work_item_id_by_uuid(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Work item not found".to_string()))?;

        Ok(Membership {
            assignees: member_uuids(db, MemberRole::Assignee, row_id).await?,
            viewers: member_uuids(db, MemberRole::Viewer, row_id).await?,
        })
    }

    /// Membership resolved to full users, for the show endpoint.
    pub async fn member_users<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<(Vec<User>, Vec<User>), DbErr> {
        let membership = Self::membership(db, id).await?;
        let mut assignees = Vec::with_capacity(membership.assignees.len());
        for user_id in membership.assignees {
            if let Some(user) = User::find_by_id(db, user_id).await? {
                assignees.push(user);
            }
        }
        let mut viewers = Vec::with_capacity(membership.viewers.len());
        for user_id in membership.viewers {
            if let Some(user) = User::find_by_id(db, user_id).await? {
                viewers.push(user);
            }
        }
        Ok((assignees, viewers))
    }

    /// Create the base row, assign the slug from the generated row id, attach
    /// membership, log the creation, and queue assignment notifications.
    /// Call inside a transaction; nothing here commits.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        kind: WorkItemKind,
        data: &CreateWorkItem,
        item_id: Uuid,
        acting: &User,
    ) -> Result<Self, WorkItemError> {
        let causer_row_id = acting.row_id(db).await?;

        let parent_row_id = match kind.parent_kind() {
            Some(parent_kind) => {
                let parent_uuid = data.parent_id.ok_or(WorkItemError::ParentNotFound)?;
                Some(Self::live_parent_row_id(db, parent_uuid, parent_kind).await?)
            }
            None => None,
        };
        let status_row_id = ids::status_id_by_uuid(db, data.status_id)
            .await?
            .ok_or(WorkItemError::StatusNotFound)?;
        let priority_row_id = ids::priority_id_by_uuid(db, data.priority_id)
            .await?
            .ok_or(WorkItemError::PriorityNotFound)?;
        let supervisor_row_id = ids::user_id_by_uuid(db, data.supervisor_id)
            .await?
            .ok_or(WorkItemError::SupervisorNotFound)?;

        let now = Utc::now();
        let active = work_item::ActiveModel {
            uuid: Set(item_id),
            kind: Set(kind),
            parent_id: Set(parent_row_id),
            slug: Set(None),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            start_date: Set(data.start_date),
            due_date: Set(data.due_date),
            status_id: Set(status_row_id),
            priority_id: Set(priority_row_id),
            is_private: Set(data.is_private),
            created_by: Set(causer_row_id),
            updated_by: Set(causer_row_id),
            supervisor_id: Set(supervisor_row_id),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        // Slug depends on the generated row id, so it lands in a second write.
        let slug = format!("{}-{}", kind.slug_prefix(), model.id);
        let mut active: work_item::ActiveModel = model.into();
        active.slug = Set(Some(slug.clone()));
        let model = active.update(db).await?;
        let item_row_id = model.id;

        let assignee_users = attach_members(
            db,
            MemberRole::Assignee,
            item_row_id,
            &data.assignees,
            WorkItemError::AssigneeNotFound,
        )
        .await?;
        let viewer_users = attach_members(
            db,
            MemberRole::Viewer,
            item_row_id,
            &data.viewers,
            WorkItemError::ViewerNotFound,
        )
        .await?;

        let snapshot = tracked_snapshot(db, &model).await?;
        ActivityLog::record(
            db,
            causer_row_id,
            kind.subject_type(),
            item_id,
            EVENT_CREATED,
            Value::Object(Map::new()),
            Value::Object(snapshot),
        )
        .await?;

        if !assignee_users.is_empty() {
            ActivityLog::record(
                db,
                causer_row_id,
                kind.subject_type(),
                item_id,
                EVENT_ASSIGNEE_ADDED,
                Value::Object(Map::new()),
                json!({ "assignees": member_log_entries(&assignee_users) }),
            )
            .await?;
        }
        if !viewer_users.is_empty() {
            ActivityLog::record(
                db,
                causer_row_id,
                kind.subject_type(),
                item_id,
                EVENT_VIEWER_ADDED,
                Value::Object(Map::new()),
                json!({ "viewers": member_log_entries(&viewer_users) }),
            )
            .await?;
        }

        queue_member_notifications(
            db,
            &model,
            &slug,
            NotificationKind::Assigned,
            &assignee_users,
        )
        .await?;
        queue_member_notifications(
            db,
            &model,
            &slug,
            NotificationKind::ViewerAssigned,
            &viewer_users,
        )
        .await?;

        Ok(Self::from_model(db, model).await?)
    }

    /// Full edit: base fields, membership sync (delta-aware), activity
    /// entries, and notifications for new members. The returned flag reports
    /// whether this edit moved the item into In Review; the caller already
    /// runs inside a transaction and queues the supervisor notification.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &CreateWorkItem,
        acting: &User,
    ) -> Result<(Self, MembershipChanges, bool), WorkItemError> {
        let causer_row_id = acting.row_id(db).await?;

        let record = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(WorkItemError::NotFound)?;
        let kind = record.kind;
        let item_row_id = record.id;

        let parent_row_id = match kind.parent_kind() {
            Some(parent_kind) => {
                let parent_uuid = data.parent_id.ok_or(WorkItemError::ParentNotFound)?;
                Some(Self::live_parent_row_id(db, parent_uuid, parent_kind).await?)
            }
            None => None,
        };
        let status_row_id = ids::status_id_by_uuid(db, data.status_id)
            .await?
            .ok_or(WorkItemError::StatusNotFound)?;
        let priority_row_id = ids::priority_id_by_uuid(db, data.priority_id)
            .await?
            .ok_or(WorkItemError::PriorityNotFound)?;
        let supervisor_row_id = ids::user_id_by_uuid(db, data.supervisor_id)
            .await?
            .ok_or(WorkItemError::SupervisorNotFound)?;

        // Review detection compares against the row as it was before the write.
        let entering_review = status_row_id != record.status_id
            && status_name_of(db, status_row_id).await? == Some(StatusName::InReview);

        let old_snapshot = tracked_snapshot(db, &record).await?;

        let mut active: work_item::ActiveModel = record.into();
        active.parent_id = Set(parent_row_id);
        active.name = Set(data.name.clone());
        active.description = Set(data.description.clone());
        active.start_date = Set(data.start_date);
        active.due_date = Set(data.due_date);
        active.status_id = Set(status_row_id);
        active.priority_id = Set(priority_row_id);
        active.is_private = Set(data.is_private);
        active.supervisor_id = Set(supervisor_row_id);
        active.updated_by = Set(causer_row_id);
        active.updated_at = Set(Utc::now());
        let model = active.update(db).await?;
        let slug = model.slug.clone().unwrap_or_default();

        let new_snapshot = tracked_snapshot(db, &model).await?;
        let (old_dirty, new_dirty) = dirty_values(&old_snapshot, &new_snapshot);
        if !new_dirty.is_empty() {
            ActivityLog::record(
                db,
                causer_row_id,
                kind.subject_type(),
                id,
                EVENT_UPDATED,
                Value::Object(old_dirty),
                Value::Object(new_dirty),
            )
            .await?;
        }

        let (attached_assignees, detached_assignees) = sync_members(
            db,
            MemberRole::Assignee,
            item_row_id,
            &data.assignees,
            WorkItemError::AssigneeNotFound,
        )
        .await?;
        let (attached_viewers, detached_viewers) = sync_members(
            db,
            MemberRole::Viewer,
            item_row_id,
            &data.viewers,
            WorkItemError::ViewerNotFound,
        )
        .await?;

        for (event, key, members) in [
            (EVENT_ASSIGNEE_ADDED, "assignees", &attached_assignees),
            (EVENT_VIEWER_ADDED, "viewers", &attached_viewers),
        ] {
            if !members.is_empty() {
                ActivityLog::record(
                    db,
                    causer_row_id,
                    kind.subject_type(),
                    id,
                    event,
                    Value::Object(Map::new()),
                    json!({ key: member_log_entries(members) }),
                )
                .await?;
            }
        }
        for (event, key, members) in [
            (EVENT_ASSIGNEE_REMOVED, "assignees", &detached_assignees),
            (EVENT_VIEWER_REMOVED, "viewers", &detached_viewers),
        ] {
            if !members.is_empty() {
                ActivityLog::record(
                    db,
                    causer_row_id,
                    kind.subject_type(),
                    id,
                    event,
                    json!({ key: member_log_entries(members) }),
                    Value::Object(Map::new()),
                )
                .await?;
            }
        }

        queue_member_notifications(
            db,
            &model,
            &slug,
            NotificationKind::Assigned,
            &attached_assignees,
        )
        .await?;
        queue_member_notifications(
            db,
            &model,
            &slug,
            NotificationKind::ViewerAssigned,
            &attached_viewers,
        )
        .await?;

        if entering_review {
            Self::queue_supervisor_notification(db, &model, &slug).await?;
        }

        let changes = MembershipChanges {
            attached_assignees: attached_assignees.iter().map(|u| u.id).collect(),
            detached_assignees: detached_assignees.iter().map(|u| u.id).collect(),
            attached_viewers: attached_viewers.iter().map(|u| u.id).collect(),
            detached_viewers: detached_viewers.iter().map(|u| u.id).collect(),
        };
        let item = Self::from_model(db, model).await?;
        Ok((item, changes, entering_review))
    }

    /// Persist a bare status change. The caller has already authorized the
    /// transition; entering In Review queues the supervisor notification.
    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        status_id: Uuid,
        acting: &User,
    ) -> Result<(Self, bool), WorkItemError> {
        let causer_row_id = acting.row_id(db).await?;

        let record = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(WorkItemError::NotFound)?;
        let kind = record.kind;

        let status_row_id = ids::status_id_by_uuid(db, status_id)
            .await?
            .ok_or(WorkItemError::StatusNotFound)?;

        let changed = status_row_id != record.status_id;
        let entering_review =
            changed && status_name_of(db, status_row_id).await? == Some(StatusName::InReview);
        let old_status_name = status_name_string(db, record.status_id).await?;
        let new_status_name = status_name_string(db, status_row_id).await?;

        let mut active: work_item::ActiveModel = record.into();
        active.status_id = Set(status_row_id);
        active.updated_by = Set(causer_row_id);
        active.updated_at = Set(Utc::now());
        let model = active.update(db).await?;
        let slug = model.slug.clone().unwrap_or_default();

        if changed {
            ActivityLog::record(
                db,
                causer_row_id,
                kind.subject_type(),
                id,
                EVENT_UPDATED,
                json!({ "status.name": old_status_name }),
                json!({ "status.name": new_status_name }),
            )
            .await?;
        }

        if entering_review {
            Self::queue_supervisor_notification(db, &model, &slug).await?;
        }

        let item = Self::from_model(db, model).await?;
        Ok((item, entering_review))
    }

    /// Soft delete. Returns the number of rows marked; 0 when the item does
    /// not exist or was already deleted.
    pub async fn soft_delete<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        acting: &User,
    ) -> Result<u64, WorkItemError> {
        let causer_row_id = acting.row_id(db).await?;

        let record = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::Uuid.eq(id))
            .one(db)
            .await?;

        let Some(record) = record else {
            return Ok(0);
        };
        let kind = record.kind;

        let snapshot = tracked_snapshot(db, &record).await?;
        let mut active: work_item::ActiveModel = record.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.updated_by = Set(causer_row_id);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        ActivityLog::record(
            db,
            causer_row_id,
            kind.subject_type(),
            id,
            EVENT_DELETED,
            Value::Object(snapshot),
            Value::Object(Map::new()),
        )
        .await?;

        Ok(1)
    }

    async fn live_parent_row_id<C: ConnectionTrait>(
        db: &C,
        parent_uuid: Uuid,
        parent_kind: WorkItemKind,
    ) -> Result<i64, WorkItemError> {
        let parent = work_item::Entity::find()
            .filter(Self::live())
            .filter(work_item::Column::Uuid.eq(parent_uuid))
            .filter(work_item::Column::Kind.eq(parent_kind))
            .one(db)
            .await?
            .ok_or(WorkItemError::ParentNotFound)?;
        Ok(parent.id)
    }

    async fn queue_supervisor_notification<C: ConnectionTrait>(
        db: &C,
        model: &work_item::Model,
        slug: &str,
    ) -> Result<(), DbErr> {
        let Some(supervisor) = User::find_by_row_id(db, model.supervisor_id).await? else {
            return Ok(());
        };
        let Some(email) = supervisor.email.clone() else {
            return Ok(());
        };
        let payload = notification_payload(model.kind, slug, &model.name);
        NotificationOutbox::enqueue(
            db,
            NotificationKind::InReview,
            model.supervisor_id,
            &email,
            model.id,
            payload,
        )
        .await
    }
}

async fn status_name_of<C: ConnectionTrait>(
    db: &C,
    status_row_id: i64,
) -> Result<Option<StatusName>, DbErr> {
    let uuid = ids::status_uuid_by_id(db, status_row_id)
        .await?
        .ok_or(DbErr::RecordNotFound("Status not found".to_string()))?;
    Ok(Status::find_by_id(db, uuid)
        .await?
        .and_then(|status| status.workflow_name()))
}

async fn status_name_string<C: ConnectionTrait>(
    db: &C,
    status_row_id: i64,
) -> Result<String, DbErr> {
    let uuid = ids::status_uuid_by_id(db, status_row_id)
        .await?
        .ok_or(DbErr::RecordNotFound("Status not found".to_string()))?;
    let status = Status::find_by_id(db, uuid)
        .await?
        .ok_or(DbErr::RecordNotFound("Status not found".to_string()))?;
    Ok(status.name)
}

/// Attributes the activity log tracks, keyed the way the log renders them.
async fn tracked_snapshot<C: ConnectionTrait>(
    db: &C,
    model: &work_item::Model,
) -> Result<Map<String, Value>, DbErr> {
    let status_name = status_name_string(db, model.status_id).await?;
    let priority_uuid = ids::priority_uuid_by_id(db, model.priority_id)
        .await?
        .ok_or(DbErr::RecordNotFound("Priority not found".to_string()))?;
    let priority = Priority::find_by_id(db, priority_uuid)
        .await?
        .ok_or(DbErr::RecordNotFound("Priority not found".to_string()))?;
    let supervisor = User::find_by_row_id(db, model.supervisor_id)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

    let mut snapshot = Map::new();
    snapshot.insert("name".to_string(), json!(model.name));
    snapshot.insert("description".to_string(), json!(model.description));
    snapshot.insert(
        "start_date".to_string(),
        json!(model.start_date.to_rfc3339()),
    );
    snapshot.insert("due_date".to_string(), json!(model.due_date.to_rfc3339()));
    snapshot.insert("is_private".to_string(), json!(model.is_private));
    snapshot.insert("status.name".to_string(), json!(status_name));
    snapshot.insert("priority.name".to_string(), json!(priority.name));
    snapshot.insert("supervisor.name".to_string(), json!(supervisor.name));
    snapshot.insert("supervisor.email".to_string(), json!(supervisor.email));
    Ok(snapshot)
}

/// Keep only the keys whose values differ; the log stores dirty attributes.
fn dirty_values(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
) -> (Map<String, Value>, Map<String, Value>) {
    let mut old_dirty = Map::new();
    let mut new_dirty = Map::new();
    for (key, new_value) in new {
        let old_value = old.get(key);
        if old_value != Some(new_value) {
            if let Some(old_value) = old_value {
                old_dirty.insert(key.clone(), old_value.clone());
            }
            new_dirty.insert(key.clone(), new_value.clone());
        }
    }
    (old_dirty, new_dirty)
}

fn member_log_entries(users: &[User]) -> Vec<Value> {
    users
        .iter()
        .map(|user| json!({ "name": user.name, "email": user.email }))
        .collect()
}

fn notification_payload(kind: WorkItemKind, slug: &str, name: &str) -> Value {
    serde_json::to_value(NotificationPayload {
        item_kind: kind,
        slug: slug.to_string(),
        name: name.to_string(),
    })
    .unwrap_or(Value::Null)
}

async fn queue_member_notifications<C: ConnectionTrait>(
    db: &C,
    model: &work_item::Model,
    slug: &str,
    kind: NotificationKind,
    members: &[User],
) -> Result<(), WorkItemError> {
    for member in members {
        let Some(email) = member.email.clone() else {
            continue;
        };
        let recipient_row_id = ids::user_id_by_uuid(db, member.id)
            .await?
            .ok_or(WorkItemError::AssigneeNotFound)?;
        NotificationOutbox::enqueue(
            db,
            kind,
            recipient_row_id,
            &email,
            model.id,
            notification_payload(model.kind, slug, &model.name),
        )
        .await?;
    }
    Ok(())
}

/// The two membership join tables are column-identical; operations dispatch
/// on this marker instead of duplicating the plumbing per table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MemberRole {
    Assignee,
    Viewer,
}

async fn member_user_row_ids<C: ConnectionTrait>(
    db: &C,
    role: MemberRole,
    work_item_row_id: i64,
) -> Result<Vec<i64>, DbErr> {
    match role {
        MemberRole::Assignee => {
            work_item_assignee::Entity::find()
                .select_only()
                .column(work_item_assignee::Column::UserId)
                .filter(work_item_assignee::Column::WorkItemId.eq(work_item_row_id))
                .into_tuple()
                .all(db)
                .await
        }
        MemberRole::Viewer => {
            work_item_viewer::Entity::find()
                .select_only()
                .column(work_item_viewer::Column::UserId)
                .filter(work_item_viewer::Column::WorkItemId.eq(work_item_row_id))
                .into_tuple()
                .all(db)
                .await
        }
    }
}

async fn insert_member_row<C: ConnectionTrait>(
    db: &C,
    role: MemberRole,
    work_item_row_id: i64,
    user_row_id: i64,
) -> Result<(), DbErr> {
    match role {
        MemberRole::Assignee => {
            let active = work_item_assignee::ActiveModel {
                work_item_id: Set(work_item_row_id),
                user_id: Set(user_row_id),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            active.insert(db).await?;
        }
        MemberRole::Viewer => {
            let active = work_item_viewer::ActiveModel {
                work_item_id: Set(work_item_row_id),
                user_id: Set(user_row_id),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            active.insert(db).await?;
        }
    }
    Ok(())
}

async fn delete_member_row<C: ConnectionTrait>(
    db: &C,
    role: MemberRole,
    work_item_row_id: i64,
    user_row_id: i64,
) -> Result<(), DbErr> {
    match role {
        MemberRole::Assignee => {
            work_item_assignee::Entity::delete_many()
                .filter(work_item_assignee::Column::WorkItemId.eq(work_item_row_id))
                .filter(work_item_assignee::Column::UserId.eq(user_row_id))
                .exec(db)
                .await?;
        }
        MemberRole::Viewer => {
            work_item_viewer::Entity::delete_many()
                .filter(work_item_viewer::Column::WorkItemId.eq(work_item_row_id))
                .filter(work_item_viewer::Column::UserId.eq(user_row_id))
                .exec(db)
                .await?;
        }
    }
    Ok(())
}

async fn member_uuids<C: ConnectionTrait>(
    db: &C,
    role: MemberRole,
    work_item_row_id: i64,
) -> Result<Vec<Uuid>, DbErr> {
    let user_row_ids = member_user_row_ids(db, role, work_item_row_id).await?;
    let mut uuids = Vec::with_capacity(user_row_ids.len());
    for row_id in user_row_ids {
        if let Some(uuid) = ids::user_uuid_by_id(db, row_id).await? {
            uuids.push(uuid);
        }
    }
    Ok(uuids)
}

async fn attach_members<C: ConnectionTrait>(
    db: &C,
    role: MemberRole,
    work_item_row_id: i64,
    member_ids: &[Uuid],
    missing: WorkItemError,
) -> Result<Vec<User>, WorkItemError> {
    let mut users = Vec::with_capacity(member_ids.len());
    for member_id in member_ids {
        let user_row_id = match ids::user_id_by_uuid(db, *member_id).await? {
            Some(id) => id,
            None => return Err(missing),
        };
        insert_member_row(db, role, work_item_row_id, user_row_id).await?;
        if let Some(user) = User::find_by_id(db, *member_id).await? {
            users.push(user);
        }
    }
    Ok(users)
}

/// Symmetric-difference sync: attach the target members not yet present,
/// detach the present members no longer targeted, leave the rest alone.
async fn sync_members<C: ConnectionTrait>(
    db: &C,
    role: MemberRole,
    work_item_row_id: i64,
    target_ids: &[Uuid],
    missing: WorkItemError,
) -> Result<(Vec<User>, Vec<User>), WorkItemError> {
    let current_row_ids = member_user_row_ids(db, role, work_item_row_id).await?;

    let mut target_row_ids = Vec::with_capacity(target_ids.len());
    for member_id in target_ids {
        let row_id = match ids::user_id_by_uuid(db, *member_id).await? {
            Some(id) => id,
            None => return Err(missing),
        };
        if !target_row_ids.contains(&row_id) {
            target_row_ids.push(row_id);
        }
    }

    let mut attached = Vec::new();
    for row_id in &target_row_ids {
        if !current_row_ids.contains(row_id) {
            insert_member_row(db, role, work_item_row_id, *row_id).await?;
            if let Some(user) = User::find_by_row_id(db, *row_id).await? {
                attached.push(user);
            }
        }
    }

    let mut detached = Vec::new();
    for row_id in &current_row_ids {
        if !target_row_ids.contains(row_id) {
            let user = User::find_by_row_id(db, *row_id).await?;
            delete_member_row(db, role, work_item_row_id, *row_id).await?;
            if let Some(user) = user {
                detached.push(user);
            }
        }
    }

    Ok((attached, detached))
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::{
        models::{notification_outbox::NotificationOutbox, user::CreateUser},
        types::Role,
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn make_user<C: ConnectionTrait>(db: &C, name: &str, role: Role) -> User {
        User::create(
            db,
            &CreateUser {
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                password_hash: None,
                role,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn base_input<C: ConnectionTrait>(
        db: &C,
        supervisor: &User,
        assignees: Vec<Uuid>,
    ) -> CreateWorkItem {
        let status = Status::find_by_name(db, StatusName::Backlog)
            .await
            .unwrap()
            .unwrap();
        let priority = Priority::find_all(db).await.unwrap().remove(0);
        let start = Utc::now();
        CreateWorkItem {
            parent_id: None,
            name: "Launch".to_string(),
            description: None,
            start_date: start,
            due_date: start + chrono::Duration::days(7),
            status_id: status.id,
            priority_id: priority.id,
            supervisor_id: supervisor.id,
            is_private: false,
            assignees,
            viewers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn sequential_creates_get_sequential_slugs() {
        let db = setup_db().await;
        let admin = make_user(&db, "Ada", Role::Admin).await;
        let input = base_input(&db, &admin, vec![admin.id]).await;

        let first = WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();
        let second = WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();

        let first_n: i64 = first.slug.strip_prefix("PRO-").unwrap().parse().unwrap();
        let second_n: i64 = second.slug.strip_prefix("PRO-").unwrap().parse().unwrap();
        assert_eq!(second_n, first_n + 1);
    }

    #[tokio::test]
    async fn task_requires_a_project_parent() {
        let db = setup_db().await;
        let admin = make_user(&db, "Ada", Role::Admin).await;
        let mut input = base_input(&db, &admin, vec![admin.id]).await;

        let err = WorkItem::create(&db, WorkItemKind::Task, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkItemError::ParentNotFound));

        let project =
            WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
                .await
                .unwrap();
        input.parent_id = Some(project.id);
        let task = WorkItem::create(&db, WorkItemKind::Task, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();
        assert_eq!(task.parent_id, Some(project.id));
        assert!(task.slug.starts_with("TASK-"));

        // A sub-task cannot hang off a project.
        let err = WorkItem::create(&db, WorkItemKind::SubTask, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkItemError::ParentNotFound));
    }

    #[tokio::test]
    async fn create_queues_notifications_for_members_with_email() {
        let db = setup_db().await;
        let admin = make_user(&db, "Ada", Role::Admin).await;
        let staff = make_user(&db, "Pat", Role::Staff).await;
        let input = base_input(&db, &admin, vec![admin.id, staff.id]).await;

        WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();

        let pending = NotificationOutbox::fetch_unpublished(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending
            .iter()
            .all(|entry| entry.kind == NotificationKind::Assigned));
    }

    #[tokio::test]
    async fn edit_membership_sync_reports_exact_deltas() {
        let db = setup_db().await;
        let admin = make_user(&db, "Ada", Role::Admin).await;
        let kept = make_user(&db, "Kim", Role::Staff).await;
        let removed = make_user(&db, "Rem", Role::Staff).await;
        let added = make_user(&db, "Ned", Role::Staff).await;

        let input = base_input(&db, &admin, vec![kept.id, removed.id]).await;
        let item = WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();

        // Drain creation notifications so only the edit's remain.
        for entry in NotificationOutbox::fetch_unpublished(&db, 10).await.unwrap() {
            NotificationOutbox::mark_published(&db, entry.id)
                .await
                .unwrap();
        }

        let mut edit = input.clone();
        edit.assignees = vec![kept.id, added.id];
        let (_, changes, entered_review) = WorkItem::update(&db, item.id, &edit, &admin)
            .await
            .unwrap();

        assert!(!entered_review);
        assert_eq!(changes.attached_assignees, vec![added.id]);
        assert_eq!(changes.detached_assignees, vec![removed.id]);
        assert!(changes.attached_viewers.is_empty());

        let pending = NotificationOutbox::fetch_unpublished(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1, "only the newly attached member is notified");

        let membership = WorkItem::membership(&db, item.id).await.unwrap();
        assert!(membership.includes(kept.id));
        assert!(membership.includes(added.id));
        assert!(!membership.includes(removed.id));
    }

    #[tokio::test]
    async fn status_update_into_review_queues_supervisor_notification() {
        let db = setup_db().await;
        let admin = make_user(&db, "Ada", Role::Admin).await;
        let supervisor = make_user(&db, "Sam", Role::Supervisor).await;

        let mut input = base_input(&db, &supervisor, vec![admin.id]).await;
        input.supervisor_id = supervisor.id;
        let item = WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();
        for entry in NotificationOutbox::fetch_unpublished(&db, 10).await.unwrap() {
            NotificationOutbox::mark_published(&db, entry.id)
                .await
                .unwrap();
        }

        let review = Status::find_by_name(&db, StatusName::InReview)
            .await
            .unwrap()
            .unwrap();
        let (updated, entered_review) =
            WorkItem::update_status(&db, item.id, review.id, &admin)
                .await
                .unwrap();
        assert!(entered_review);
        assert_eq!(updated.status_id, review.id);

        let pending = NotificationOutbox::fetch_unpublished(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, NotificationKind::InReview);
        assert_eq!(
            pending[0].recipient_email,
            supervisor.email.clone().unwrap()
        );

        // Re-entering the same status is not a review transition.
        let (_, entered_again) = WorkItem::update_status(&db, item.id, review.id, &admin)
            .await
            .unwrap();
        assert!(!entered_again);
    }

    #[tokio::test]
    async fn soft_delete_hides_item_and_is_not_repeatable() {
        let db = setup_db().await;
        let admin = make_user(&db, "Ada", Role::Admin).await;
        let input = base_input(&db, &admin, vec![admin.id]).await;
        let item = WorkItem::create(&db, WorkItemKind::Project, &input, Uuid::new_v4(), &admin)
            .await
            .unwrap();

        assert_eq!(WorkItem::soft_delete(&db, item.id, &admin).await.unwrap(), 1);
        assert!(WorkItem::find_by_id(&db, item.id).await.unwrap().is_none());
        assert_eq!(WorkItem::soft_delete(&db, item.id, &admin).await.unwrap(), 0);
    }
}
