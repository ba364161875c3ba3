//! Unified dashboard feed: one filtered, sorted, paginated result set across
//! projects, tasks, and sub-tasks. The three kinds live in one table, so the
//! aggregation is a kind-aware query rather than a union of three.

use chrono::{NaiveTime, Utc};
use db::{
    ConnectionTrait, DbErr,
    entities::{work_item, work_item_assignee, work_item_viewer},
    models::{Paginated, ids, status::Status, user::User, work_item::WorkItem},
    types::{StatusName, WorkItemKind},
};
use sea_orm::{ColumnTrait, Condition, Order, sea_query::Query};
use serde::{Deserialize, Deserializer};
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: u64 = 10;

const SORT_FIELDS: [(&str, work_item::Column); 4] = [
    ("due_date", work_item::Column::DueDate),
    ("updated_at", work_item::Column::UpdatedAt),
    ("status_id", work_item::Column::StatusId),
    ("priority_id", work_item::Column::PriorityId),
];

/// Query-string filters. List-valued filters arrive comma-separated
/// (`status_ids=<uuid>,<uuid>`).
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct DashboardQuery {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "comma_separated_uuids")]
    pub status_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "comma_separated_uuids")]
    pub priority_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "comma_separated_uuids")]
    pub supervisor_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "comma_separated_uuids")]
    pub creator_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "comma_separated_uuids")]
    pub assignee_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "comma_separated_uuids")]
    pub viewer_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "comma_separated_kinds")]
    pub task_types: Option<Vec<WorkItemKind>>,
    pub overdue: Option<bool>,
    pub per_page: Option<u64>,
    pub page: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

pub async fn fetch<C: ConnectionTrait>(
    db: &C,
    user: &User,
    query: &DashboardQuery,
) -> Result<Paginated<WorkItem>, DbErr> {
    let mut condition = Condition::all();

    // Non-elevated callers only see what can_view would grant them.
    if !user.role.is_admin_or_supervisor() {
        let user_row_id = ids::user_id_by_uuid(db, user.id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        condition = condition.add(
            Condition::any()
                .add(work_item::Column::IsPrivate.eq(false))
                .add(work_item::Column::Id.in_subquery(membership_subquery(
                    MembershipTable::Assignees,
                    vec![user_row_id],
                )))
                .add(work_item::Column::Id.in_subquery(membership_subquery(
                    MembershipTable::Viewers,
                    vec![user_row_id],
                ))),
        );
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(work_item::Column::Name.contains(search))
                .add(work_item::Column::Slug.contains(search)),
        );
    }

    if let Some(status_ids) = &query.status_ids {
        let rows = resolve_status_rows(db, status_ids).await?;
        condition = condition.add(work_item::Column::StatusId.is_in(rows));
    }

    if let Some(priority_ids) = &query.priority_ids {
        let mut rows = Vec::with_capacity(priority_ids.len());
        for id in priority_ids {
            if let Some(row) = ids::priority_id_by_uuid(db, *id).await? {
                rows.push(row);
            }
        }
        condition = condition.add(work_item::Column::PriorityId.is_in(rows));
    }

    if let Some(supervisor_ids) = &query.supervisor_ids {
        let rows = resolve_user_rows(db, supervisor_ids).await?;
        condition = condition.add(work_item::Column::SupervisorId.is_in(rows));
    }

    if let Some(creator_ids) = &query.creator_ids {
        let rows = resolve_user_rows(db, creator_ids).await?;
        condition = condition.add(work_item::Column::CreatedBy.is_in(rows));
    }

    if let Some(assignee_ids) = &query.assignee_ids {
        let rows = resolve_user_rows(db, assignee_ids).await?;
        condition = condition.add(
            work_item::Column::Id
                .in_subquery(membership_subquery(MembershipTable::Assignees, rows)),
        );
    }

    if let Some(viewer_ids) = &query.viewer_ids {
        let rows = resolve_user_rows(db, viewer_ids).await?;
        condition = condition.add(
            work_item::Column::Id.in_subquery(membership_subquery(MembershipTable::Viewers, rows)),
        );
    }

    if let Some(task_types) = &query.task_types {
        condition = condition.add(work_item::Column::Kind.is_in(task_types.clone()));
    }

    // Overdue: past the due date and not yet Done.
    if query.overdue.unwrap_or(false) {
        let today = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        condition = condition.add(work_item::Column::DueDate.lt(today));
        if let Some(done) = Status::find_by_name(db, StatusName::Done).await? {
            if let Some(done_row) = ids::status_id_by_uuid(db, done.id).await? {
                condition = condition.add(work_item::Column::StatusId.ne(done_row));
            }
        }
    }

    let requested_sort = query.sort_by.as_deref().unwrap_or("updated_at");
    let sort_column = SORT_FIELDS
        .iter()
        .find(|(name, _)| *name == requested_sort)
        .map(|(_, column)| *column)
        // Unrecognized sort fields fall back to the due date.
        .unwrap_or(work_item::Column::DueDate);
    let sort_order = match query.sort_direction.as_deref() {
        Some(direction) if direction.eq_ignore_ascii_case("desc") => Order::Desc,
        _ => Order::Asc,
    };

    WorkItem::find_page_where(
        db,
        condition,
        (sort_column, sort_order),
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .await
}

enum MembershipTable {
    Assignees,
    Viewers,
}

fn membership_subquery(
    table: MembershipTable,
    user_row_ids: Vec<i64>,
) -> sea_orm::sea_query::SelectStatement {
    match table {
        MembershipTable::Assignees => Query::select()
            .column(work_item_assignee::Column::WorkItemId)
            .from(work_item_assignee::Entity)
            .and_where(work_item_assignee::Column::UserId.is_in(user_row_ids))
            .to_owned(),
        MembershipTable::Viewers => Query::select()
            .column(work_item_viewer::Column::WorkItemId)
            .from(work_item_viewer::Entity)
            .and_where(work_item_viewer::Column::UserId.is_in(user_row_ids))
            .to_owned(),
    }
}

async fn resolve_status_rows<C: ConnectionTrait>(
    db: &C,
    status_ids: &[Uuid],
) -> Result<Vec<i64>, DbErr> {
    let mut rows = Vec::with_capacity(status_ids.len());
    for id in status_ids {
        if let Some(row) = ids::status_id_by_uuid(db, *id).await? {
            rows.push(row);
        }
    }
    Ok(rows)
}

async fn resolve_user_rows<C: ConnectionTrait>(
    db: &C,
    user_ids: &[Uuid],
) -> Result<Vec<i64>, DbErr> {
    let mut rows = Vec::with_capacity(user_ids.len());
    for id in user_ids {
        if let Some(row) = ids::user_id_by_uuid(db, *id).await? {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn comma_separated_uuids<'de, D>(deserializer: D) -> Result<Option<Vec<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw
            .split(',')
            .map(|part| part.trim().parse::<Uuid>())
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn comma_separated_kinds<'de, D>(deserializer: D) -> Result<Option<Vec<WorkItemKind>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw
            .split(',')
            .map(|part| part.trim().parse::<WorkItemKind>())
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use db::{
        models::{
            priority::Priority,
            user::CreateUser,
            work_item::CreateWorkItem,
        },
        types::Role,
    };
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;

    struct Fixture {
        db: DatabaseConnection,
        admin: User,
        staff: User,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let admin = User::create(
            &db,
            &CreateUser {
                name: "Ada".to_string(),
                email: Some("ada@example.com".to_string()),
                password_hash: None,
                role: Role::Admin,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let staff = User::create(
            &db,
            &CreateUser {
                name: "Pat".to_string(),
                email: Some("pat@example.com".to_string()),
                password_hash: None,
                role: Role::Staff,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        Fixture { db, admin, staff }
    }

    async fn make_item(
        f: &Fixture,
        kind: WorkItemKind,
        name: &str,
        parent_id: Option<Uuid>,
        is_private: bool,
        assignees: Vec<Uuid>,
        status: StatusName,
        due_in_days: i64,
    ) -> WorkItem {
        let status = Status::find_by_name(&f.db, status).await.unwrap().unwrap();
        let priority = Priority::find_all(&f.db).await.unwrap().remove(0);
        let start = Utc::now() - Duration::days(10);
        WorkItem::create(
            &f.db,
            kind,
            &CreateWorkItem {
                parent_id,
                name: name.to_string(),
                description: None,
                start_date: start,
                due_date: Utc::now() + Duration::days(due_in_days),
                status_id: status.id,
                priority_id: priority.id,
                supervisor_id: f.admin.id,
                is_private,
                assignees,
                viewers: Vec::new(),
            },
            Uuid::new_v4(),
            &f.admin,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn staff_only_see_public_or_assigned_items() {
        let f = setup().await;
        let admin_id = f.admin.id;
        let staff_id = f.staff.id;

        let public = make_item(
            &f,
            WorkItemKind::Project,
            "Public",
            None,
            false,
            vec![admin_id],
            StatusName::Backlog,
            5,
        )
        .await;
        let private_assigned = make_item(
            &f,
            WorkItemKind::Project,
            "Private mine",
            None,
            true,
            vec![staff_id],
            StatusName::Backlog,
            5,
        )
        .await;
        let private_hidden = make_item(
            &f,
            WorkItemKind::Project,
            "Private other",
            None,
            true,
            vec![admin_id],
            StatusName::Backlog,
            5,
        )
        .await;

        let feed = fetch(&f.db, &f.staff, &DashboardQuery::default())
            .await
            .unwrap();
        let ids: Vec<_> = feed.items.iter().map(|i| i.id).collect();
        assert!(ids.contains(&public.id));
        assert!(ids.contains(&private_assigned.id));
        assert!(!ids.contains(&private_hidden.id));

        let feed = fetch(&f.db, &f.admin, &DashboardQuery::default())
            .await
            .unwrap();
        assert_eq!(feed.total_items, 3);
    }

    #[tokio::test]
    async fn kind_and_status_filters_narrow_the_feed() {
        let f = setup().await;
        let admin_id = f.admin.id;

        let project = make_item(
            &f,
            WorkItemKind::Project,
            "Umbrella",
            None,
            false,
            vec![admin_id],
            StatusName::Backlog,
            10,
        )
        .await;
        make_item(
            &f,
            WorkItemKind::Task,
            "Inside",
            Some(project.id),
            false,
            vec![admin_id],
            StatusName::InProgress,
            5,
        )
        .await;

        let query = DashboardQuery {
            task_types: Some(vec![WorkItemKind::Task]),
            ..Default::default()
        };
        let feed = fetch(&f.db, &f.admin, &query).await.unwrap();
        assert_eq!(feed.total_items, 1);
        assert_eq!(feed.items[0].kind, WorkItemKind::Task);

        let in_progress = Status::find_by_name(&f.db, StatusName::InProgress)
            .await
            .unwrap()
            .unwrap();
        let query = DashboardQuery {
            status_ids: Some(vec![in_progress.id]),
            ..Default::default()
        };
        let feed = fetch(&f.db, &f.admin, &query).await.unwrap();
        assert_eq!(feed.total_items, 1);
        assert_eq!(feed.items[0].name, "Inside");
    }

    #[tokio::test]
    async fn overdue_excludes_done_items_and_sorting_is_whitelisted() {
        let f = setup().await;
        let admin_id = f.admin.id;

        let late = make_item(
            &f,
            WorkItemKind::Project,
            "Late",
            None,
            false,
            vec![admin_id],
            StatusName::InProgress,
            -3,
        )
        .await;
        make_item(
            &f,
            WorkItemKind::Project,
            "Late but done",
            None,
            false,
            vec![admin_id],
            StatusName::Done,
            -3,
        )
        .await;
        make_item(
            &f,
            WorkItemKind::Project,
            "On time",
            None,
            false,
            vec![admin_id],
            StatusName::Backlog,
            3,
        )
        .await;

        let query = DashboardQuery {
            overdue: Some(true),
            ..Default::default()
        };
        let feed = fetch(&f.db, &f.admin, &query).await.unwrap();
        assert_eq!(feed.total_items, 1);
        assert_eq!(feed.items[0].id, late.id);

        // Unknown sort field falls back instead of erroring.
        let query = DashboardQuery {
            sort_by: Some("slug; drop table".to_string()),
            sort_direction: Some("desc".to_string()),
            ..Default::default()
        };
        let feed = fetch(&f.db, &f.admin, &query).await.unwrap();
        assert_eq!(feed.total_items, 3);
        assert!(feed.items[0].due_date >= feed.items[1].due_date);
    }

    #[test]
    fn comma_separated_lists_parse() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let query: DashboardQuery = serde_json::from_value(serde_json::json!({
            "status_ids": format!("{a},{b}"),
            "task_types": "project,sub_task",
        }))
        .unwrap();
        assert_eq!(query.status_ids, Some(vec![a, b]));
        assert_eq!(
            query.task_types,
            Some(vec![WorkItemKind::Project, WorkItemKind::SubTask])
        );
    }
}
