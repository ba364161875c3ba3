//! Status workflow. Transitions are unconstrained between the five statuses
//! except for the Done gate and the In Review notification side effect.

use db::{
    DatabaseConnection, DbErr, TransactionTrait,
    models::{
        status::Status,
        user::User,
        work_item::{WorkItem, WorkItemError},
    },
    types::StatusName,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{policy, validate::ValidationErrors};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    WorkItem(#[from] WorkItemError),
    #[error("This action is unauthorized.")]
    Forbidden,
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

/// Authorize and persist a status change.
///
/// Order matters: the policy checks run before anything is written, and the
/// Done gate runs before the transition is persisted. The persistence step and
/// its In Review notification share one transaction.
pub async fn change_status(
    db: &DatabaseConnection,
    acting: &User,
    item_id: Uuid,
    status_id: Uuid,
) -> Result<WorkItem, WorkflowError> {
    let item = WorkItem::find_by_id(db, item_id)
        .await?
        .ok_or(WorkItemError::NotFound)?;
    let membership = WorkItem::membership(db, item_id).await?;

    if !policy::can_update_status(acting, &membership) {
        return Err(WorkflowError::Forbidden);
    }

    let target = match Status::find_by_id(db, status_id).await? {
        Some(status) => status,
        None => {
            let mut errors = ValidationErrors::default();
            errors.add("status_id", "Selected status does not exist.");
            return Err(errors.into());
        }
    };

    if target.workflow_name() == Some(StatusName::Done)
        && !policy::can_update_status_to_done(acting)
    {
        return Err(WorkflowError::Forbidden);
    }

    let tx = db.begin().await?;
    let (updated, _entered_review) =
        WorkItem::update_status(&tx, item.id, target.id, acting).await?;
    tx.commit().await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use db::{
        models::{
            notification_outbox::NotificationOutbox,
            priority::Priority,
            user::CreateUser,
            work_item::CreateWorkItem,
        },
        types::{NotificationKind, Role, WorkItemKind},
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    struct Fixture {
        db: DatabaseConnection,
        admin: User,
        supervisor: User,
        assignee: User,
        outsider: User,
        item: WorkItem,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let mut users = Vec::new();
        for (name, role) in [
            ("Ada", Role::Admin),
            ("Sam", Role::Supervisor),
            ("Kim", Role::Staff),
            ("Out", Role::Staff),
        ] {
            users.push(
                User::create(
                    &db,
                    &CreateUser {
                        name: name.to_string(),
                        email: Some(format!("{}@example.com", name.to_lowercase())),
                        password_hash: None,
                        role,
                    },
                    Uuid::new_v4(),
                )
                .await
                .unwrap(),
            );
        }
        let outsider = users.pop().unwrap();
        let assignee = users.pop().unwrap();
        let supervisor = users.pop().unwrap();
        let admin = users.pop().unwrap();

        let status = Status::find_by_name(&db, StatusName::Backlog)
            .await
            .unwrap()
            .unwrap();
        let priority = Priority::find_all(&db).await.unwrap().remove(0);
        let start = Utc::now();
        let item = WorkItem::create(
            &db,
            WorkItemKind::Task,
            &CreateWorkItem {
                parent_id: Some(make_project(&db, &admin).await),
                name: "Ship it".to_string(),
                description: None,
                start_date: start,
                due_date: start + Duration::days(5),
                status_id: status.id,
                priority_id: priority.id,
                supervisor_id: supervisor.id,
                is_private: false,
                assignees: vec![assignee.id],
                viewers: Vec::new(),
            },
            Uuid::new_v4(),
            &admin,
        )
        .await
        .unwrap();

        for entry in NotificationOutbox::fetch_unpublished(&db, 10).await.unwrap() {
            NotificationOutbox::mark_published(&db, entry.id)
                .await
                .unwrap();
        }

        Fixture {
            db,
            admin,
            supervisor,
            assignee,
            outsider,
            item,
        }
    }

    async fn make_project(db: &DatabaseConnection, admin: &User) -> Uuid {
        let status = Status::find_by_name(db, StatusName::Backlog)
            .await
            .unwrap()
            .unwrap();
        let priority = Priority::find_all(db).await.unwrap().remove(0);
        let start = Utc::now();
        WorkItem::create(
            db,
            WorkItemKind::Project,
            &CreateWorkItem {
                parent_id: None,
                name: "Umbrella".to_string(),
                description: None,
                start_date: start,
                due_date: start + Duration::days(30),
                status_id: status.id,
                priority_id: priority.id,
                supervisor_id: admin.id,
                is_private: false,
                assignees: vec![admin.id],
                viewers: Vec::new(),
            },
            Uuid::new_v4(),
            admin,
        )
        .await
        .unwrap()
        .id
    }

    async fn status_id(db: &DatabaseConnection, name: StatusName) -> Uuid {
        Status::find_by_name(db, name).await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn non_member_staff_cannot_change_status() {
        let f = setup().await;
        let in_progress = status_id(&f.db, StatusName::InProgress).await;

        let err = change_status(&f.db, &f.outsider, f.item.id, in_progress)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden));

        let unchanged = WorkItem::find_by_id(&f.db, f.item.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status_id, f.item.status_id);
    }

    #[tokio::test]
    async fn assignee_may_transition_but_not_into_done() {
        let f = setup().await;

        let in_progress = status_id(&f.db, StatusName::InProgress).await;
        let moved = change_status(&f.db, &f.assignee, f.item.id, in_progress)
            .await
            .unwrap();
        assert_eq!(moved.status_id, in_progress);

        let done = status_id(&f.db, StatusName::Done).await;
        let err = change_status(&f.db, &f.assignee, f.item.id, done)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden));

        // Status must not have moved past the rejected gate.
        let still = WorkItem::find_by_id(&f.db, f.item.id).await.unwrap().unwrap();
        assert_eq!(still.status_id, in_progress);

        let finished = change_status(&f.db, &f.admin, f.item.id, done)
            .await
            .unwrap();
        assert_eq!(finished.status_id, done);
    }

    #[tokio::test]
    async fn entering_review_notifies_the_supervisor_once() {
        let f = setup().await;
        let review = status_id(&f.db, StatusName::InReview).await;

        change_status(&f.db, &f.supervisor, f.item.id, review)
            .await
            .unwrap();

        let pending = NotificationOutbox::fetch_unpublished(&f.db, 10)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, NotificationKind::InReview);
        assert_eq!(
            pending[0].recipient_email,
            f.supervisor.email.clone().unwrap()
        );

        // A repeat transition into the same status stays quiet.
        change_status(&f.db, &f.admin, f.item.id, review).await.unwrap();
        let pending = NotificationOutbox::fetch_unpublished(&f.db, 10)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn unknown_status_is_a_validation_error() {
        let f = setup().await;
        let err = change_status(&f.db, &f.admin, f.item.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Invalid(_)));
    }
}
