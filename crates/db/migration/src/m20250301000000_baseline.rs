use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::PasswordHash).string())
                    .col(
                        ColumnDef::new(Users::Oauth)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("staff")),
                    )
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Statuses::Table)
                    .col(pk_id_col(manager, Statuses::Id))
                    .col(uuid_col(Statuses::Uuid))
                    .col(ColumnDef::new(Statuses::Name).string().not_null())
                    .col(ColumnDef::new(Statuses::Color).string().not_null())
                    .col(timestamp_col(Statuses::CreatedAt))
                    .col(timestamp_col(Statuses::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_statuses_name")
                    .table(Statuses::Table)
                    .col(Statuses::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Priorities::Table)
                    .col(pk_id_col(manager, Priorities::Id))
                    .col(uuid_col(Priorities::Uuid))
                    .col(ColumnDef::new(Priorities::Name).string().not_null())
                    .col(ColumnDef::new(Priorities::Color).string().not_null())
                    .col(timestamp_col(Priorities::CreatedAt))
                    .col(timestamp_col(Priorities::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_priorities_name")
                    .table(Priorities::Table)
                    .col(Priorities::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(WorkItems::Table)
                    .col(pk_id_col(manager, WorkItems::Id))
                    .col(uuid_col(WorkItems::Uuid))
                    .col(ColumnDef::new(WorkItems::Kind).string_len(32).not_null())
                    .col(fk_id_nullable_col(manager, WorkItems::ParentId))
                    .col(ColumnDef::new(WorkItems::Slug).string())
                    .col(ColumnDef::new(WorkItems::Name).string().not_null())
                    .col(ColumnDef::new(WorkItems::Description).text())
                    .col(
                        ColumnDef::new(WorkItems::StartDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkItems::DueDate).timestamp().not_null())
                    .col(fk_id_col(manager, WorkItems::StatusId))
                    .col(fk_id_col(manager, WorkItems::PriorityId))
                    .col(
                        ColumnDef::new(WorkItems::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(fk_id_col(manager, WorkItems::CreatedBy))
                    .col(fk_id_col(manager, WorkItems::UpdatedBy))
                    .col(fk_id_col(manager, WorkItems::SupervisorId))
                    .col(ColumnDef::new(WorkItems::DeletedAt).timestamp())
                    .col(timestamp_col(WorkItems::CreatedAt))
                    .col(timestamp_col(WorkItems::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_items_parent_id")
                            .from(WorkItems::Table, WorkItems::ParentId)
                            .to(WorkItems::Table, WorkItems::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_items_status_id")
                            .from(WorkItems::Table, WorkItems::StatusId)
                            .to(Statuses::Table, Statuses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_items_priority_id")
                            .from(WorkItems::Table, WorkItems::PriorityId)
                            .to(Priorities::Table, Priorities::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_items_supervisor_id")
                            .from(WorkItems::Table, WorkItems::SupervisorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_work_items_uuid")
                    .table(WorkItems::Table)
                    .col(WorkItems::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_work_items_slug")
                    .table(WorkItems::Table)
                    .col(WorkItems::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_work_items_kind")
                    .table(WorkItems::Table)
                    .col(WorkItems::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_work_items_parent_id")
                    .table(WorkItems::Table)
                    .col(WorkItems::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(WorkItemAssignees::Table)
                    .col(pk_id_col(manager, WorkItemAssignees::Id))
                    .col(fk_id_col(manager, WorkItemAssignees::WorkItemId))
                    .col(fk_id_col(manager, WorkItemAssignees::UserId))
                    .col(timestamp_col(WorkItemAssignees::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_item_assignees_work_item_id")
                            .from(WorkItemAssignees::Table, WorkItemAssignees::WorkItemId)
                            .to(WorkItems::Table, WorkItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_item_assignees_user_id")
                            .from(WorkItemAssignees::Table, WorkItemAssignees::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_work_item_assignees_unique_pair")
                    .table(WorkItemAssignees::Table)
                    .col(WorkItemAssignees::WorkItemId)
                    .col(WorkItemAssignees::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(WorkItemViewers::Table)
                    .col(pk_id_col(manager, WorkItemViewers::Id))
                    .col(fk_id_col(manager, WorkItemViewers::WorkItemId))
                    .col(fk_id_col(manager, WorkItemViewers::UserId))
                    .col(timestamp_col(WorkItemViewers::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_item_viewers_work_item_id")
                            .from(WorkItemViewers::Table, WorkItemViewers::WorkItemId)
                            .to(WorkItems::Table, WorkItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_item_viewers_user_id")
                            .from(WorkItemViewers::Table, WorkItemViewers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_work_item_viewers_unique_pair")
                    .table(WorkItemViewers::Table)
                    .col(WorkItemViewers::WorkItemId)
                    .col(WorkItemViewers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Comments::Table)
                    .col(pk_id_col(manager, Comments::Id))
                    .col(uuid_col(Comments::Uuid))
                    .col(fk_id_col(manager, Comments::WorkItemId))
                    .col(fk_id_col(manager, Comments::UserId))
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(timestamp_col(Comments::CreatedAt))
                    .col(timestamp_col(Comments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_work_item_id")
                            .from(Comments::Table, Comments::WorkItemId)
                            .to(WorkItems::Table, WorkItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_user_id")
                            .from(Comments::Table, Comments::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_comments_uuid")
                    .table(Comments::Table)
                    .col(Comments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_comments_work_item_id")
                    .table(Comments::Table)
                    .col(Comments::WorkItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ActivityLog::Table)
                    .col(pk_id_col(manager, ActivityLog::Id))
                    .col(uuid_col(ActivityLog::Uuid))
                    .col(fk_id_col(manager, ActivityLog::CauserId))
                    .col(
                        ColumnDef::new(ActivityLog::SubjectType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(uuid_col(ActivityLog::SubjectUuid))
                    .col(ColumnDef::new(ActivityLog::Event).string_len(64).not_null())
                    .col(ColumnDef::new(ActivityLog::OldValues).json().not_null())
                    .col(ColumnDef::new(ActivityLog::NewValues).json().not_null())
                    .col(timestamp_col(ActivityLog::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_log_causer_id")
                            .from(ActivityLog::Table, ActivityLog::CauserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activity_log_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(NotificationOutbox::Table)
                    .col(pk_id_col(manager, NotificationOutbox::Id))
                    .col(uuid_col(NotificationOutbox::Uuid))
                    .col(
                        ColumnDef::new(NotificationOutbox::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(fk_id_col(manager, NotificationOutbox::RecipientId))
                    .col(
                        ColumnDef::new(NotificationOutbox::RecipientEmail)
                            .string()
                            .not_null(),
                    )
                    .col(fk_id_col(manager, NotificationOutbox::WorkItemId))
                    .col(
                        ColumnDef::new(NotificationOutbox::Payload)
                            .json()
                            .not_null(),
                    )
                    .col(timestamp_col(NotificationOutbox::CreatedAt))
                    .col(ColumnDef::new(NotificationOutbox::PublishedAt).timestamp())
                    .col(
                        ColumnDef::new(NotificationOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(NotificationOutbox::LastError).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_outbox_work_item_id")
                            .from(NotificationOutbox::Table, NotificationOutbox::WorkItemId)
                            .to(WorkItems::Table, WorkItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_notification_outbox_published_at")
                    .table(NotificationOutbox::Table)
                    .col(NotificationOutbox::PublishedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(OauthStatus::Table)
                    .col(pk_id_col(manager, OauthStatus::Id))
                    .col(
                        ColumnDef::new(OauthStatus::Enabled)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(OauthStatus::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        seed_statuses(manager).await?;
        seed_priorities(manager).await?;
        seed_oauth_status(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationOutbox::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActivityLog::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkItemViewers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkItemAssignees::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkItems::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OauthStatus::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Priorities::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Statuses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

/// Fixed status rows; names are load-bearing for the workflow gates.
async fn seed_statuses(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let statuses = [
        ("Backlog", "gray"),
        ("In Progress", "blue"),
        ("On Hold", "gray"),
        ("In Review", "green"),
        ("Done", "green"),
    ];

    for (name, color) in statuses {
        let insert = Query::insert()
            .into_table(Statuses::Table)
            .columns([Statuses::Uuid, Statuses::Name, Statuses::Color])
            .values_panic([
                Uuid::new_v4().into(),
                name.into(),
                color.into(),
            ])
            .to_owned();
        manager.exec_stmt(insert).await?;
    }
    Ok(())
}

async fn seed_priorities(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let priorities = [
        ("Low", "gray"),
        ("Medium", "blue"),
        ("High", "yellow"),
        ("Urgent", "red"),
    ];

    for (name, color) in priorities {
        let insert = Query::insert()
            .into_table(Priorities::Table)
            .columns([Priorities::Uuid, Priorities::Name, Priorities::Color])
            .values_panic([
                Uuid::new_v4().into(),
                name.into(),
                color.into(),
            ])
            .to_owned();
        manager.exec_stmt(insert).await?;
    }
    Ok(())
}

async fn seed_oauth_status(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let insert = Query::insert()
        .into_table(OauthStatus::Table)
        .columns([OauthStatus::Enabled])
        .values_panic([false.into()])
        .to_owned();
    manager.exec_stmt(insert).await
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Name,
    Email,
    PasswordHash,
    Oauth,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Statuses {
    Table,
    Id,
    Uuid,
    Name,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Priorities {
    Table,
    Id,
    Uuid,
    Name,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WorkItems {
    Table,
    Id,
    Uuid,
    Kind,
    ParentId,
    Slug,
    Name,
    Description,
    StartDate,
    DueDate,
    StatusId,
    PriorityId,
    IsPrivate,
    CreatedBy,
    UpdatedBy,
    SupervisorId,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WorkItemAssignees {
    Table,
    Id,
    WorkItemId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum WorkItemViewers {
    Table,
    Id,
    WorkItemId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum Comments {
    Table,
    Id,
    Uuid,
    WorkItemId,
    UserId,
    Content,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ActivityLog {
    Table,
    Id,
    Uuid,
    CauserId,
    SubjectType,
    SubjectUuid,
    Event,
    OldValues,
    NewValues,
    CreatedAt,
}

#[derive(Iden)]
enum NotificationOutbox {
    Table,
    Id,
    Uuid,
    Kind,
    RecipientId,
    RecipientEmail,
    WorkItemId,
    Payload,
    CreatedAt,
    PublishedAt,
    Attempts,
    LastError,
}

#[derive(Iden)]
enum OauthStatus {
    Table,
    Id,
    Enabled,
    UpdatedAt,
}
