use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "supervisor")]
    Supervisor,
    #[default]
    #[sea_orm(string_value = "staff")]
    Staff,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn is_admin_or_supervisor(self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkItemKind {
    #[sea_orm(string_value = "project")]
    Project,
    #[sea_orm(string_value = "task")]
    Task,
    #[sea_orm(string_value = "sub_task")]
    SubTask,
}

impl WorkItemKind {
    /// Slug prefix, e.g. `PRO-42`.
    pub fn slug_prefix(self) -> &'static str {
        match self {
            WorkItemKind::Project => "PRO",
            WorkItemKind::Task => "TASK",
            WorkItemKind::SubTask => "SUB",
        }
    }

    /// The kind a parent reference must have, if one is required at all.
    pub fn parent_kind(self) -> Option<WorkItemKind> {
        match self {
            WorkItemKind::Project => None,
            WorkItemKind::Task => Some(WorkItemKind::Project),
            WorkItemKind::SubTask => Some(WorkItemKind::Task),
        }
    }

    pub fn child_kind(self) -> Option<WorkItemKind> {
        match self {
            WorkItemKind::Project => Some(WorkItemKind::Task),
            WorkItemKind::Task => Some(WorkItemKind::SubTask),
            WorkItemKind::SubTask => None,
        }
    }

    /// Subject tag used in activity-log rows.
    pub fn subject_type(self) -> &'static str {
        match self {
            WorkItemKind::Project => "project",
            WorkItemKind::Task => "task",
            WorkItemKind::SubTask => "sub_task",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WorkItemKind::Project => "Project",
            WorkItemKind::Task => "Task",
            WorkItemKind::SubTask => "Sub-task",
        }
    }
}

/// The five fixed workflow statuses, by name. Status rows are seeded from
/// this set; the enum exists so workflow gates never compare raw strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
pub enum StatusName {
    #[strum(serialize = "Backlog")]
    Backlog,
    #[strum(serialize = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    #[strum(serialize = "On Hold")]
    #[serde(rename = "On Hold")]
    OnHold,
    #[strum(serialize = "In Review")]
    #[serde(rename = "In Review")]
    InReview,
    #[strum(serialize = "Done")]
    Done,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "viewer_assigned")]
    ViewerAssigned,
    #[sea_orm(string_value = "in_review")]
    InReview,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn role_membership_helpers() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Supervisor.is_admin());
        assert!(Role::Admin.is_admin_or_supervisor());
        assert!(Role::Supervisor.is_admin_or_supervisor());
        assert!(!Role::Staff.is_admin_or_supervisor());
    }

    #[test]
    fn kind_hierarchy_is_three_levels() {
        assert_eq!(WorkItemKind::Project.parent_kind(), None);
        assert_eq!(
            WorkItemKind::Task.parent_kind(),
            Some(WorkItemKind::Project)
        );
        assert_eq!(
            WorkItemKind::SubTask.parent_kind(),
            Some(WorkItemKind::Task)
        );
        assert_eq!(WorkItemKind::SubTask.child_kind(), None);
    }

    #[test]
    fn status_names_round_trip_display_strings() {
        assert_eq!(StatusName::InReview.to_string(), "In Review");
        assert_eq!(
            StatusName::from_str("In Progress").unwrap(),
            StatusName::InProgress
        );
        assert!(StatusName::from_str("Cancelled").is_err());
    }

    #[test]
    fn slug_prefixes_match_per_kind() {
        assert_eq!(WorkItemKind::Project.slug_prefix(), "PRO");
        assert_eq!(WorkItemKind::Task.slug_prefix(), "TASK");
        assert_eq!(WorkItemKind::SubTask.slug_prefix(), "SUB");
    }
}
