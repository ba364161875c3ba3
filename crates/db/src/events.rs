use serde::{Deserialize, Serialize};

use crate::types::WorkItemKind;

pub const EVENT_CREATED: &str = "created";
pub const EVENT_UPDATED: &str = "updated";
pub const EVENT_DELETED: &str = "deleted";

pub const EVENT_ASSIGNEE_ADDED: &str = "assignee added";
pub const EVENT_ASSIGNEE_REMOVED: &str = "assignee removed";
pub const EVENT_VIEWER_ADDED: &str = "viewer added";
pub const EVENT_VIEWER_REMOVED: &str = "viewer removed";

pub const SUBJECT_COMMENT: &str = "comment";
pub const SUBJECT_USER: &str = "user";

/// Payload stored alongside a notification outbox row; everything the mail
/// template needs without re-reading the work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub item_kind: WorkItemKind,
    pub slug: String,
    pub name: String,
}
