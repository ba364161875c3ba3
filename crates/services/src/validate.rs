//! Field-level request validation. Produces either a validated payload or a
//! field-keyed rejection; nothing is persisted on failure. Reference checks
//! (status, priority, users, parent) count as validation errors rather than
//! server faults.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use db::{
    ConnectionTrait, DbErr,
    models::{ids, work_item::CreateWorkItem},
    types::WorkItemKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub const NAME_MAX_LEN: usize = 255;
pub const COMMENT_MIN_LEN: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, Error)]
#[error("The given data was invalid")]
pub struct ValidationErrors {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Raw create/edit request body for any work-item kind.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct WorkItemPayload {
    pub parent_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[ts(type = "Date | null")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    pub status_id: Option<Uuid>,
    pub priority_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
    pub is_private: Option<bool>,
    pub assignees: Option<Vec<Uuid>>,
    pub viewers: Option<Vec<Uuid>>,
}

pub async fn validate_work_item<C: ConnectionTrait>(
    db: &C,
    kind: WorkItemKind,
    payload: &WorkItemPayload,
) -> Result<CreateWorkItem, ValidateError> {
    let mut errors = ValidationErrors::default();
    let label = kind.display_name();

    if kind.parent_kind().is_some() {
        match payload.parent_id {
            None => errors.add(
                "parent_id",
                format!("{} is required.", parent_label(kind)),
            ),
            Some(parent_id) => {
                if ids::work_item_id_by_uuid(db, parent_id).await?.is_none() {
                    errors.add(
                        "parent_id",
                        format!("Selected {} does not exist.", parent_label(kind).to_lowercase()),
                    );
                }
            }
        }
    }

    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        errors.add("name", format!("{label} name is required."));
    } else if name.len() > NAME_MAX_LEN {
        errors.add(
            "name",
            format!("{label} name may not be greater than {NAME_MAX_LEN} characters."),
        );
    }

    if payload.start_date.is_none() {
        errors.add("start_date", "Start date is required.");
    }
    match (payload.start_date, payload.due_date) {
        (_, None) => errors.add("due_date", "Due date is required."),
        (Some(start), Some(due)) if due < start => {
            errors.add(
                "due_date",
                "Due date must be after or equal to the start date.",
            );
        }
        _ => {}
    }

    match payload.status_id {
        None => errors.add("status_id", format!("{label} status is required.")),
        Some(status_id) => {
            if ids::status_id_by_uuid(db, status_id).await?.is_none() {
                errors.add("status_id", "Selected status does not exist.");
            }
        }
    }

    match payload.priority_id {
        None => errors.add("priority_id", "Priority is required."),
        Some(priority_id) => {
            if ids::priority_id_by_uuid(db, priority_id).await?.is_none() {
                errors.add("priority_id", "Selected priority does not exist.");
            }
        }
    }

    match payload.supervisor_id {
        None => errors.add("supervisor_id", "Supervisor is required."),
        Some(supervisor_id) => {
            if ids::user_id_by_uuid(db, supervisor_id).await?.is_none() {
                errors.add("supervisor_id", "Selected supervisor does not exist.");
            }
        }
    }

    let assignees = payload.assignees.clone().unwrap_or_default();
    if assignees.is_empty() {
        errors.add("assignees", "Please assign at least one user.");
    } else {
        for assignee in &assignees {
            if ids::user_id_by_uuid(db, *assignee).await?.is_none() {
                errors.add("assignees", "One or more selected assignees are invalid.");
                break;
            }
        }
    }

    let is_private = payload.is_private.unwrap_or(false);
    let viewers = payload.viewers.clone().unwrap_or_default();
    if !viewers.is_empty() && !is_private {
        errors.add(
            "viewers",
            format!(
                "Viewers can only be set if the {} is private.",
                label.to_lowercase()
            ),
        );
    } else {
        for viewer in &viewers {
            if ids::user_id_by_uuid(db, *viewer).await?.is_none() {
                errors.add("viewers", "One or more selected viewers are invalid.");
                break;
            }
        }
    }

    // Any missing required field already added its error above, so the
    // all-Some arm is the only one reachable with an empty error map.
    match (
        payload.start_date,
        payload.due_date,
        payload.status_id,
        payload.priority_id,
        payload.supervisor_id,
    ) {
        (Some(start_date), Some(due_date), Some(status_id), Some(priority_id), Some(supervisor_id))
            if errors.is_empty() =>
        {
            Ok(CreateWorkItem {
                parent_id: payload.parent_id,
                name: name.to_string(),
                description: payload
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                start_date,
                due_date,
                status_id,
                priority_id,
                supervisor_id,
                is_private,
                assignees,
                viewers,
            })
        }
        _ => Err(errors.into()),
    }
}

pub fn validate_comment(content: Option<&str>) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let content = content.map(str::trim).unwrap_or_default();

    if content.is_empty() {
        errors.add("content", "Please provide a comment. It cannot be empty.");
    } else if content.len() < COMMENT_MIN_LEN {
        errors.add(
            "content",
            format!("The comment must be at least {COMMENT_MIN_LEN} characters long."),
        );
    }

    errors.into_result()?;
    Ok(content.to_string())
}

fn parent_label(kind: WorkItemKind) -> &'static str {
    match kind.parent_kind() {
        Some(parent) => parent.display_name(),
        None => "Parent",
    }
}
