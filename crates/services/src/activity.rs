//! Activity-log presentation. Turns stored old/new snapshots into readable
//! lines; never touches the underlying log.

use chrono::{DateTime, Utc};
use db::{
    ConnectionTrait, DbErr,
    events::{
        EVENT_ASSIGNEE_ADDED, EVENT_ASSIGNEE_REMOVED, EVENT_CREATED, EVENT_DELETED,
        EVENT_VIEWER_ADDED, EVENT_VIEWER_REMOVED, SUBJECT_COMMENT, SUBJECT_USER,
    },
    models::{
        Paginated,
        activity_log::{ActivityEntry, ActivityLog, Causer},
        user::User,
        work_item::WorkItem,
    },
};
use chrono_tz::Europe::London;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%d %b, %Y %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FormattedLog {
    pub id: Uuid,
    pub timestamp: String,
    pub causer: Causer,
    pub event: String,
    pub subject: Subject,
    pub old_values: Vec<String>,
    pub new_values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct Subject {
    pub heading: String,
    pub description: String,
}

/// Load a page of entries and format each one. Subjects are resolved here
/// (soft-deleted work items included) so `format_entry` itself stays pure.
pub async fn format_range<C: ConnectionTrait>(
    db: &C,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    page: u64,
    per_page: u64,
) -> Result<Paginated<FormattedLog>, DbErr> {
    let entries = ActivityLog::find_range(db, start, end, page, per_page).await?;

    let mut formatted = Vec::with_capacity(entries.items.len());
    for entry in &entries.items {
        let subject = resolve_subject(db, entry).await?;
        formatted.push(format_entry(entry, subject));
    }

    Ok(Paginated {
        items: formatted,
        page: entries.page,
        per_page: entries.per_page,
        total_items: entries.total_items,
        total_pages: entries.total_pages,
    })
}

async fn resolve_subject<C: ConnectionTrait>(
    db: &C,
    entry: &ActivityEntry,
) -> Result<Option<Subject>, DbErr> {
    if entry.subject_type == SUBJECT_COMMENT {
        // Comments carry their parent's slug and name in the snapshot.
        return Ok(None);
    }

    if entry.subject_type == SUBJECT_USER {
        let Some(user) = User::find_by_id(db, entry.subject_uuid).await? else {
            return Ok(None);
        };
        return Ok(Some(Subject {
            heading: user.name,
            description: user.email.unwrap_or_default(),
        }));
    }

    let Some(item) = WorkItem::find_by_id_including_deleted(db, entry.subject_uuid).await? else {
        return Ok(None);
    };
    Ok(Some(Subject {
        heading: item.slug,
        description: item.name,
    }))
}

/// Pure formatting step; `subject` is the pre-resolved heading/description
/// for non-comment entries.
pub fn format_entry(entry: &ActivityEntry, subject: Option<Subject>) -> FormattedLog {
    FormattedLog {
        id: entry.id,
        timestamp: entry
            .created_at
            .with_timezone(&London)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        causer: entry.causer.clone(),
        event: event_label(entry),
        subject: subject_of(entry).or(subject).unwrap_or_default(),
        old_values: old_value_lines(entry),
        new_values: new_value_lines(entry),
    }
}

fn event_label(entry: &ActivityEntry) -> String {
    if entry.subject_type == SUBJECT_COMMENT && entry.event == EVENT_CREATED {
        return "comment added".to_string();
    }
    if entry.subject_type == SUBJECT_COMMENT && entry.event == EVENT_DELETED {
        return "comment removed".to_string();
    }
    entry.event.clone()
}

fn subject_of(entry: &ActivityEntry) -> Option<Subject> {
    if entry.subject_type != SUBJECT_COMMENT {
        return None;
    }

    let snapshot = if entry.event == EVENT_DELETED {
        &entry.old_values
    } else {
        &entry.new_values
    };
    Some(Subject {
        heading: snapshot
            .get("commentable.slug")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: snapshot
            .get("commentable.name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn new_value_lines(entry: &ActivityEntry) -> Vec<String> {
    if entry.event == EVENT_ASSIGNEE_ADDED {
        return member_lines(&entry.new_values, "assignees", "added assignee");
    }
    if entry.event == EVENT_VIEWER_ADDED {
        return member_lines(&entry.new_values, "viewers", "added viewer");
    }
    if entry.subject_type == SUBJECT_COMMENT {
        if entry.event == EVENT_DELETED {
            return Vec::new();
        }
        let content = entry
            .new_values
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return vec![format!("comment: {content}")];
    }
    attribute_lines(&entry.new_values)
}

fn old_value_lines(entry: &ActivityEntry) -> Vec<String> {
    if entry.event == EVENT_ASSIGNEE_REMOVED {
        return member_lines(&entry.old_values, "assignees", "removed assignee");
    }
    if entry.event == EVENT_VIEWER_REMOVED {
        return member_lines(&entry.old_values, "viewers", "removed viewer");
    }
    if entry.event == EVENT_ASSIGNEE_ADDED || entry.event == EVENT_VIEWER_ADDED {
        return Vec::new();
    }
    if entry.subject_type == SUBJECT_COMMENT {
        if entry.event != EVENT_DELETED {
            return Vec::new();
        }
        let content = entry
            .old_values
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return vec![format!("comment: {content}")];
    }
    attribute_lines(&entry.old_values)
}

fn member_lines(snapshot: &Value, key: &str, verb: &str) -> Vec<String> {
    let Some(members) = snapshot.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    members
        .iter()
        .map(|member| {
            let name = member.get("name").and_then(Value::as_str).unwrap_or_default();
            let email = member
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("{verb}: {name} ({email})")
        })
        .collect()
}

/// One line per changed attribute: dates localized, booleans spelled out,
/// separator characters in keys replaced with spaces.
fn attribute_lines(snapshot: &Value) -> Vec<String> {
    let Some(map) = snapshot.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| {
            let rendered = if key == "start_date" || key == "due_date" {
                render_date(value)
            } else if key == "is_private" {
                match value.as_bool() {
                    Some(true) => "true".to_string(),
                    Some(false) => "false".to_string(),
                    None => render_scalar(value),
                }
            } else {
                render_scalar(value)
            };
            let display_key = key.replace(['.', '_'], " ");
            format!("{display_key}: {rendered}")
        })
        .collect()
}

fn render_date(value: &Value) -> String {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| {
            parsed
                .with_timezone(&London)
                .format(TIMESTAMP_FORMAT)
                .to_string()
        })
        .unwrap_or_else(|| render_scalar(value))
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
