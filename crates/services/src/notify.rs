//! Notification dispatch. Mutations enqueue outbox rows inside their
//! transaction; this module drains the outbox after commit and hands each
//! message to a mailer. Delivery is at-least-once and never blocks or rolls
//! back the request that queued it.

use async_trait::async_trait;
use db::{
    DatabaseConnection, DbErr,
    entities::notification_outbox,
    events::NotificationPayload,
    models::notification_outbox::NotificationOutbox,
    types::NotificationKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub kind: NotificationKind,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
}

/// Mail transport seam. The real delivery mechanism lives outside this
/// system; the default implementation records the send in the log stream.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> anyhow::Result<()>;
}

pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, message: &NotificationMessage) -> anyhow::Result<()> {
        tracing::info!(
            recipient = %message.recipient_email,
            kind = %message.kind,
            subject = %message.subject,
            "Dispatching notification email"
        );
        Ok(())
    }
}

/// Drain one batch of unpublished notifications. Failures are recorded on the
/// row (attempts + last error) and retried on the next pass.
pub async fn dispatch_pending(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    batch_size: u64,
) -> Result<u64, DbErr> {
    let pending = NotificationOutbox::fetch_unpublished(db, batch_size).await?;
    let mut sent = 0;

    for row in pending {
        let message = build_message(&row);
        match mailer.send(&message).await {
            Ok(()) => {
                NotificationOutbox::mark_published(db, row.id).await?;
                sent += 1;
            }
            Err(err) => {
                tracing::warn!(
                    notification = %row.uuid,
                    error = %err,
                    "Failed to dispatch notification"
                );
                NotificationOutbox::mark_failed(db, row.id, &err.to_string()).await?;
            }
        }
    }

    Ok(sent)
}

pub fn build_message(row: &notification_outbox::Model) -> NotificationMessage {
    let payload: NotificationPayload =
        serde_json::from_value(row.payload.clone()).unwrap_or(NotificationPayload {
            item_kind: db::types::WorkItemKind::Project,
            slug: String::new(),
            name: String::new(),
        });
    let kind_label = payload.item_kind.display_name().to_lowercase();

    let (subject, body) = match row.kind {
        NotificationKind::Assigned => (
            format!("You have been assigned a {kind_label}"),
            format!(
                "You have been assigned to {} ({}).",
                payload.name, payload.slug
            ),
        ),
        NotificationKind::ViewerAssigned => (
            format!("You have been added as a viewer to a {kind_label}"),
            format!(
                "You have been added as a viewer on {} ({}).",
                payload.name, payload.slug
            ),
        ),
        NotificationKind::InReview => (
            format!(
                "{} Status Updated to In Review",
                payload.item_kind.display_name()
            ),
            format!(
                "The {kind_label} {} ({}) has been moved to In Review. Please review it at your earliest convenience.",
                payload.name, payload.slug
            ),
        ),
    };

    NotificationMessage {
        kind: row.kind,
        recipient_email: row.recipient_email.clone(),
        subject,
        body,
    }
}
