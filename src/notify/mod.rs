use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};
use uuid::Uuid;

mod webhook;

pub use webhook::WebhookNotifier;

/// Events an administrator is told about when an employee touches their
/// own attendance.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum AdminEvent {
    #[serde(rename = "attendance.updated")]
    AttendanceUpdated {
        event_id: Uuid,
        record_id: u64,
        employee_id: u64,
        date: NaiveDate,
        changes: Map<String, Value>,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    #[serde(rename = "attendance.deleted")]
    AttendanceDeleted {
        event_id: Uuid,
        record_id: u64,
        employee_id: u64,
        date: NaiveDate,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl AdminEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AdminEvent::AttendanceUpdated { .. } => "attendance.updated",
            AdminEvent::AttendanceDeleted { .. } => "attendance.deleted",
        }
    }
}

#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, event: &AdminEvent) -> anyhow::Result<()>;
}

/// Writes events to the application log only.
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify(&self, event: &AdminEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        info!(event = event.name(), %payload, "Admin notification");
        Ok(())
    }
}

/// Fire-and-forget delivery. Failures are logged and never reach the caller.
pub fn dispatch(notifier: Arc<dyn AdminNotifier>, event: AdminEvent) {
    actix_web::rt::spawn(async move {
        if let Err(e) = notifier.notify(&event).await {
            error!(error = %e, event = event.name(), "Failed to notify admin");
        }
    });
}
