use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::auth::jwt::generate_access_token;
use crate::ledger::AttendanceLedger;
use crate::ledger::clock::ManualClock;
use crate::model::role::Role;
use crate::notify::{AdminEvent, AdminNotifier};
use crate::store::InMemoryAttendanceStore;

pub const TEST_SECRET: &str = "test-secret";

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<AdminEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<AdminEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminNotifier for RecordingNotifier {
    async fn notify(&self, event: &AdminEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl AdminNotifier for FailingNotifier {
    async fn notify(&self, _event: &AdminEvent) -> anyhow::Result<()> {
        Err(anyhow!("mail relay unreachable"))
    }
}

/// 2026-01-05 is a Monday.
pub fn monday_at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, hour, min, 0).unwrap()
}

pub struct Harness {
    pub ledger: AttendanceLedger,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(monday_at(9, 0)));
    let notifier = Arc::new(RecordingNotifier::default());
    let ledger = AttendanceLedger::new(
        Arc::new(InMemoryAttendanceStore::new()),
        notifier.clone(),
        clock.clone(),
        FixedOffset::east_opt(0).unwrap(),
    );
    Harness { ledger, clock, notifier }
}

pub fn ledger_with_notifier(notifier: Arc<dyn AdminNotifier>, clock: Arc<ManualClock>) -> AttendanceLedger {
    AttendanceLedger::new(
        Arc::new(InMemoryAttendanceStore::new()),
        notifier,
        clock,
        FixedOffset::east_opt(0).unwrap(),
    )
}

pub fn bearer(user_id: u64, role: Role) -> String {
    format!(
        "Bearer {}",
        generate_access_token(user_id, format!("user{user_id}"), role, TEST_SECRET, 900)
    )
}

/// Let detached notification tasks run.
pub async fn settle() {
    actix_web::rt::time::sleep(StdDuration::from_millis(20)).await;
}
