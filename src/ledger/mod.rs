//! Daily attendance ledger: punch-in/punch-out, derived hours, manual
//! edits with an audit trail, and deletion.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::attendance::{
    AttendanceRecord, Coordinates, EditEntry, MAX_NOTES_LEN, MAX_TOTAL_HOURS, NewAttendance,
    PunchIn, PunchOut,
};
use crate::model::role::Role;
use crate::notify::{self, AdminEvent, AdminNotifier};
use crate::store::{AttendanceStore, RecordQuery, StoreError};

pub mod clock;
mod error;

pub use clock::{Clock, SystemClock};
pub use error::LedgerError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
const NO_REASON: &str = "No reason provided";

/// Who is calling, as resolved by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub role: Role,
}

impl Actor {
    pub fn employee(id: u64) -> Self {
        Self { id, role: Role::Employee }
    }

    pub fn admin(id: u64) -> Self {
        Self { id, role: Role::Admin }
    }

    fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    fn owns(&self, record: &AttendanceRecord) -> bool {
        record.employee_id == self.id
    }
}

/// Manual edit. Only the fields that are present get applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2026-01-05T09:00:00Z", format = "date-time", value_type = String, nullable = true)]
    pub punch_in_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2026-01-05T17:30:00Z", format = "date-time", value_type = String, nullable = true)]
    pub punch_out_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 7, nullable = true)]
    pub punch_in_plant: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 7, nullable = true)]
    pub punch_out_plant: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "worked late", nullable = true)]
    pub notes: Option<String>,

    /// Required when an employee edits their own record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Forgot to punch out", nullable = true)]
    pub reason: Option<String>,
}

impl AttendancePatch {
    /// The patch as sent, for the edit history.
    pub fn changes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn apply_to(&self, record: &mut AttendanceRecord) {
        if let Some(time) = self.punch_in_time {
            record.punch_in.time = time;
        }
        if let Some(plant) = self.punch_in_plant {
            record.punch_in.plant_id = plant;
        }
        if let Some(time) = self.punch_out_time {
            record.punch_out.time = Some(time);
        }
        if let Some(plant) = self.punch_out_plant {
            record.punch_out.plant_id = Some(plant);
        }
        if let Some(notes) = &self.notes {
            record.notes = Some(notes.clone());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub employee_id: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
    pub total: u64,
}

pub struct AttendanceLedger {
    store: Arc<dyn AttendanceStore>,
    notifier: Arc<dyn AdminNotifier>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl AttendanceLedger {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        notifier: Arc<dyn AdminNotifier>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self { store, notifier, clock, offset }
    }

    /// Calendar day of `now` in the ledger's reference offset.
    pub fn day_of(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    #[instrument(skip_all, fields(employee_id = actor.id))]
    pub async fn punch_in(
        &self,
        actor: &Actor,
        plant_id: Option<u64>,
        coordinates: Option<Coordinates>,
    ) -> Result<AttendanceRecord, LedgerError> {
        let plant_id = require_plant(plant_id)?;
        check_coordinates(coordinates)?;

        let now = self.clock.now();
        let new = NewAttendance {
            employee_id: actor.id,
            date: self.day_of(now),
            punch_in: PunchIn { time: now, plant_id, coordinates },
            created_at: now,
        };

        match self.store.insert(new).await {
            Ok(record) => {
                info!(record_id = record.id, plant_id, "Punched in");
                Ok(record)
            }
            Err(StoreError::UniqueViolation) => {
                Err(LedgerError::Duplicate("Already punched in for today".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(employee_id = actor.id))]
    pub async fn punch_out(
        &self,
        actor: &Actor,
        plant_id: Option<u64>,
        coordinates: Option<Coordinates>,
    ) -> Result<AttendanceRecord, LedgerError> {
        let plant_id = require_plant(plant_id)?;
        check_coordinates(coordinates)?;

        let now = self.clock.now();
        let mut record = self
            .store
            .find_for_day(actor.id, self.day_of(now))
            .await?
            .ok_or_else(|| LedgerError::NotFound("No punch-in found for today".into()))?;

        if record.is_punched_out() {
            return Err(LedgerError::Duplicate("Already punched out for today".into()));
        }

        record.punch_out = PunchOut { time: Some(now), plant_id: Some(plant_id), coordinates };
        self.persist(&mut record, now).await?;

        info!(record_id = record.id, total_hours = record.total_hours, "Punched out");
        Ok(record)
    }

    /// Employees only ever see their own records; date bounds are not
    /// applied here (see [`Self::list_all`]).
    pub async fn list_records(
        &self,
        actor: &Actor,
        filter: &ListFilter,
    ) -> Result<Page<AttendanceRecord>, LedgerError> {
        let employee_id = match actor.role {
            Role::Employee => Some(actor.id),
            Role::Admin => filter.employee_id,
        };

        self.page(
            RecordQuery { employee_id, ..Default::default() },
            filter,
        )
        .await
    }

    /// Admin-only listing across all employees with an inclusive date range.
    pub async fn list_all(
        &self,
        actor: &Actor,
        filter: &ListFilter,
    ) -> Result<Page<AttendanceRecord>, LedgerError> {
        if !actor.role.is_admin() {
            return Err(LedgerError::Forbidden("Admin only".into()));
        }

        self.page(
            RecordQuery {
                start_date: filter.start_date,
                end_date: filter.end_date,
                ..Default::default()
            },
            filter,
        )
        .await
    }

    pub async fn get_record(&self, actor: &Actor, id: u64) -> Result<AttendanceRecord, LedgerError> {
        let record = self.fetch(id).await?;
        authorize(actor, &record, "Not authorized to view this record")?;
        Ok(record)
    }

    #[instrument(skip_all, fields(actor_id = actor.id, record_id = id))]
    pub async fn update_record(
        &self,
        actor: &Actor,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<AttendanceRecord, LedgerError> {
        let mut record = self.fetch(id).await?;
        authorize(actor, &record, "Not authorized to update this record")?;
        let reason = resolve_reason(actor, patch.reason.as_deref())?;

        let now = self.clock.now();
        let changes = patch.changes();
        patch.apply_to(&mut record);

        record.is_edited = true;
        record.edit_history.push(EditEntry {
            edited_by: actor.id,
            edited_at: now,
            changes: changes.clone(),
            reason: reason.clone(),
        });

        self.persist(&mut record, now).await?;
        info!(edits = record.edit_history.len(), "Attendance updated");

        if actor.is_employee() {
            notify::dispatch(
                self.notifier.clone(),
                AdminEvent::AttendanceUpdated {
                    event_id: Uuid::new_v4(),
                    record_id: record.id,
                    employee_id: record.employee_id,
                    date: record.date,
                    changes,
                    reason,
                    occurred_at: now,
                },
            );
        }

        Ok(record)
    }

    #[instrument(skip_all, fields(actor_id = actor.id, record_id = id))]
    pub async fn delete_record(
        &self,
        actor: &Actor,
        id: u64,
        reason: Option<&str>,
    ) -> Result<(), LedgerError> {
        let record = self.fetch(id).await?;
        authorize(actor, &record, "Not authorized to delete this record")?;
        let reason = resolve_reason(actor, reason)?;

        if !self.store.delete(id).await? {
            return Err(LedgerError::not_found());
        }
        info!(employee_id = record.employee_id, date = %record.date, "Attendance deleted");

        if actor.is_employee() {
            notify::dispatch(
                self.notifier.clone(),
                AdminEvent::AttendanceDeleted {
                    event_id: Uuid::new_v4(),
                    record_id: record.id,
                    employee_id: record.employee_id,
                    date: record.date,
                    reason,
                    occurred_at: self.clock.now(),
                },
            );
        }

        Ok(())
    }

    async fn fetch(&self, id: u64) -> Result<AttendanceRecord, LedgerError> {
        self.store.find_by_id(id).await?.ok_or_else(LedgerError::not_found)
    }

    /// Recompute derived fields, check invariants, write the whole record.
    async fn persist(&self, record: &mut AttendanceRecord, now: DateTime<Utc>) -> Result<(), LedgerError> {
        record.refresh_derived();
        validate(record, now)?;
        record.updated_at = now;
        if !self.store.save(record).await? {
            return Err(LedgerError::not_found());
        }
        Ok(())
    }

    async fn page(
        &self,
        mut query: RecordQuery,
        filter: &ListFilter,
    ) -> Result<Page<AttendanceRecord>, LedgerError> {
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        query.offset = (page - 1).saturating_mul(limit);
        query.limit = limit;

        let (data, total) = self.store.find(&query).await?;
        Ok(Page { data, page, limit, pages: total.div_ceil(limit), total })
    }
}

fn require_plant(plant_id: Option<u64>) -> Result<u64, LedgerError> {
    plant_id.ok_or_else(|| LedgerError::validation("Plant ID is required"))
}

fn check_coordinates(coordinates: Option<Coordinates>) -> Result<(), LedgerError> {
    match coordinates {
        Some(c) if !c.is_valid() => Err(LedgerError::validation("Coordinates out of range")),
        _ => Ok(()),
    }
}

fn authorize(actor: &Actor, record: &AttendanceRecord, msg: &str) -> Result<(), LedgerError> {
    if actor.is_employee() && !actor.owns(record) {
        warn!(actor_id = actor.id, record_id = record.id, "Rejected access to foreign record");
        return Err(LedgerError::Forbidden(msg.into()));
    }
    Ok(())
}

fn resolve_reason(actor: &Actor, reason: Option<&str>) -> Result<String, LedgerError> {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => Ok(r.to_string()),
        None if actor.is_employee() => Err(LedgerError::validation(
            "A reason is required when changing your own attendance",
        )),
        None => Ok(NO_REASON.to_string()),
    }
}

fn validate(record: &AttendanceRecord, now: DateTime<Utc>) -> Result<(), LedgerError> {
    if record.punch_in.time > now {
        return Err(LedgerError::validation("Punch-in time cannot be in future"));
    }
    if let Some(out) = record.punch_out.time {
        if out <= record.punch_in.time || out > now {
            return Err(LedgerError::validation(
                "Punch-out must be after punch-in and cannot be in future",
            ));
        }
    }
    if record.total_hours > MAX_TOTAL_HOURS {
        return Err(LedgerError::validation("Total hours cannot exceed 24"));
    }
    if record.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(LedgerError::validation("Notes cannot exceed 500 characters"));
    }
    Ok(())
}
