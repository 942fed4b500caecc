use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_TOTAL_HOURS: f64 = 24.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    /// Never derived; kept for records imported with it.
    Late,
    HalfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchIn {
    #[schema(example = "2026-01-05T09:00:00Z", format = "date-time", value_type = String)]
    pub time: DateTime<Utc>,
    #[schema(example = 7)]
    pub plant_id: u64,
    #[schema(nullable = true)]
    pub coordinates: Option<Coordinates>,
}

/// Every field stays empty until the employee punches out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchOut {
    #[schema(example = "2026-01-05T17:30:00Z", format = "date-time", value_type = String, nullable = true)]
    pub time: Option<DateTime<Utc>>,
    #[schema(example = 7, nullable = true)]
    pub plant_id: Option<u64>,
    #[schema(nullable = true)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditEntry {
    #[schema(example = 1)]
    pub edited_by: u64,
    #[schema(example = "2026-01-06T08:15:00Z", format = "date-time", value_type = String)]
    pub edited_at: DateTime<Utc>,
    /// Fields exactly as the editor sent them. Not a diff.
    #[schema(value_type = Object)]
    pub changes: Map<String, Value>,
    #[schema(example = "Forgot to punch out")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "employeeId": 1000,
    "date": "2026-01-05",
    "punchIn": { "time": "2026-01-05T09:00:00Z", "plantId": 7, "coordinates": null },
    "punchOut": { "time": "2026-01-05T17:30:00Z", "plantId": 7, "coordinates": null },
    "totalHours": 8.5,
    "status": "present",
    "notes": null,
    "isEdited": false,
    "editHistory": [],
    "createdAt": "2026-01-05T09:00:00Z",
    "updatedAt": "2026-01-05T17:30:00Z"
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub punch_in: PunchIn,
    pub punch_out: PunchOut,
    pub total_hours: f64,
    pub status: AttendanceStatus,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    pub is_edited: bool,
    pub edit_history: Vec<EditEntry>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_punched_out(&self) -> bool {
        self.punch_out.time.is_some()
    }

    /// Recompute `total_hours` and `status` from the punch times.
    pub fn refresh_derived(&mut self) {
        let (hours, status) = derive_hours_and_status(self.punch_in.time, self.punch_out.time);
        self.total_hours = hours;
        self.status = status;
    }
}

/// Row shape handed to a store on punch-in; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub punch_in: PunchIn,
    pub created_at: DateTime<Utc>,
}

impl NewAttendance {
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        let mut record = AttendanceRecord {
            id,
            employee_id: self.employee_id,
            date: self.date,
            punch_in: self.punch_in,
            punch_out: PunchOut::default(),
            total_hours: 0.0,
            status: AttendanceStatus::Present,
            notes: None,
            is_edited: false,
            edit_history: Vec::new(),
            created_at: self.created_at,
            updated_at: self.created_at,
        };
        record.refresh_derived();
        record
    }
}

/// Total hours rounded to two decimals, and the status they imply.
///
/// Without a punch-out after the punch-in the employee counts as still
/// working: zero hours, `present`.
pub fn derive_hours_and_status(
    punch_in: DateTime<Utc>,
    punch_out: Option<DateTime<Utc>>,
) -> (f64, AttendanceStatus) {
    match punch_out {
        Some(out) if out > punch_in => {
            let millis = (out - punch_in).num_milliseconds() as f64;
            let hours = (millis / 3_600_000.0 * 100.0).round() / 100.0;
            let status = if hours >= 8.0 {
                AttendanceStatus::Present
            } else if hours >= 4.0 {
                AttendanceStatus::HalfDay
            } else {
                AttendanceStatus::Absent
            };
            (hours, status)
        }
        _ => (0.0, AttendanceStatus::Present),
    }
}
