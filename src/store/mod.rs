use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::{AttendanceRecord, NewAttendance};

pub mod memory;
pub mod mysql;

pub use memory::InMemoryAttendanceStore;
pub use mysql::MySqlAttendanceStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt attendance row {id}: {reason}")]
    Corrupt { id: u64, reason: String },
}

/// Filter, ordering and window for a listing. Results are always ordered
/// by `date` descending, then `id` descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub employee_id: Option<u64>,
    /// Inclusive
    pub start_date: Option<NaiveDate>,
    /// Inclusive
    pub end_date: Option<NaiveDate>,
    pub offset: u64,
    pub limit: u64,
}

impl RecordQuery {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.employee_id.is_none_or(|id| record.employee_id == id)
            && self.start_date.is_none_or(|start| record.date >= start)
            && self.end_date.is_none_or(|end| record.date <= end)
    }
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert if no record exists for `(employee_id, date)`. A clash must
    /// surface as [`StoreError::UniqueViolation`], atomically.
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn find_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Overwrite the whole record. Last writer wins. Returns `false` when
    /// the record no longer exists.
    async fn save(&self, record: &AttendanceRecord) -> Result<bool, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;

    /// One page of matching records plus the total match count.
    async fn find(&self, query: &RecordQuery) -> Result<(Vec<AttendanceRecord>, u64), StoreError>;
}
