use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{AttendanceStore, RecordQuery, StoreError};
use crate::model::attendance::{AttendanceRecord, NewAttendance};

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, AttendanceRecord>,
    /// unique index on (employee_id, date)
    by_day: HashMap<(u64, NaiveDate), u64>,
}

/// Process-local store, used when no database is configured and by tests.
#[derive(Default)]
pub struct InMemoryAttendanceStore {
    inner: Mutex<Inner>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a poisoned map is still structurally sound
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let mut inner = self.lock();
        let key = (new.employee_id, new.date);
        if inner.by_day.contains_key(&key) {
            return Err(StoreError::UniqueViolation);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let record = new.into_record(id);
        inner.by_day.insert(key, id);
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.lock().records.get(&id).cloned())
    }

    async fn find_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .by_day
            .get(&(employee_id, date))
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    async fn save(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        // employee_id and date are immutable, so the day index stays valid
        match inner.records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.records.remove(&id) {
            Some(removed) => {
                inner.by_day.remove(&(removed.employee_id, removed.date));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, query: &RecordQuery) -> Result<(Vec<AttendanceRecord>, u64), StoreError> {
        let inner = self.lock();
        let mut matched: Vec<&AttendanceRecord> =
            inner.records.values().filter(|r| query.matches(r)).collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::PunchIn;
    use chrono::{TimeZone, Utc};

    fn new_attendance(employee_id: u64, day: u32) -> NewAttendance {
        let time = Utc.with_ymd_and_hms(2026, 1, day, 9, 0, 0).unwrap();
        NewAttendance {
            employee_id,
            date: time.date_naive(),
            punch_in: PunchIn { time, plant_id: 1, coordinates: None },
            created_at: time,
        }
    }

    #[actix_web::test]
    async fn unique_per_employee_and_day() {
        let store = InMemoryAttendanceStore::new();
        store.insert(new_attendance(1, 5)).await.unwrap();

        let err = store.insert(new_attendance(1, 5)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));

        // other employee, other day
        store.insert(new_attendance(2, 5)).await.unwrap();
        store.insert(new_attendance(1, 6)).await.unwrap();
    }

    #[actix_web::test]
    async fn save_reports_a_missing_record() {
        let store = InMemoryAttendanceStore::new();
        let mut record = store.insert(new_attendance(1, 5)).await.unwrap();

        record.notes = Some("kept".into());
        assert!(store.save(&record).await.unwrap());
        assert_eq!(store.find_by_id(record.id).await.unwrap(), Some(record.clone()));

        store.delete(record.id).await.unwrap();
        assert!(!store.save(&record).await.unwrap());
        assert!(store.find_by_id(record.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn delete_frees_the_day() {
        let store = InMemoryAttendanceStore::new();
        let record = store.insert(new_attendance(1, 5)).await.unwrap();

        assert!(store.delete(record.id).await.unwrap());
        assert!(!store.delete(record.id).await.unwrap());
        assert!(store.find_for_day(1, record.date).await.unwrap().is_none());

        let again = store.insert(new_attendance(1, 5)).await.unwrap();
        assert_ne!(again.id, record.id);
    }

    #[actix_web::test]
    async fn find_orders_newest_day_first_and_pages() {
        let store = InMemoryAttendanceStore::new();
        for day in [3, 1, 4, 2] {
            store.insert(new_attendance(1, day)).await.unwrap();
        }
        store.insert(new_attendance(2, 9)).await.unwrap();

        let query = RecordQuery { employee_id: Some(1), offset: 1, limit: 2, ..Default::default() };
        let (page, total) = store.find(&query).await.unwrap();

        assert_eq!(total, 4);
        let days: Vec<u32> = page.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(days, vec![3, 2]);
    }

    #[actix_web::test]
    async fn find_date_bounds_are_inclusive() {
        let store = InMemoryAttendanceStore::new();
        for day in 1..=5 {
            store.insert(new_attendance(1, day)).await.unwrap();
        }

        let query = RecordQuery {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 2),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 4),
            limit: 10,
            ..Default::default()
        };
        let (page, total) = store.find(&query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 3);
    }
}
