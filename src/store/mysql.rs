use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool, types::Json};
use tracing::debug;

use super::{AttendanceStore, RecordQuery, StoreError};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, Coordinates, EditEntry, NewAttendance, PunchIn, PunchOut,
};

const SELECT_COLUMNS: &str = r#"
    SELECT id, employee_id, date,
           punch_in_time, punch_in_plant_id, punch_in_latitude, punch_in_longitude,
           punch_out_time, punch_out_plant_id, punch_out_latitude, punch_out_longitude,
           total_hours, status, notes, is_edited, edit_history, created_at, updated_at
    FROM attendance
"#;

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    punch_in_time: DateTime<Utc>,
    punch_in_plant_id: u64,
    punch_in_latitude: Option<f64>,
    punch_in_longitude: Option<f64>,
    punch_out_time: Option<DateTime<Utc>>,
    punch_out_plant_id: Option<u64>,
    punch_out_latitude: Option<f64>,
    punch_out_longitude: Option<f64>,
    total_hours: f64,
    status: String,
    notes: Option<String>,
    is_edited: bool,
    edit_history: Json<Vec<EditEntry>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinates> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
        _ => None,
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status).map_err(|_| StoreError::Corrupt {
            id: row.id,
            reason: format!("unknown status {:?}", row.status),
        })?;

        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            punch_in: PunchIn {
                time: row.punch_in_time,
                plant_id: row.punch_in_plant_id,
                coordinates: coordinates(row.punch_in_latitude, row.punch_in_longitude),
            },
            punch_out: PunchOut {
                time: row.punch_out_time,
                plant_id: row.punch_out_plant_id,
                coordinates: coordinates(row.punch_out_latitude, row.punch_out_longitude),
            },
            total_hours: row.total_hours,
            status,
            notes: row.notes,
            is_edited: row.is_edited,
            edit_history: row.edit_history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

fn where_clause(query: &RecordQuery) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }
    if let Some(start) = query.start_date {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(start));
    }
    if let Some(end) = query.end_date {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(end));
    }

    (where_sql, args)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        args: Vec<FilterValue>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {condition}");
        let mut q = sqlx::query_as::<_, AttendanceRow>(&sql);
        for arg in args {
            q = match arg {
                FilterValue::U64(v) => q.bind(v),
                FilterValue::Date(v) => q.bind(v),
            };
        }

        q.fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let coords = new.punch_in.coordinates;
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, punch_in_time, punch_in_plant_id,
                 punch_in_latitude, punch_in_longitude,
                 total_hours, status, is_edited, edit_history, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, 'present', FALSE, JSON_ARRAY(), ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.date)
        .bind(new.punch_in.time)
        .bind(new.punch_in.plant_id)
        .bind(coords.map(|c| c.latitude))
        .bind(coords.map(|c| c.longitude))
        .bind(new.created_at)
        .bind(new.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(new.into_record(done.last_insert_id())),
            // Duplicate punch-in for same day
            Err(e) if is_unique_violation(&e) => Err(StoreError::UniqueViolation),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        self.fetch_one_where("id = ?", vec![FilterValue::U64(id)]).await
    }

    async fn find_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.fetch_one_where(
            "employee_id = ? AND date = ?",
            vec![FilterValue::U64(employee_id), FilterValue::Date(date)],
        )
        .await
    }

    async fn save(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let in_coords = record.punch_in.coordinates;
        let out_coords = record.punch_out.coordinates;

        let result = sqlx::query(
            r#"
            UPDATE attendance SET
                punch_in_time = ?, punch_in_plant_id = ?,
                punch_in_latitude = ?, punch_in_longitude = ?,
                punch_out_time = ?, punch_out_plant_id = ?,
                punch_out_latitude = ?, punch_out_longitude = ?,
                total_hours = ?, status = ?, notes = ?,
                is_edited = ?, edit_history = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(record.punch_in.time)
        .bind(record.punch_in.plant_id)
        .bind(in_coords.map(|c| c.latitude))
        .bind(in_coords.map(|c| c.longitude))
        .bind(record.punch_out.time)
        .bind(record.punch_out.plant_id)
        .bind(out_coords.map(|c| c.latitude))
        .bind(out_coords.map(|c| c.longitude))
        .bind(record.total_hours)
        .bind(record.status.as_ref())
        .bind(record.notes.as_deref())
        .bind(record.is_edited)
        .bind(Json(&record.edit_history))
        .bind(record.updated_at)
        .bind(record.id)
        .execute(&self.pool)
        .await?;

        // updated_at always moves, so a matched row is a changed row
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, query: &RecordQuery) -> Result<(Vec<AttendanceRecord>, u64), StoreError> {
        let (where_sql, args) = where_clause(query);

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM attendance{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Date(v) => count_q.bind(*v),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "{SELECT_COLUMNS}{} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            where_sql
        );
        debug!(sql = %data_sql, offset = query.offset, limit = query.limit, "Fetching attendance page");

        let mut data_q = sqlx::query_as::<_, AttendanceRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Date(v) => data_q.bind(v),
            };
        }

        let rows = data_q
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, total.max(0) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_binds_only_given_filters() {
        let (sql, args) = where_clause(&RecordQuery::default());
        assert_eq!(sql, " WHERE 1=1");
        assert!(args.is_empty());

        let query = RecordQuery {
            employee_id: Some(4),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31),
            ..Default::default()
        };
        let (sql, args) = where_clause(&query);
        assert_eq!(sql, " WHERE 1=1 AND employee_id = ? AND date <= ?");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn half_coordinates_are_dropped() {
        assert_eq!(coordinates(Some(1.0), None), None);
        assert_eq!(
            coordinates(Some(1.0), Some(2.0)),
            Some(Coordinates { latitude: 1.0, longitude: 2.0 })
        );
    }

    #[test]
    fn only_database_errors_count_as_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }

    /// Needs a reachable MySQL: `DATABASE_URL=... cargo test -- --ignored`
    #[actix_web::test]
    #[ignore = "requires DATABASE_URL pointing at a MySQL server"]
    async fn duplicate_day_insert_maps_to_unique_violation() {
        use chrono::DurationRound;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = crate::db::init_db(&url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let store = MySqlAttendanceStore::new(pool);

        let time = Utc::now().duration_trunc(chrono::Duration::milliseconds(1)).unwrap();
        let employee_id = u64::from(time.timestamp_subsec_micros()) + 9_000_000;
        let new = NewAttendance {
            employee_id,
            date: time.date_naive(),
            punch_in: PunchIn { time, plant_id: 1, coordinates: None },
            created_at: time,
        };

        let first = store.insert(new.clone()).await.unwrap();
        let err = store.insert(new).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));

        // written and read back identically
        assert_eq!(store.find_by_id(first.id).await.unwrap(), Some(first.clone()));

        assert!(store.delete(first.id).await.unwrap());
        assert!(!store.save(&first).await.unwrap());
    }
}
