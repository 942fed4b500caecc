use crate::auth::auth::AuthUser;
use crate::ledger::{AttendanceLedger, AttendancePatch, LedgerError, ListFilter, Page};
use crate::model::attendance::{AttendanceRecord, Coordinates};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchRequest {
    #[schema(example = 7)]
    pub plant_id: Option<u64>,
    #[schema(nullable = true)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteRequest {
    /// Required when deleting your own record as an employee
    #[schema(example = "Duplicate punch")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Pagination page number (start with 1)
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page
    #[param(example = 10)]
    pub limit: Option<u64>,
    /// Filter by employee (admins only; ignored for employees)
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    /// First day, inclusive (admin listing only)
    #[param(value_type = Option<String>, example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day, inclusive (admin listing only)
    #[param(value_type = Option<String>, example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
}

impl From<AttendanceQuery> for ListFilter {
    fn from(q: AttendanceQuery) -> Self {
        ListFilter {
            page: q.page,
            limit: q.limit,
            employee_id: q.employee_id,
            start_date: q.start_date,
            end_date: q.end_date,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct Pagination {
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub limit: u64,
    #[schema(example = 3)]
    pub pages: u64,
    #[schema(example = 25)]
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: Vec<AttendanceRecord>,
    pub pagination: Pagination,
}

impl From<Page<AttendanceRecord>> for AttendanceListResponse {
    fn from(page: Page<AttendanceRecord>) -> Self {
        AttendanceListResponse {
            success: true,
            data: page.data,
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                pages: page.pages,
                total: page.total,
            },
        }
    }
}

/// Punch in for today
#[utoipa::path(
    post,
    path = "/api/attendance/punch-in",
    request_body = PunchRequest,
    responses(
        (status = 201, description = "Punched in successfully", body = Object, example = json!({
            "success": true,
            "data": {},
            "message": "Punched in successfully"
        })),
        (status = 400, description = "Missing plant or already punched in today", body = Object, example = json!({
            "success": false,
            "message": "Already punched in for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn punch_in(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    payload: web::Json<PunchRequest>,
) -> Result<impl Responder, LedgerError> {
    let PunchRequest { plant_id, coordinates } = payload.into_inner();
    let record = ledger.punch_in(&auth.actor(), plant_id, coordinates).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": record,
        "message": "Punched in successfully"
    })))
}

/// Punch out for today
#[utoipa::path(
    post,
    path = "/api/attendance/punch-out",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Punched out successfully", body = Object, example = json!({
            "success": true,
            "data": {},
            "message": "Punched out successfully"
        })),
        (status = 400, description = "Missing plant or already punched out", body = Object, example = json!({
            "success": false,
            "message": "Already punched out for today"
        })),
        (status = 404, description = "No punch-in today", body = Object, example = json!({
            "success": false,
            "message": "No punch-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn punch_out(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    payload: web::Json<PunchRequest>,
) -> Result<impl Responder, LedgerError> {
    let PunchRequest { plant_id, coordinates } = payload.into_inner();
    let record = ledger.punch_out(&auth.actor(), plant_id, coordinates).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": record,
        "message": "Punched out successfully"
    })))
}

/// List attendance records (own records for employees)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    query: web::Query<AttendanceQuery>,
) -> Result<impl Responder, LedgerError> {
    let filter = ListFilter::from(query.into_inner());
    let page = ledger.list_records(&auth.actor(), &filter).await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse::from(page)))
}

/// List every employee's attendance within a date range (admin only)
#[utoipa::path(
    get,
    path = "/api/attendance/admin/all",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_all_attendance(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    query: web::Query<AttendanceQuery>,
) -> Result<impl Responder, LedgerError> {
    let filter = ListFilter::from(query.into_inner());
    let page = ledger.list_all(&auth.actor(), &filter).await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse::from(page)))
}

/// Get one attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "ID of the attendance record")
    ),
    responses(
        (status = 200, description = "Attendance record found", body = AttendanceRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Attendance record not found", body = Object, example = json!({
            "success": false,
            "message": "Attendance record not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<u64>,
) -> Result<impl Responder, LedgerError> {
    let record = ledger.get_record(&auth.actor(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": record
    })))
}

/// Edit an attendance record; every edit is kept in its history
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "ID of the attendance record")
    ),
    request_body = AttendancePatch,
    responses(
        (status = 200, description = "Attendance updated", body = Object, example = json!({
            "success": true,
            "data": {},
            "message": "Attendance updated successfully"
        })),
        (status = 400, description = "Invalid change or missing reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<u64>,
    payload: web::Json<AttendancePatch>,
) -> Result<impl Responder, LedgerError> {
    let record = ledger
        .update_record(&auth.actor(), path.into_inner(), payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": record,
        "message": "Attendance updated successfully"
    })))
}

/// Delete an attendance record
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "ID of the attendance record")
    ),
    request_body(
        content = DeleteRequest,
        description = "Reason for the deletion",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "success": true,
            "message": "Attendance record deleted successfully"
        })),
        (status = 400, description = "Missing reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<u64>,
    payload: Option<web::Json<DeleteRequest>>,
) -> Result<impl Responder, LedgerError> {
    let reason = payload.and_then(|p| p.into_inner().reason);
    ledger
        .delete_record(&auth.actor(), path.into_inner(), reason.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance record deleted successfully"
    })))
}
