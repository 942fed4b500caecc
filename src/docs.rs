use crate::api::attendance::{
    AttendanceListResponse, DeleteRequest, Pagination, PunchRequest,
};
use crate::ledger::AttendancePatch;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, Coordinates, EditEntry, PunchIn, PunchOut,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Ledger API",
        version = "1.0.0",
        description = r#"
## Attendance Ledger

Daily punch-in / punch-out tracking for employees.

### Key Features
- **Punching**
  - One record per employee per calendar day
  - Total hours and status are derived on punch-out
- **Corrections**
  - Edits and deletions keep an audit trail with a reason
  - Admins are notified when employees change their own records
- **Listing**
  - Paginated, newest day first

### Security
Every endpoint requires a **JWT Bearer** access token.
Employees only see their own records; admins see everything.
"#,
    ),
    paths(
        crate::api::attendance::punch_in,
        crate::api::attendance::punch_out,
        crate::api::attendance::list_attendance,
        crate::api::attendance::list_all_attendance,
        crate::api::attendance::get_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            PunchIn,
            PunchOut,
            Coordinates,
            EditEntry,
            AttendancePatch,
            PunchRequest,
            DeleteRequest,
            Pagination,
            AttendanceListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance ledger APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_attendance_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/attendance",
            "/api/attendance/punch-in",
            "/api/attendance/punch-out",
            "/api/attendance/admin/all",
            "/api/attendance/{id}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
