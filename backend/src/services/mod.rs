pub mod allocations;
pub mod attendance;
pub mod auth;
pub mod fees;
pub mod registry;
pub mod sections;
pub mod semesters;
pub mod subjects;
pub mod timetable;
pub mod users;

use campus_models::academics::is_academic_year;

use crate::errors::{ServiceError, ServiceResult};

/// Name attached to domain events emitted by the services.
pub const SERVICE_NAME: &str = "campus-backend";

pub(crate) fn require_academic_year(value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if is_academic_year(value) {
        Ok(value.to_string())
    } else {
        Err(ServiceError::bad_request(
            "Academic year must span two consecutive years, like 2024-2025",
        ))
    }
}

/// Section letters are stored uppercased.
pub(crate) fn normalize_section(value: &str) -> ServiceResult<String> {
    let value = value.trim().to_uppercase();
    if sections::is_section_name(&value) {
        Ok(value)
    } else {
        Err(ServiceError::bad_request("Section must be a letter from A to F"))
    }
}
