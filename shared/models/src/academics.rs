use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Parses a `"YYYY-YYYY"` span such as a batch name or an academic year.
pub fn parse_year_span(value: &str) -> Option<(i32, i32)> {
    let (start, end) = value.trim().split_once('-')?;
    if start.len() != 4 || end.len() != 4 {
        return None;
    }
    let start: i32 = start.parse().ok()?;
    let end: i32 = end.parse().ok()?;
    if end <= start {
        return None;
    }
    Some((start, end))
}

/// An academic year spans exactly two consecutive calendar years.
pub fn is_academic_year(value: &str) -> bool {
    matches!(parse_year_span(value), Some((start, end)) if end == start + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subject_type", rename_all = "snake_case")]
pub enum SubjectType {
    Theory,
    Practical,
    Elective,
    Project,
}

// Departments

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRequest {
    #[validate(length(min = 2, max = 100, message = "Department name must be between 2 and 100 characters"))]
    pub department_name: String,
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
    #[validate(length(max = 500, message = "Image URL is too long"))]
    pub image_url: Option<String>,
}

// Batches

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDepartmentRequest {
    pub department_id: Uuid,
    pub number_of_sections: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    #[validate(length(equal = 9, message = "Batch name must look like 2023-2027"))]
    pub batch_name: String,
    #[validate(length(min = 1, message = "At least one department is required"))]
    pub departments: Vec<BatchDepartmentRequest>,
}

// Sections

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionsRequest {
    pub department_id: Uuid,
    pub batch_id: Uuid,
    #[validate(range(min = 1, max = 4, message = "Year must be between 1 and 4"))]
    pub year: i16,
    #[validate(range(min = 1, max = 6, message = "Number of sections must be between 1 and 6"))]
    pub number_of_sections: i16,
    #[validate(range(min = 10, max = 200, message = "Capacity must be between 10 and 200"))]
    pub capacity: i16,
    pub academic_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionRequest {
    #[validate(range(min = 10, max = 200, message = "Capacity must be between 10 and 200"))]
    pub capacity: i16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionQuery {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub academic_year: Option<String>,
    pub year: Option<i16>,
}

// Semesters

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSemesterRequest {
    #[validate(length(min = 1, max = 100, message = "Semester name is required"))]
    pub semester_name: String,
    #[validate(range(min = 1, max = 8, message = "Semester number must be between 1 and 8"))]
    pub semester_number: i16,
    pub academic_year: String,
    pub department_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_current: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterQuery {
    pub department_id: Option<Uuid>,
}

// Subjects

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    #[validate(length(min = 2, max = 150, message = "Subject name must be between 2 and 150 characters"))]
    pub subject_name: String,
    #[validate(length(min = 2, max = 20, message = "Subject code must be between 2 and 20 characters"))]
    pub subject_code: String,
    pub department_id: Uuid,
    #[validate(range(min = 1, max = 4, message = "Year must be between 1 and 4"))]
    pub year: i16,
    #[validate(range(min = 1, max = 8, message = "Semester must be between 1 and 8"))]
    pub semester: i16,
    #[validate(range(min = 1, max = 10, message = "Credits must be between 1 and 10"))]
    pub credits: i16,
    pub subject_type: SubjectType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectQuery {
    pub department_id: Option<Uuid>,
    pub year: Option<i16>,
    pub semester: Option<i16>,
}

// Teacher allocations

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllocationRequest {
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    #[validate(length(min = 1, max = 2, message = "Section must be a section letter"))]
    pub section: String,
    #[validate(range(min = 1, max = 4, message = "Year must be between 1 and 4"))]
    pub year: i16,
    pub academic_year: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationQuery {
    pub teacher_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub section: Option<String>,
    pub academic_year: Option<String>,
}

// User lookups

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub section: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherQuery {
    pub department_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_batch_spans() {
        assert_eq!(parse_year_span("2023-2027"), Some((2023, 2027)));
        assert_eq!(parse_year_span(" 2023-2024 "), Some((2023, 2024)));
        assert_eq!(parse_year_span("2027-2023"), None);
        assert_eq!(parse_year_span("23-27"), None);
        assert_eq!(parse_year_span("2023"), None);
        assert_eq!(parse_year_span("abcd-efgh"), None);
    }

    #[test]
    fn academic_year_needs_consecutive_years() {
        assert!(is_academic_year("2023-2024"));
        assert!(!is_academic_year("2023-2025"));
        assert!(!is_academic_year("2023"));
    }
}
