use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DeletionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub department_code: String,
    pub department_name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Batches linked to this department, derived from the batch links.
    #[sqlx(skip)]
    pub batches: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(
    Department,
    "Department",
    DeletionPolicy::Restrict(&[
        "batches",
        "sections",
        "semesters",
        "subjects",
        "teacher allocations",
        "fees",
        "users",
    ])
);

/// Codes are `DEP01`, `DEP02`, ... and keep growing past two digits.
pub fn format_department_code(sequence: i64) -> String {
    format!("DEP{:02}", sequence)
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub department_name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub batch_name: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    #[sqlx(skip)]
    pub departments: Vec<BatchDepartment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(
    Batch,
    "Batch",
    DeletionPolicy::Restrict(&["sections", "teacher allocations", "timetable entries", "fees", "users"])
);

impl Batch {
    pub fn link(&self, department_id: Uuid) -> Option<&BatchDepartment> {
        self.departments.iter().find(|d| d.department_id == department_id)
    }

    pub fn includes(&self, department_id: Uuid) -> bool {
        self.link(department_id).is_some()
    }
}

/// Batch to department link. `department_name` is a copy taken when the
/// batch was created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchDepartment {
    pub department_id: Uuid,
    pub department_name: String,
    pub number_of_sections: i16,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_name: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    /// `(department_id, number_of_sections)` in submission order.
    pub departments: Vec<(Uuid, i16)>,
}

/// Row of the department -> batch dropdown.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchOption {
    pub batch_id: Uuid,
    pub batch_name: String,
    pub number_of_sections: i16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_codes_are_zero_padded() {
        assert_eq!(format_department_code(1), "DEP01");
        assert_eq!(format_department_code(42), "DEP42");
        assert_eq!(format_department_code(100), "DEP100");
    }
}
