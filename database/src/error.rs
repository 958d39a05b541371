use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn not_found(what: &str) -> Self {
        StoreError::NotFound(format!("{} not found", what))
    }

    /// Restrict-on-delete refusal.
    pub fn in_use(entity: &str, referenced_by: &str) -> Self {
        StoreError::Conflict(format!("{} is still referenced by {}", entity, referenced_by))
    }
}

/// Conflict messages shared by the Postgres and in-memory stores.
pub mod messages {
    pub const DEPARTMENT_NAME_TAKEN: &str = "Department name already exists";
    pub const BATCH_NAME_TAKEN: &str = "Batch already exists";
    pub const BATCH_DEPARTMENT_REPEATED: &str = "A department can appear only once in a batch";
    pub const EMAIL_TAKEN: &str = "Email already registered";
    pub const SECTION_TAKEN: &str = "Section already exists";
    pub const CURRENT_SEMESTER_TAKEN: &str = "Another semester is already current for this department";
    pub const CURRENT_SEMESTER_DELETE: &str = "Cannot delete the current semester";
    pub const SUBJECT_CODE_TAKEN: &str = "Subject code already exists in this department";
    pub const ALLOCATION_TAKEN: &str = "Teacher is already allocated to this subject for the section";
    pub const SLOT_TAKEN: &str = "A class is already scheduled for this section in this period";
    pub const TEACHER_BUSY: &str = "Teacher already has a class in this period";
    pub const ASSIGNMENT_NOT_FOUND: &str = "Student is not assigned to this fee";
    pub const ALREADY_PAID: &str = "Fee has already been paid";
    pub const DISCOUNT_AFTER_PAYMENT: &str = "Cannot change the discount of a paid fee";
    pub const STILL_IN_USE: &str = "Record is still in use";
}

fn conflict_for_constraint(constraint: &str) -> &'static str {
    use messages::*;
    match constraint {
        "departments_name_key" => DEPARTMENT_NAME_TAKEN,
        "batches_batch_name_key" => BATCH_NAME_TAKEN,
        "batch_departments_pkey" => BATCH_DEPARTMENT_REPEATED,
        "users_email_key" => EMAIL_TAKEN,
        "sections_active_key" => SECTION_TAKEN,
        "semesters_current_key" => CURRENT_SEMESTER_TAKEN,
        "subjects_department_code_key" => SUBJECT_CODE_TAKEN,
        "teacher_allocations_assignment_key" => ALLOCATION_TAKEN,
        "timetable_entries_slot_key" => SLOT_TAKEN,
        "timetable_entries_teacher_slot_key" => TEACHER_BUSY,
        _ => STILL_IN_USE,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    let constraint = db_err.constraint().unwrap_or_default();
                    return StoreError::Conflict(conflict_for_constraint(constraint).to_string());
                }
                // foreign_key_violation
                Some("23503") => {
                    return StoreError::Conflict(messages::STILL_IN_USE.to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_messages() {
        assert_eq!(conflict_for_constraint("timetable_entries_slot_key"), messages::SLOT_TAKEN);
        assert_eq!(conflict_for_constraint("users_email_key"), messages::EMAIL_TAKEN);
        assert_eq!(conflict_for_constraint("whatever"), messages::STILL_IN_USE);
    }

    #[test]
    fn in_use_names_the_reference() {
        let err = StoreError::in_use("Department", "batches");
        assert_eq!(err.to_string(), "Department is still referenced by batches");
    }
}
