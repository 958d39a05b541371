use campus_models::academics::SubjectType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DeletionPolicy;

// Sections

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub year: i16,
    pub section_name: String,
    pub capacity: i16,
    pub academic_year: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(Section, "Section", DeletionPolicy::Soft);

#[derive(Debug, Clone)]
pub struct NewSection {
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub year: i16,
    pub section_name: String,
    pub capacity: i16,
    pub academic_year: String,
}

impl NewSection {
    pub fn same_slot(&self, section: &Section) -> bool {
        section.is_active
            && section.department_id == self.department_id
            && section.batch_id == self.batch_id
            && section.year == self.year
            && section.academic_year == self.academic_year
            && section.section_name == self.section_name
    }
}

/// Every supplied key narrows the result; only active sections match.
#[derive(Debug, Clone, Default)]
pub struct SectionFilter {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub academic_year: Option<String>,
    pub year: Option<i16>,
}

impl SectionFilter {
    pub fn matches(&self, section: &Section) -> bool {
        section.is_active
            && self.department_id.map_or(true, |d| section.department_id == d)
            && self.batch_id.map_or(true, |b| section.batch_id == b)
            && self.academic_year.as_deref().map_or(true, |y| section.academic_year == y)
            && self.year.map_or(true, |y| section.year == y)
    }
}

// Semesters

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub id: Uuid,
    pub semester_name: String,
    pub semester_number: i16,
    pub academic_year: String,
    pub department_id: Uuid,
    pub year: i16,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(Semester, "Semester", DeletionPolicy::Restrict(&["fees"]));

/// Semesters 1-2 are year 1, 3-4 year 2, and so on.
pub fn year_of_semester(semester_number: i16) -> i16 {
    (semester_number + 1) / 2
}

#[derive(Debug, Clone)]
pub struct NewSemester {
    pub semester_name: String,
    pub semester_number: i16,
    pub academic_year: String,
    pub department_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub is_current: bool,
}

// Subjects

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub department_id: Uuid,
    pub year: i16,
    pub semester: i16,
    pub credits: i16,
    pub subject_type: SubjectType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(Subject, "Subject", DeletionPolicy::Restrict(&["teacher allocations"]));

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub subject_name: String,
    /// Trimmed and uppercased.
    pub subject_code: String,
    pub department_id: Uuid,
    pub year: i16,
    pub semester: i16,
    pub credits: i16,
    pub subject_type: SubjectType,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectFilter {
    pub department_id: Option<Uuid>,
    pub year: Option<i16>,
    pub semester: Option<i16>,
}

impl SubjectFilter {
    pub fn matches(&self, subject: &Subject) -> bool {
        self.department_id.map_or(true, |d| subject.department_id == d)
            && self.year.map_or(true, |y| subject.year == y)
            && self.semester.map_or(true, |s| subject.semester == s)
    }
}

// Teacher allocations

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAllocation {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub section: String,
    pub year: i16,
    pub academic_year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(
    TeacherAllocation,
    "Teacher allocation",
    DeletionPolicy::Restrict(&["timetable entries"])
);

#[derive(Debug, Clone)]
pub struct NewAllocation {
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub section: String,
    pub year: i16,
    pub academic_year: String,
}

impl NewAllocation {
    pub fn duplicates(&self, existing: &TeacherAllocation) -> bool {
        existing.teacher_id == self.teacher_id
            && existing.subject_id == self.subject_id
            && existing.batch_id == self.batch_id
            && existing.section == self.section
            && existing.academic_year == self.academic_year
    }
}

#[derive(Debug, Clone, Default)]
pub struct AllocationFilter {
    pub teacher_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub section: Option<String>,
    pub academic_year: Option<String>,
}

impl AllocationFilter {
    pub fn matches(&self, allocation: &TeacherAllocation) -> bool {
        self.teacher_id.map_or(true, |t| allocation.teacher_id == t)
            && self.batch_id.map_or(true, |b| allocation.batch_id == b)
            && self.section.as_deref().map_or(true, |s| allocation.section == s)
            && self.academic_year.as_deref().map_or(true, |y| allocation.academic_year == y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semester_maps_to_year() {
        let years: Vec<i16> = (1..=8).map(year_of_semester).collect();
        assert_eq!(years, vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }
}
