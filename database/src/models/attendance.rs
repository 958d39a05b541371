use campus_models::attendance::AttendanceStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DeletionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub timetable_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub section: String,
    pub date: NaiveDate,
    pub period_number: i16,
    pub academic_year: String,
    pub marked_by: Uuid,
    #[sqlx(skip)]
    pub attendance_records: Vec<AttendanceEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(Attendance, "Attendance", DeletionPolicy::Detach);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub timetable_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub section: String,
    pub date: NaiveDate,
    pub period_number: i16,
    pub academic_year: String,
    pub marked_by: Uuid,
    pub records: Vec<AttendanceEntry>,
}

/// Roll calls of one section, optionally narrowed by date range and subject.
#[derive(Debug, Clone)]
pub struct AttendanceFilter {
    pub batch_id: Uuid,
    pub section: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub subject_id: Option<Uuid>,
    pub academic_year: Option<String>,
}

impl AttendanceFilter {
    pub fn matches(&self, attendance: &Attendance) -> bool {
        attendance.batch_id == self.batch_id
            && attendance.section == self.section
            && self.from.map_or(true, |f| attendance.date >= f)
            && self.to.map_or(true, |t| attendance.date <= t)
            && self.subject_id.map_or(true, |s| attendance.subject_id == s)
            && self.academic_year.as_deref().map_or(true, |y| attendance.academic_year == y)
    }
}
