use campus_models::timetable::{clock, DayOfWeek};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DeletionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub section: String,
    pub year: i16,
    pub day_of_week: DayOfWeek,
    pub period_number: i16,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_allocation_id: Uuid,
    pub room_number: Option<String>,
    pub academic_year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(TimetableEntry, "Timetable entry", DeletionPolicy::Detach);

#[derive(Debug, Clone)]
pub struct NewTimetableEntry {
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub section: String,
    pub year: i16,
    pub day_of_week: DayOfWeek,
    pub period_number: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_allocation_id: Uuid,
    pub room_number: Option<String>,
    pub academic_year: String,
}

impl NewTimetableEntry {
    /// Same (batch, section, day, period, academic year).
    pub fn collides_with(&self, entry: &TimetableEntry) -> bool {
        entry.batch_id == self.batch_id
            && entry.section == self.section
            && entry.day_of_week == self.day_of_week
            && entry.period_number == self.period_number
            && entry.academic_year == self.academic_year
    }

    /// Same teacher in the same (day, period, academic year).
    pub fn double_books(&self, entry: &TimetableEntry) -> bool {
        entry.teacher_id == self.teacher_id
            && entry.day_of_week == self.day_of_week
            && entry.period_number == self.period_number
            && entry.academic_year == self.academic_year
    }
}
