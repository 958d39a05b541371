//! Roll calls per timetable period and the attendance report built from them.

use campus_database::models::{Attendance, AttendanceEntry, AttendanceFilter, NewAttendance, StudentFilter, User};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::attendance::{AttendanceStatus, MarkAttendanceRequest, ReportQuery};
use campus_models::timetable::DayOfWeek;
use campus_observability::log_attendance_marked;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use validator::Validate;

use super::{normalize_section, SERVICE_NAME};
use crate::errors::{ServiceError, ServiceResult};

pub const CSV_HEADER: &str = "Name,Email,Total,Present,Absent,Late,Excused,Percentage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    Good,
    Warning,
    Poor,
}

impl AttendanceBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 75.0 {
            AttendanceBand::Good
        } else if percentage >= 60.0 {
            AttendanceBand::Warning
        } else {
            AttendanceBand::Poor
        }
    }
}

/// `present / total` as a percentage rounded to one decimal; 0 without records.
pub fn attendance_percentage(present: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub enrollment_id: Option<String>,
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
    pub attendance_percentage: f64,
    pub band: AttendanceBand,
}

impl StudentAttendance {
    fn new(student_id: Uuid, name: String, email: String, enrollment_id: Option<String>) -> Self {
        Self {
            student_id,
            name,
            email,
            enrollment_id,
            total: 0,
            present: 0,
            absent: 0,
            late: 0,
            excused: 0,
            attendance_percentage: 0.0,
            band: AttendanceBand::Poor,
        }
    }

    fn from_user(user: &User) -> Self {
        Self::new(user.id, user.name.clone(), user.email.clone(), user.enrollment_id.clone())
    }

    fn count(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }

    fn finish(&mut self) {
        self.total = self.present + self.absent + self.late + self.excused;
        self.attendance_percentage = attendance_percentage(self.present, self.total);
        self.band = AttendanceBand::for_percentage(self.attendance_percentage);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub batch_id: Uuid,
    pub section: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub subject_id: Option<Uuid>,
    pub sessions: usize,
    pub students: Vec<StudentAttendance>,
}

impl AttendanceReport {
    pub fn to_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        out.push_str("\r\n");
        for row in &self.students {
            let fields = [
                csv_field(&row.name),
                csv_field(&row.email),
                row.total.to_string(),
                row.present.to_string(),
                row.absent.to_string(),
                row.late.to_string(),
                row.excused.to_string(),
                format!("{:.1}", row.attendance_percentage),
            ];
            out.push_str(&fields.join(","));
            out.push_str("\r\n");
        }
        out
    }
}

/// RFC 4180 quoting.
pub fn csv_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\r' | '\n')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub struct AttendanceService {
    stores: Stores,
}

impl AttendanceService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Records the roll call of one period on one date. Every enrolled
    /// student appears exactly once; resubmitting replaces the sheet.
    pub async fn mark(&self, actor: &AuthUser, request: MarkAttendanceRequest) -> ServiceResult<(Attendance, bool)> {
        request.validate()?;

        let entry = self
            .stores
            .timetable
            .find(request.timetable_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Timetable entry"))?;

        if !actor.is_admin() && entry.teacher_id != actor.id {
            return Err(ServiceError::forbidden(
                "Teachers can only mark attendance for their own periods",
            ));
        }

        let weekday = DayOfWeek::from(request.date.weekday());
        if weekday != entry.day_of_week {
            return Err(ServiceError::bad_request(format!(
                "{} is a {:?}, but this period is on {:?}",
                request.date, weekday, entry.day_of_week
            )));
        }

        let enrolled: HashSet<Uuid> = self
            .stores
            .users
            .list_students(&StudentFilter {
                department_id: None,
                batch_id: Some(entry.batch_id),
                section: Some(entry.section.clone()),
            })
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let mut seen = HashSet::with_capacity(request.records.len());
        for mark in &request.records {
            if !enrolled.contains(&mark.student_id) {
                return Err(ServiceError::bad_request(format!(
                    "Student {} is not enrolled in this section",
                    mark.student_id
                )));
            }
            if !seen.insert(mark.student_id) {
                return Err(ServiceError::bad_request(format!(
                    "Student {} is listed more than once",
                    mark.student_id
                )));
            }
        }
        let missing = enrolled.len() - seen.len();
        if missing > 0 {
            return Err(ServiceError::bad_request(format!(
                "Attendance is missing for {} enrolled student(s)",
                missing
            )));
        }

        let records: Vec<AttendanceEntry> = request
            .records
            .into_iter()
            .map(|mark| AttendanceEntry {
                student_id: mark.student_id,
                status: mark.status,
                remarks: mark.remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            })
            .collect();
        let record_count = records.len();

        let (attendance, replaced) = self
            .stores
            .attendance
            .upsert(NewAttendance {
                timetable_id: entry.id,
                subject_id: entry.subject_id,
                teacher_id: entry.teacher_id,
                department_id: entry.department_id,
                batch_id: entry.batch_id,
                section: entry.section,
                date: request.date,
                period_number: entry.period_number,
                academic_year: entry.academic_year,
                marked_by: actor.id,
                records,
            })
            .await?;

        log_attendance_marked(SERVICE_NAME, attendance.id, attendance.timetable_id, record_count, replaced, actor.id);
        Ok((attendance, replaced))
    }

    pub async fn get(&self, timetable_id: Uuid, date: NaiveDate) -> ServiceResult<Attendance> {
        self.stores
            .attendance
            .find_by_slot(timetable_id, date)
            .await?
            .ok_or_else(|| ServiceError::not_found("Attendance"))
    }

    /// One row per enrolled student plus anyone else found in the matched
    /// sheets, sorted by name.
    pub async fn report(&self, batch_id: Uuid, section: &str, query: ReportQuery) -> ServiceResult<AttendanceReport> {
        let section = normalize_section(section)?;
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ServiceError::bad_request("Report start date must not be after its end date"));
            }
        }

        let students = self
            .stores
            .users
            .list_students(&StudentFilter {
                department_id: None,
                batch_id: Some(batch_id),
                section: Some(section.clone()),
            })
            .await?;
        let sheets = self
            .stores
            .attendance
            .list(&AttendanceFilter {
                batch_id,
                section: section.clone(),
                from: query.from,
                to: query.to,
                subject_id: query.subject_id,
                academic_year: query.academic_year.map(|y| y.trim().to_string()),
            })
            .await?;

        let mut rows: HashMap<Uuid, StudentAttendance> = students
            .iter()
            .map(|s| (s.id, StudentAttendance::from_user(s)))
            .collect();

        for sheet in &sheets {
            for record in &sheet.attendance_records {
                if !rows.contains_key(&record.student_id) {
                    let row = match self.stores.users.find(record.student_id).await? {
                        Some(user) => StudentAttendance::from_user(&user),
                        None => StudentAttendance::new(
                            record.student_id,
                            "Unknown student".to_string(),
                            String::new(),
                            None,
                        ),
                    };
                    rows.insert(record.student_id, row);
                }
                if let Some(row) = rows.get_mut(&record.student_id) {
                    row.count(record.status);
                }
            }
        }

        let mut students: Vec<StudentAttendance> = rows.into_values().collect();
        for row in &mut students {
            row.finish();
        }
        students.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));

        Ok(AttendanceReport {
            batch_id,
            section,
            from: query.from,
            to: query.to,
            subject_id: query.subject_id,
            sessions: sheets.len(),
            students,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(attendance_percentage(2, 3), 66.7);
        assert_eq!(attendance_percentage(1, 3), 33.3);
        assert_eq!(attendance_percentage(3, 3), 100.0);
        assert_eq!(attendance_percentage(0, 0), 0.0);
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(AttendanceBand::for_percentage(75.0), AttendanceBand::Good);
        assert_eq!(AttendanceBand::for_percentage(74.9), AttendanceBand::Warning);
        assert_eq!(AttendanceBand::for_percentage(60.0), AttendanceBand::Warning);
        assert_eq!(AttendanceBand::for_percentage(59.9), AttendanceBand::Poor);
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        assert_eq!(csv_field("Asha"), "Asha");
        assert_eq!(csv_field("Rao, Asha"), "\"Rao, Asha\"");
        assert_eq!(csv_field("The \"Ace\""), "\"The \"\"Ace\"\"\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn csv_rows_follow_the_header() {
        let mut row = StudentAttendance::new(Uuid::new_v4(), "Rao, Asha".into(), "asha@campus.edu".into(), None);
        row.count(AttendanceStatus::Present);
        row.count(AttendanceStatus::Present);
        row.count(AttendanceStatus::Absent);
        row.finish();

        let report = AttendanceReport {
            batch_id: Uuid::new_v4(),
            section: "A".into(),
            from: None,
            to: None,
            subject_id: None,
            sessions: 3,
            students: vec![row],
        };
        let csv = report.to_csv();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "\"Rao, Asha\",asha@campus.edu,3,2,1,0,0,66.7");
    }
}
