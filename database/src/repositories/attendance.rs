use async_trait::async_trait;
use campus_models::attendance::AttendanceStatus;
use chrono::NaiveDate;
use sqlx::{query, query_as, query_scalar, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Attendance, AttendanceEntry, AttendanceFilter, NewAttendance};
use crate::utils::generate_id;

const ATTENDANCE_COLUMNS: &str = "id, timetable_id, subject_id, teacher_id, department_id, batch_id, section, \
     date, period_number, academic_year, marked_by, created_at, updated_at";

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Writes the roll call for `(timetable_id, date)`, replacing any earlier
    /// one. The flag tells whether a roll call was replaced.
    async fn upsert(&self, attendance: NewAttendance) -> StoreResult<(Attendance, bool)>;

    async fn find_by_slot(&self, timetable_id: Uuid, date: NaiveDate) -> StoreResult<Option<Attendance>>;

    /// Roll calls ordered by date then period.
    async fn list(&self, filter: &AttendanceFilter) -> StoreResult<Vec<Attendance>>;
}

pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn entries(&self, attendance_id: Uuid) -> StoreResult<Vec<AttendanceEntry>> {
        let entries = query_as::<_, AttendanceEntry>(
            "SELECT student_id, status, remarks FROM attendance_entries
             WHERE attendance_id = $1 ORDER BY position",
        )
        .bind(attendance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[async_trait]
impl AttendanceStore for AttendanceRepository {
    async fn upsert(&self, attendance: NewAttendance) -> StoreResult<(Attendance, bool)> {
        let mut tx = self.pool.begin().await?;

        let previous = query_scalar::<_, Uuid>(
            "SELECT id FROM attendance WHERE timetable_id = $1 AND date = $2 FOR UPDATE",
        )
        .bind(attendance.timetable_id)
        .bind(attendance.date)
        .fetch_optional(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO attendance (id, timetable_id, subject_id, teacher_id, department_id, batch_id, section,
                                     date, period_number, academic_year, marked_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (timetable_id, date) DO UPDATE
             SET subject_id = EXCLUDED.subject_id,
                 teacher_id = EXCLUDED.teacher_id,
                 department_id = EXCLUDED.department_id,
                 batch_id = EXCLUDED.batch_id,
                 section = EXCLUDED.section,
                 period_number = EXCLUDED.period_number,
                 academic_year = EXCLUDED.academic_year,
                 marked_by = EXCLUDED.marked_by,
                 updated_at = NOW()
             RETURNING {}",
            ATTENDANCE_COLUMNS
        );
        let mut saved = query_as::<_, Attendance>(&sql)
            .bind(generate_id())
            .bind(attendance.timetable_id)
            .bind(attendance.subject_id)
            .bind(attendance.teacher_id)
            .bind(attendance.department_id)
            .bind(attendance.batch_id)
            .bind(&attendance.section)
            .bind(attendance.date)
            .bind(attendance.period_number)
            .bind(&attendance.academic_year)
            .bind(attendance.marked_by)
            .fetch_one(&mut *tx)
            .await?;

        query("DELETE FROM attendance_entries WHERE attendance_id = $1")
            .bind(saved.id)
            .execute(&mut *tx)
            .await?;

        for (position, record) in attendance.records.iter().enumerate() {
            query(
                "INSERT INTO attendance_entries (attendance_id, student_id, status, remarks, position)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(saved.id)
            .bind(record.student_id)
            .bind(record.status)
            .bind(&record.remarks)
            .bind(position as i16)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        saved.attendance_records = attendance.records;
        Ok((saved, previous.is_some()))
    }

    async fn find_by_slot(&self, timetable_id: Uuid, date: NaiveDate) -> StoreResult<Option<Attendance>> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE timetable_id = $1 AND date = $2",
            ATTENDANCE_COLUMNS
        );
        let Some(mut attendance) = query_as::<_, Attendance>(&sql)
            .bind(timetable_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        attendance.attendance_records = self.entries(attendance.id).await?;
        Ok(Some(attendance))
    }

    async fn list(&self, filter: &AttendanceFilter) -> StoreResult<Vec<Attendance>> {
        let sql = format!(
            "SELECT {} FROM attendance
             WHERE batch_id = $1 AND section = $2
               AND ($3::date IS NULL OR date >= $3)
               AND ($4::date IS NULL OR date <= $4)
               AND ($5::uuid IS NULL OR subject_id = $5)
               AND ($6::text IS NULL OR academic_year = $6)
             ORDER BY date, period_number",
            ATTENDANCE_COLUMNS
        );
        let mut sheets = query_as::<_, Attendance>(&sql)
            .bind(filter.batch_id)
            .bind(&filter.section)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.subject_id)
            .bind(&filter.academic_year)
            .fetch_all(&self.pool)
            .await?;

        if sheets.is_empty() {
            return Ok(sheets);
        }

        let ids: Vec<Uuid> = sheets.iter().map(|s| s.id).collect();
        let rows = query_as::<_, (Uuid, Uuid, AttendanceStatus, Option<String>)>(
            "SELECT attendance_id, student_id, status, remarks FROM attendance_entries
             WHERE attendance_id = ANY($1) ORDER BY attendance_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_sheet: HashMap<Uuid, Vec<AttendanceEntry>> = HashMap::new();
        for (attendance_id, student_id, status, remarks) in rows {
            by_sheet
                .entry(attendance_id)
                .or_default()
                .push(AttendanceEntry { student_id, status, remarks });
        }
        for sheet in &mut sheets {
            sheet.attendance_records = by_sheet.remove(&sheet.id).unwrap_or_default();
        }

        Ok(sheets)
    }
}
