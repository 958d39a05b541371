use async_trait::async_trait;
use sqlx::{query, query_as, PgPool};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{Model, NewTimetableEntry, TimetableEntry};
use crate::utils::generate_id;

const ENTRY_COLUMNS: &str = "id, department_id, batch_id, section, year, day_of_week, period_number, \
     start_time, end_time, subject_id, teacher_id, teacher_allocation_id, room_number, academic_year, \
     created_at, updated_at";

#[async_trait]
pub trait TimetableStore: Send + Sync {
    /// Fails with a conflict when the section's slot is taken or the
    /// teacher already teaches in that slot.
    async fn create(&self, entry: NewTimetableEntry) -> StoreResult<TimetableEntry>;

    /// Entries of one section ordered by day then period.
    async fn list_for_section(
        &self,
        batch_id: Uuid,
        section: &str,
        academic_year: Option<&str>,
    ) -> StoreResult<Vec<TimetableEntry>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<TimetableEntry>>;

    /// Attendance recorded against the entry is left in place.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

pub struct TimetableRepository {
    pool: PgPool,
}

impl TimetableRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimetableStore for TimetableRepository {
    async fn create(&self, entry: NewTimetableEntry) -> StoreResult<TimetableEntry> {
        // both slot rules are unique constraints; violations map to conflicts
        let sql = format!(
            "INSERT INTO timetable_entries
                 (id, department_id, batch_id, section, year, day_of_week, period_number, start_time, end_time,
                  subject_id, teacher_id, teacher_allocation_id, room_number, academic_year)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {}",
            ENTRY_COLUMNS
        );
        let created = query_as::<_, TimetableEntry>(&sql)
            .bind(generate_id())
            .bind(entry.department_id)
            .bind(entry.batch_id)
            .bind(&entry.section)
            .bind(entry.year)
            .bind(entry.day_of_week)
            .bind(entry.period_number)
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.subject_id)
            .bind(entry.teacher_id)
            .bind(entry.teacher_allocation_id)
            .bind(&entry.room_number)
            .bind(&entry.academic_year)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn list_for_section(
        &self,
        batch_id: Uuid,
        section: &str,
        academic_year: Option<&str>,
    ) -> StoreResult<Vec<TimetableEntry>> {
        let sql = format!(
            "SELECT {} FROM timetable_entries
             WHERE batch_id = $1 AND section = $2
               AND ($3::text IS NULL OR academic_year = $3)
             ORDER BY day_of_week, period_number",
            ENTRY_COLUMNS
        );
        let entries = query_as::<_, TimetableEntry>(&sql)
            .bind(batch_id)
            .bind(section)
            .bind(academic_year)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<TimetableEntry>> {
        let sql = format!("SELECT {} FROM timetable_entries WHERE id = $1", ENTRY_COLUMNS);
        Ok(query_as::<_, TimetableEntry>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = query("DELETE FROM timetable_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(TimetableEntry::NAME));
        }
        Ok(())
    }
}
