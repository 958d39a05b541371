use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, PgPool};
use uuid::Uuid;

use super::ensure_unreferenced;
use crate::error::{messages, StoreError, StoreResult};
use crate::models::{
    year_of_semester, AllocationFilter, Model, NewAllocation, NewSection, NewSemester, NewSubject,
    Section, SectionFilter, Semester, Subject, SubjectFilter, TeacherAllocation,
};
use crate::utils::generate_id;

const SECTION_COLUMNS: &str = "id, department_id, batch_id, year, section_name, capacity, academic_year, \
     is_active, created_at, updated_at";
const SEMESTER_COLUMNS: &str = "id, semester_name, semester_number, academic_year, department_id, year, \
     start_date, end_date, is_active, is_current, created_at, updated_at";
const SUBJECT_COLUMNS: &str = "id, subject_name, subject_code, department_id, year, semester, credits, \
     subject_type, created_at, updated_at";
const ALLOCATION_COLUMNS: &str = "id, teacher_id, subject_id, department_id, batch_id, section, year, \
     academic_year, created_at, updated_at";

#[async_trait]
pub trait SectionStore: Send + Sync {
    /// Inserts all sections or none. An active section already holding one
    /// of the names fails the whole call with a conflict.
    async fn create_all(&self, sections: Vec<NewSection>) -> StoreResult<Vec<Section>>;

    /// Active sections ordered by year then name.
    async fn list(&self, filter: &SectionFilter) -> StoreResult<Vec<Section>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Section>>;

    async fn update_capacity(&self, id: Uuid, capacity: i16) -> StoreResult<Section>;

    async fn deactivate(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait SemesterStore: Send + Sync {
    /// A semester created as current takes over from the department's
    /// previous current semester in the same transaction.
    async fn create(&self, semester: NewSemester) -> StoreResult<Semester>;

    async fn list(&self, department_id: Option<Uuid>) -> StoreResult<Vec<Semester>>;

    async fn current(&self, department_id: Uuid) -> StoreResult<Option<Semester>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Semester>>;

    /// Makes `id` the only current semester of its department.
    async fn set_current(&self, id: Uuid) -> StoreResult<Semester>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait SubjectStore: Send + Sync {
    async fn create(&self, subject: NewSubject) -> StoreResult<Subject>;

    async fn list(&self, filter: &SubjectFilter) -> StoreResult<Vec<Subject>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Subject>>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait AllocationStore: Send + Sync {
    async fn create(&self, allocation: NewAllocation) -> StoreResult<TeacherAllocation>;

    async fn list(&self, filter: &AllocationFilter) -> StoreResult<Vec<TeacherAllocation>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<TeacherAllocation>>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

// Sections

pub struct SectionRepository {
    pool: PgPool,
}

impl SectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SectionStore for SectionRepository {
    async fn create_all(&self, sections: Vec<NewSection>) -> StoreResult<Vec<Section>> {
        let mut tx = self.pool.begin().await?;
        let insert = format!(
            "INSERT INTO sections (id, department_id, batch_id, year, section_name, capacity, academic_year)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            SECTION_COLUMNS
        );

        let mut created = Vec::with_capacity(sections.len());
        for section in sections {
            let taken: bool = query_scalar(
                "SELECT EXISTS (
                     SELECT 1 FROM sections
                     WHERE is_active AND department_id = $1 AND batch_id = $2 AND year = $3
                       AND academic_year = $4 AND section_name = $5
                 )",
            )
            .bind(section.department_id)
            .bind(section.batch_id)
            .bind(section.year)
            .bind(&section.academic_year)
            .bind(&section.section_name)
            .fetch_one(&mut *tx)
            .await?;
            if taken {
                return Err(StoreError::Conflict(format!(
                    "Section {} already exists",
                    section.section_name
                )));
            }

            let row = query_as::<_, Section>(&insert)
                .bind(generate_id())
                .bind(section.department_id)
                .bind(section.batch_id)
                .bind(section.year)
                .bind(&section.section_name)
                .bind(section.capacity)
                .bind(&section.academic_year)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list(&self, filter: &SectionFilter) -> StoreResult<Vec<Section>> {
        let sql = format!(
            "SELECT {} FROM sections
             WHERE is_active
               AND ($1::uuid IS NULL OR department_id = $1)
               AND ($2::uuid IS NULL OR batch_id = $2)
               AND ($3::text IS NULL OR academic_year = $3)
               AND ($4::smallint IS NULL OR year = $4)
             ORDER BY year, section_name",
            SECTION_COLUMNS
        );
        let sections = query_as::<_, Section>(&sql)
            .bind(filter.department_id)
            .bind(filter.batch_id)
            .bind(&filter.academic_year)
            .bind(filter.year)
            .fetch_all(&self.pool)
            .await?;

        Ok(sections)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Section>> {
        let sql = format!("SELECT {} FROM sections WHERE id = $1", SECTION_COLUMNS);
        Ok(query_as::<_, Section>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn update_capacity(&self, id: Uuid, capacity: i16) -> StoreResult<Section> {
        let sql = format!(
            "UPDATE sections SET capacity = $1, updated_at = NOW()
             WHERE id = $2 AND is_active
             RETURNING {}",
            SECTION_COLUMNS
        );
        query_as::<_, Section>(&sql)
            .bind(capacity)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(Section::NAME))
    }

    async fn deactivate(&self, id: Uuid) -> StoreResult<()> {
        let result = query("UPDATE sections SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Section::NAME));
        }
        Ok(())
    }
}

// Semesters

pub struct SemesterRepository {
    pool: PgPool,
}

impl SemesterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SemesterStore for SemesterRepository {
    async fn create(&self, semester: NewSemester) -> StoreResult<Semester> {
        let mut tx = self.pool.begin().await?;

        if semester.is_current {
            query(
                "UPDATE semesters SET is_current = FALSE, updated_at = NOW()
                 WHERE department_id = $1 AND is_current",
            )
            .bind(semester.department_id)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            "INSERT INTO semesters (id, semester_name, semester_number, academic_year, department_id, year,
                                    start_date, end_date, is_active, is_current)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            SEMESTER_COLUMNS
        );
        let created = query_as::<_, Semester>(&sql)
            .bind(generate_id())
            .bind(&semester.semester_name)
            .bind(semester.semester_number)
            .bind(&semester.academic_year)
            .bind(semester.department_id)
            .bind(year_of_semester(semester.semester_number))
            .bind(semester.start_date)
            .bind(semester.end_date)
            .bind(semester.is_active)
            .bind(semester.is_current)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn list(&self, department_id: Option<Uuid>) -> StoreResult<Vec<Semester>> {
        let sql = format!(
            "SELECT {} FROM semesters
             WHERE ($1::uuid IS NULL OR department_id = $1)
             ORDER BY academic_year, semester_number",
            SEMESTER_COLUMNS
        );
        Ok(query_as::<_, Semester>(&sql).bind(department_id).fetch_all(&self.pool).await?)
    }

    async fn current(&self, department_id: Uuid) -> StoreResult<Option<Semester>> {
        let sql = format!(
            "SELECT {} FROM semesters WHERE department_id = $1 AND is_current",
            SEMESTER_COLUMNS
        );
        Ok(query_as::<_, Semester>(&sql).bind(department_id).fetch_optional(&self.pool).await?)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Semester>> {
        let sql = format!("SELECT {} FROM semesters WHERE id = $1", SEMESTER_COLUMNS);
        Ok(query_as::<_, Semester>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn set_current(&self, id: Uuid) -> StoreResult<Semester> {
        let mut tx = self.pool.begin().await?;

        let department_id = query_scalar::<_, Uuid>("SELECT department_id FROM semesters WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found(Semester::NAME))?;

        // serialize concurrent switches within the department
        query("SELECT id FROM semesters WHERE department_id = $1 FOR UPDATE")
            .bind(department_id)
            .execute(&mut *tx)
            .await?;

        query(
            "UPDATE semesters SET is_current = FALSE, updated_at = NOW()
             WHERE department_id = $1 AND id <> $2 AND is_current",
        )
        .bind(department_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "UPDATE semesters SET is_current = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            SEMESTER_COLUMNS
        );
        let current = query_as::<_, Semester>(&sql).bind(id).fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Ok(current)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let is_current = query_scalar::<_, bool>("SELECT is_current FROM semesters WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found(Semester::NAME))?;
        if is_current {
            return Err(StoreError::Conflict(messages::CURRENT_SEMESTER_DELETE.to_string()));
        }

        ensure_unreferenced::<Semester>(&mut *tx, id, "semester_id").await?;

        query("DELETE FROM semesters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

// Subjects

pub struct SubjectRepository {
    pool: PgPool,
}

impl SubjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectStore for SubjectRepository {
    async fn create(&self, subject: NewSubject) -> StoreResult<Subject> {
        let sql = format!(
            "INSERT INTO subjects (id, subject_name, subject_code, department_id, year, semester, credits, subject_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            SUBJECT_COLUMNS
        );
        let created = query_as::<_, Subject>(&sql)
            .bind(generate_id())
            .bind(&subject.subject_name)
            .bind(&subject.subject_code)
            .bind(subject.department_id)
            .bind(subject.year)
            .bind(subject.semester)
            .bind(subject.credits)
            .bind(subject.subject_type)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn list(&self, filter: &SubjectFilter) -> StoreResult<Vec<Subject>> {
        let sql = format!(
            "SELECT {} FROM subjects
             WHERE ($1::uuid IS NULL OR department_id = $1)
               AND ($2::smallint IS NULL OR year = $2)
               AND ($3::smallint IS NULL OR semester = $3)
             ORDER BY year, semester, subject_code",
            SUBJECT_COLUMNS
        );
        let subjects = query_as::<_, Subject>(&sql)
            .bind(filter.department_id)
            .bind(filter.year)
            .bind(filter.semester)
            .fetch_all(&self.pool)
            .await?;

        Ok(subjects)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Subject>> {
        let sql = format!("SELECT {} FROM subjects WHERE id = $1", SUBJECT_COLUMNS);
        Ok(query_as::<_, Subject>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = query_scalar::<_, Uuid>("SELECT id FROM subjects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found(Subject::NAME));
        }

        ensure_unreferenced::<Subject>(&mut *tx, id, "subject_id").await?;

        query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

// Teacher allocations

pub struct AllocationRepository {
    pool: PgPool,
}

impl AllocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AllocationStore for AllocationRepository {
    async fn create(&self, allocation: NewAllocation) -> StoreResult<TeacherAllocation> {
        let sql = format!(
            "INSERT INTO teacher_allocations (id, teacher_id, subject_id, department_id, batch_id, section, year, academic_year)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            ALLOCATION_COLUMNS
        );
        let created = query_as::<_, TeacherAllocation>(&sql)
            .bind(generate_id())
            .bind(allocation.teacher_id)
            .bind(allocation.subject_id)
            .bind(allocation.department_id)
            .bind(allocation.batch_id)
            .bind(&allocation.section)
            .bind(allocation.year)
            .bind(&allocation.academic_year)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn list(&self, filter: &AllocationFilter) -> StoreResult<Vec<TeacherAllocation>> {
        let sql = format!(
            "SELECT {} FROM teacher_allocations
             WHERE ($1::uuid IS NULL OR teacher_id = $1)
               AND ($2::uuid IS NULL OR batch_id = $2)
               AND ($3::text IS NULL OR section = $3)
               AND ($4::text IS NULL OR academic_year = $4)
             ORDER BY academic_year, year, section, created_at",
            ALLOCATION_COLUMNS
        );
        let allocations = query_as::<_, TeacherAllocation>(&sql)
            .bind(filter.teacher_id)
            .bind(filter.batch_id)
            .bind(&filter.section)
            .bind(&filter.academic_year)
            .fetch_all(&self.pool)
            .await?;

        Ok(allocations)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<TeacherAllocation>> {
        let sql = format!("SELECT {} FROM teacher_allocations WHERE id = $1", ALLOCATION_COLUMNS);
        Ok(query_as::<_, TeacherAllocation>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = query_scalar::<_, Uuid>("SELECT id FROM teacher_allocations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found(TeacherAllocation::NAME));
        }

        ensure_unreferenced::<TeacherAllocation>(&mut *tx, id, "teacher_allocation_id").await?;

        query("DELETE FROM teacher_allocations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}
