use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::ensure_unreferenced;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    format_department_code, Batch, BatchDepartment, BatchOption, Department, Model, NewBatch,
    NewDepartment,
};
use crate::utils::generate_id;

const DEPARTMENT_COLUMNS: &str =
    "id, department_code, department_name, description, image_url, created_at, updated_at";
const BATCH_COLUMNS: &str = "id, batch_name, start_date, end_date, created_at, updated_at";

#[async_trait]
pub trait DepartmentStore: Send + Sync {
    /// Allocates the next `DEPnn` code.
    async fn create(&self, department: NewDepartment) -> StoreResult<Department>;

    async fn list(&self) -> StoreResult<Vec<Department>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Department>>;

    async fn update(&self, id: Uuid, department: NewDepartment) -> StoreResult<Department>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Inserts the batch and its department links atomically, copying each
    /// department's current name onto its link.
    async fn create(&self, batch: NewBatch) -> StoreResult<Batch>;

    async fn list(&self) -> StoreResult<Vec<Batch>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Batch>>;

    /// Batches linked to a department; empty for unknown ids.
    async fn list_for_department(&self, department_id: Uuid) -> StoreResult<Vec<BatchOption>>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn batch_ids(&self, department_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = query_scalar::<_, Uuid>(
            "SELECT bd.batch_id FROM batch_departments bd
             JOIN batches b ON b.id = bd.batch_id
             WHERE bd.department_id = $1
             ORDER BY b.batch_name",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl DepartmentStore for DepartmentRepository {
    async fn create(&self, department: NewDepartment) -> StoreResult<Department> {
        let sequence: i64 = query_scalar("SELECT nextval('department_code_seq')")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "INSERT INTO departments (id, department_code, department_name, description, image_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            DEPARTMENT_COLUMNS
        );
        let created = query_as::<_, Department>(&sql)
            .bind(generate_id())
            .bind(format_department_code(sequence))
            .bind(&department.department_name)
            .bind(&department.description)
            .bind(&department.image_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn list(&self) -> StoreResult<Vec<Department>> {
        let sql = format!("SELECT {} FROM departments ORDER BY created_at, department_code", DEPARTMENT_COLUMNS);
        let mut departments = query_as::<_, Department>(&sql).fetch_all(&self.pool).await?;

        let links = query_as::<_, (Uuid, Uuid)>(
            "SELECT bd.department_id, bd.batch_id FROM batch_departments bd
             JOIN batches b ON b.id = bd.batch_id
             ORDER BY b.batch_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_department: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (department_id, batch_id) in links {
            by_department.entry(department_id).or_default().push(batch_id);
        }
        for department in &mut departments {
            department.batches = by_department.remove(&department.id).unwrap_or_default();
        }

        Ok(departments)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Department>> {
        let sql = format!("SELECT {} FROM departments WHERE id = $1", DEPARTMENT_COLUMNS);
        let Some(mut department) = query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        department.batches = self.batch_ids(id).await?;
        Ok(Some(department))
    }

    async fn update(&self, id: Uuid, department: NewDepartment) -> StoreResult<Department> {
        let sql = format!(
            "UPDATE departments
             SET department_name = $1, description = $2, image_url = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING {}",
            DEPARTMENT_COLUMNS
        );
        let mut updated = query_as::<_, Department>(&sql)
            .bind(&department.department_name)
            .bind(&department.description)
            .bind(&department.image_url)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(Department::NAME))?;

        updated.batches = self.batch_ids(id).await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = query_scalar::<_, Uuid>("SELECT id FROM departments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found(Department::NAME));
        }

        ensure_unreferenced::<Department>(&mut *tx, id, "department_id").await?;

        query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

pub struct BatchRepository {
    pool: PgPool,
}

impl BatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn links(&self, batch_id: Uuid) -> StoreResult<Vec<BatchDepartment>> {
        let links = query_as::<_, BatchDepartment>(
            "SELECT department_id, department_name, number_of_sections
             FROM batch_departments WHERE batch_id = $1 ORDER BY position",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    batch_id: Uuid,
    #[sqlx(flatten)]
    link: BatchDepartment,
}

#[async_trait]
impl BatchStore for BatchRepository {
    async fn create(&self, batch: NewBatch) -> StoreResult<Batch> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO batches (id, batch_name, start_date, end_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            BATCH_COLUMNS
        );
        let mut created = query_as::<_, Batch>(&sql)
            .bind(generate_id())
            .bind(&batch.batch_name)
            .bind(batch.start_date)
            .bind(batch.end_date)
            .fetch_one(&mut *tx)
            .await?;

        for (position, (department_id, number_of_sections)) in batch.departments.iter().enumerate() {
            let link = query_as::<_, BatchDepartment>(
                "INSERT INTO batch_departments
                     (batch_id, department_id, department_name, number_of_sections, position)
                 SELECT $1, id, department_name, $3, $4 FROM departments WHERE id = $2
                 RETURNING department_id, department_name, number_of_sections",
            )
            .bind(created.id)
            .bind(*department_id)
            .bind(*number_of_sections)
            .bind(position as i16)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found(Department::NAME))?;

            created.departments.push(link);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list(&self) -> StoreResult<Vec<Batch>> {
        let sql = format!("SELECT {} FROM batches ORDER BY batch_name", BATCH_COLUMNS);
        let mut batches = query_as::<_, Batch>(&sql).fetch_all(&self.pool).await?;

        let rows = query_as::<_, LinkRow>(
            "SELECT batch_id, department_id, department_name, number_of_sections
             FROM batch_departments ORDER BY batch_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_batch: HashMap<Uuid, Vec<BatchDepartment>> = HashMap::new();
        for row in rows {
            by_batch.entry(row.batch_id).or_default().push(row.link);
        }
        for batch in &mut batches {
            batch.departments = by_batch.remove(&batch.id).unwrap_or_default();
        }

        Ok(batches)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Batch>> {
        let sql = format!("SELECT {} FROM batches WHERE id = $1", BATCH_COLUMNS);
        let Some(mut batch) = query_as::<_, Batch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        batch.departments = self.links(id).await?;
        Ok(Some(batch))
    }

    async fn list_for_department(&self, department_id: Uuid) -> StoreResult<Vec<BatchOption>> {
        let options = query_as::<_, BatchOption>(
            "SELECT b.id AS batch_id, b.batch_name, bd.number_of_sections
             FROM batch_departments bd
             JOIN batches b ON b.id = bd.batch_id
             WHERE bd.department_id = $1
             ORDER BY b.batch_name",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists = query_scalar::<_, Uuid>("SELECT id FROM batches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found(Batch::NAME));
        }

        ensure_unreferenced::<Batch>(&mut *tx, id, "batch_id").await?;

        // department links go with the batch (ON DELETE CASCADE)
        query("DELETE FROM batches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}
