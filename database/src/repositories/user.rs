use async_trait::async_trait;
use sqlx::{query_as, PgPool};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{NewUser, StudentFilter, User};
use crate::utils::generate_id;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, department_id, batch_id, section, \
     enrollment_id, employee_id, can_register_students, is_active, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// `email` must already be lowercased.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Active students matching every supplied key, ordered by name.
    async fn list_students(&self, filter: &StudentFilter) -> StoreResult<Vec<User>>;

    /// Active teachers, optionally of one department, ordered by name.
    async fn list_teachers(&self, department_id: Option<Uuid>) -> StoreResult<Vec<User>>;
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, department_id, batch_id, section,
                                enrollment_id, employee_id, can_register_students)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {}",
            USER_COLUMNS
        );
        let created = query_as::<_, User>(&sql)
            .bind(generate_id())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.department_id)
            .bind(user.batch_id)
            .bind(&user.section)
            .bind(&user.enrollment_id)
            .bind(&user.employee_id)
            .bind(user.can_register_students)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = $1", USER_COLUMNS);
        Ok(query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn list_students(&self, filter: &StudentFilter) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users
             WHERE role = 'student' AND is_active
               AND ($1::uuid IS NULL OR department_id = $1)
               AND ($2::uuid IS NULL OR batch_id = $2)
               AND ($3::text IS NULL OR section = $3)
             ORDER BY name, email",
            USER_COLUMNS
        );
        let students = query_as::<_, User>(&sql)
            .bind(filter.department_id)
            .bind(filter.batch_id)
            .bind(&filter.section)
            .fetch_all(&self.pool)
            .await?;

        Ok(students)
    }

    async fn list_teachers(&self, department_id: Option<Uuid>) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users
             WHERE role = 'teacher' AND is_active
               AND ($1::uuid IS NULL OR department_id = $1)
             ORDER BY name, email",
            USER_COLUMNS
        );
        let teachers = query_as::<_, User>(&sql)
            .bind(department_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(teachers)
    }
}
