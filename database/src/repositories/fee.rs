use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{query, query_as, query_scalar, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{messages, StoreError, StoreResult};
use crate::models::{Fee, FeeAssignment, FeeFilter, Model, NewFee, Payment};
use crate::utils::generate_id;

const FEE_COLUMNS: &str =
    "id, department_id, batch_id, semester_id, fee_name, total_amount, due_date, created_at, updated_at";
const ASSIGNMENT_COLUMNS: &str =
    "student_id, discount, amount_after_discount, is_paid, payment_mode, payment_date, transaction_id";

#[async_trait]
pub trait FeeStore: Send + Sync {
    /// Creates the fee with one unpaid, undiscounted assignment per student.
    async fn create(&self, fee: NewFee) -> StoreResult<Fee>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Fee>>;

    async fn list(&self, filter: &FeeFilter) -> StoreResult<Vec<Fee>>;

    /// Overwrites the student's discount and recomputes the amount due.
    /// Refused once the assignment is paid.
    async fn apply_discount(&self, fee_id: Uuid, student_id: Uuid, discount: Decimal) -> StoreResult<Fee>;

    /// Records the single payment of an assignment.
    async fn mark_paid(&self, fee_id: Uuid, student_id: Uuid, payment: Payment) -> StoreResult<Fee>;
}

pub struct FeeRepository {
    pool: PgPool,
}

impl FeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn assignments(&self, fee_id: Uuid) -> StoreResult<Vec<FeeAssignment>> {
        let sql = format!(
            "SELECT {} FROM fee_assignments WHERE fee_id = $1 ORDER BY position",
            ASSIGNMENT_COLUMNS
        );
        Ok(query_as::<_, FeeAssignment>(&sql).bind(fee_id).fetch_all(&self.pool).await?)
    }

    async fn load(&self, fee_id: Uuid) -> StoreResult<Fee> {
        self.find(fee_id)
            .await?
            .ok_or_else(|| StoreError::not_found(Fee::NAME))
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    fee_id: Uuid,
    #[sqlx(flatten)]
    assignment: FeeAssignment,
}

#[async_trait]
impl FeeStore for FeeRepository {
    async fn create(&self, fee: NewFee) -> StoreResult<Fee> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO fees (id, department_id, batch_id, semester_id, fee_name, total_amount, due_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            FEE_COLUMNS
        );
        let mut created = query_as::<_, Fee>(&sql)
            .bind(generate_id())
            .bind(fee.department_id)
            .bind(fee.batch_id)
            .bind(fee.semester_id)
            .bind(&fee.fee_name)
            .bind(fee.total_amount)
            .bind(fee.due_date)
            .fetch_one(&mut *tx)
            .await?;

        for (position, student_id) in fee.students.iter().enumerate() {
            query(
                "INSERT INTO fee_assignments (fee_id, student_id, discount, amount_after_discount, position)
                 VALUES ($1, $2, 0, $3, $4)",
            )
            .bind(created.id)
            .bind(*student_id)
            .bind(fee.total_amount)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;

            created
                .assigned_to_students
                .push(FeeAssignment::unpaid(*student_id, fee.total_amount));
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Fee>> {
        let sql = format!("SELECT {} FROM fees WHERE id = $1", FEE_COLUMNS);
        let Some(mut fee) = query_as::<_, Fee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        fee.assigned_to_students = self.assignments(id).await?;
        Ok(Some(fee))
    }

    async fn list(&self, filter: &FeeFilter) -> StoreResult<Vec<Fee>> {
        let sql = format!(
            "SELECT {} FROM fees
             WHERE ($1::uuid IS NULL OR department_id = $1)
               AND ($2::uuid IS NULL OR batch_id = $2)
               AND ($3::uuid IS NULL OR semester_id = $3)
             ORDER BY created_at DESC",
            FEE_COLUMNS
        );
        let mut fees = query_as::<_, Fee>(&sql)
            .bind(filter.department_id)
            .bind(filter.batch_id)
            .bind(filter.semester_id)
            .fetch_all(&self.pool)
            .await?;

        if fees.is_empty() {
            return Ok(fees);
        }

        let ids: Vec<Uuid> = fees.iter().map(|f| f.id).collect();
        let sql = format!(
            "SELECT fee_id, {} FROM fee_assignments WHERE fee_id = ANY($1) ORDER BY fee_id, position",
            ASSIGNMENT_COLUMNS
        );
        let rows = query_as::<_, AssignmentRow>(&sql).bind(&ids).fetch_all(&self.pool).await?;

        let mut by_fee: HashMap<Uuid, Vec<FeeAssignment>> = HashMap::new();
        for row in rows {
            by_fee.entry(row.fee_id).or_default().push(row.assignment);
        }
        for fee in &mut fees {
            fee.assigned_to_students = by_fee.remove(&fee.id).unwrap_or_default();
        }

        Ok(fees)
    }

    async fn apply_discount(&self, fee_id: Uuid, student_id: Uuid, discount: Decimal) -> StoreResult<Fee> {
        let mut tx = self.pool.begin().await?;

        let total = query_scalar::<_, Decimal>("SELECT total_amount FROM fees WHERE id = $1 FOR UPDATE")
            .bind(fee_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found(Fee::NAME))?;

        let is_paid = query_scalar::<_, bool>(
            "SELECT is_paid FROM fee_assignments WHERE fee_id = $1 AND student_id = $2 FOR UPDATE",
        )
        .bind(fee_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(messages::ASSIGNMENT_NOT_FOUND.to_string()))?;
        if is_paid {
            return Err(StoreError::Conflict(messages::DISCOUNT_AFTER_PAYMENT.to_string()));
        }

        query(
            "UPDATE fee_assignments SET discount = $1, amount_after_discount = $2
             WHERE fee_id = $3 AND student_id = $4",
        )
        .bind(discount)
        .bind(total - discount)
        .bind(fee_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        query("UPDATE fees SET updated_at = NOW() WHERE id = $1")
            .bind(fee_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.load(fee_id).await
    }

    async fn mark_paid(&self, fee_id: Uuid, student_id: Uuid, payment: Payment) -> StoreResult<Fee> {
        let mut tx = self.pool.begin().await?;

        let is_paid = query_scalar::<_, bool>(
            "SELECT is_paid FROM fee_assignments WHERE fee_id = $1 AND student_id = $2 FOR UPDATE",
        )
        .bind(fee_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?;

        match is_paid {
            None => {
                let fee_exists: bool = query_scalar("SELECT EXISTS (SELECT 1 FROM fees WHERE id = $1)")
                    .bind(fee_id)
                    .fetch_one(&mut *tx)
                    .await?;
                return Err(if fee_exists {
                    StoreError::NotFound(messages::ASSIGNMENT_NOT_FOUND.to_string())
                } else {
                    StoreError::not_found(Fee::NAME)
                });
            }
            Some(true) => return Err(StoreError::Conflict(messages::ALREADY_PAID.to_string())),
            Some(false) => {}
        }

        query(
            "UPDATE fee_assignments
             SET is_paid = TRUE, payment_mode = $1, payment_date = $2, transaction_id = $3
             WHERE fee_id = $4 AND student_id = $5",
        )
        .bind(payment.payment_mode)
        .bind(payment.payment_date)
        .bind(&payment.transaction_id)
        .bind(fee_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        query("UPDATE fees SET updated_at = NOW() WHERE id = $1")
            .bind(fee_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.load(fee_id).await
    }
}
