use campus_models::fees::PaymentMode;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DeletionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub id: Uuid,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub semester_id: Uuid,
    pub fee_name: String,
    pub total_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    #[sqlx(skip)]
    pub assigned_to_students: Vec<FeeAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

super::impl_model!(Fee, "Fee", DeletionPolicy::Detach);

impl Fee {
    pub fn assignment(&self, student_id: Uuid) -> Option<&FeeAssignment> {
        self.assigned_to_students.iter().find(|a| a.student_id == student_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeeAssignment {
    pub student_id: Uuid,
    pub discount: Decimal,
    pub amount_after_discount: Decimal,
    pub is_paid: bool,
    pub payment_mode: Option<PaymentMode>,
    pub payment_date: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
}

impl FeeAssignment {
    pub fn unpaid(student_id: Uuid, total_amount: Decimal) -> Self {
        Self {
            student_id,
            discount: Decimal::ZERO,
            amount_after_discount: total_amount,
            is_paid: false,
            payment_mode: None,
            payment_date: None,
            transaction_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFee {
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub semester_id: Uuid,
    pub fee_name: String,
    pub total_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub students: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub payment_mode: PaymentMode,
    pub transaction_id: Option<String>,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct FeeFilter {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub semester_id: Option<Uuid>,
}

impl FeeFilter {
    pub fn matches(&self, fee: &Fee) -> bool {
        self.department_id.map_or(true, |d| fee.department_id == d)
            && self.batch_id.map_or(true, |b| fee.batch_id == b)
            && self.semester_id.map_or(true, |s| fee.semester_id == s)
    }
}
