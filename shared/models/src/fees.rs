use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_mode", rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Card,
    BankTransfer,
    Upi,
    Cheque,
    Online,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeeRequest {
    pub department_id: Uuid,
    pub batch_id: Uuid,
    pub semester_id: Uuid,
    #[validate(length(min = 2, max = 150, message = "Fee name must be between 2 and 150 characters"))]
    pub fee_name: String,
    pub total_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    /// Defaults to every active student of the department and batch.
    pub students: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRequest {
    pub discount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_mode: PaymentMode,
    #[validate(length(min = 1, max = 100, message = "Transaction id must be between 1 and 100 characters"))]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuery {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub semester_id: Option<Uuid>,
}
