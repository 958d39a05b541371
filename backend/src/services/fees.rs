use campus_database::models::{Fee, FeeFilter, NewFee, Payment, StudentFilter};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::fees::{CreateFeeRequest, DiscountRequest, FeeQuery, PaymentRequest};
use campus_observability::log_fee_event;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use super::SERVICE_NAME;
use crate::errors::{ServiceError, ServiceResult};

/// Amounts are stored as `NUMERIC(12, 2)` in both stores.
pub fn check_money_scale(amount: Decimal, what: &str) -> ServiceResult<()> {
    if amount.normalize().scale() > 2 {
        return Err(ServiceError::bad_request(format!(
            "{} cannot have more than two decimal places",
            what
        )));
    }
    Ok(())
}

/// Rejects discounts outside `0..=total`.
pub fn check_discount(discount: Decimal, total: Decimal) -> ServiceResult<()> {
    check_money_scale(discount, "Discount")?;
    if discount < Decimal::ZERO {
        return Err(ServiceError::bad_request("Discount cannot be negative"));
    }
    if discount > total {
        return Err(ServiceError::bad_request("Discount cannot exceed the total amount"));
    }
    Ok(())
}

pub struct FeeService {
    stores: Stores,
}

impl FeeService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Without an explicit student list the fee goes to every active
    /// student of the department and batch.
    pub async fn create(&self, actor: &AuthUser, request: CreateFeeRequest) -> ServiceResult<Fee> {
        request.validate()?;
        if request.total_amount <= Decimal::ZERO {
            return Err(ServiceError::bad_request("Total amount must be greater than zero"));
        }
        check_money_scale(request.total_amount, "Total amount")?;

        if self.stores.departments.find(request.department_id).await?.is_none() {
            return Err(ServiceError::not_found("Department"));
        }
        let batch = self
            .stores
            .batches
            .find(request.batch_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Batch"))?;
        let semester = self
            .stores
            .semesters
            .find(request.semester_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Semester"))?;
        if !batch.includes(request.department_id) {
            return Err(ServiceError::bad_request("Department is not part of this batch"));
        }
        if semester.department_id != request.department_id {
            return Err(ServiceError::bad_request("Semester does not belong to this department"));
        }

        let eligible: Vec<Uuid> = self
            .stores
            .users
            .list_students(&StudentFilter {
                department_id: Some(request.department_id),
                batch_id: Some(request.batch_id),
                section: None,
            })
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let students = match request.students {
            None => eligible,
            Some(students) => {
                let eligible: HashSet<Uuid> = eligible.into_iter().collect();
                let mut seen = HashSet::with_capacity(students.len());
                for student_id in &students {
                    if !eligible.contains(student_id) {
                        return Err(ServiceError::bad_request(format!(
                            "Student {} is not an active student of this department and batch",
                            student_id
                        )));
                    }
                    if !seen.insert(*student_id) {
                        return Err(ServiceError::bad_request(format!(
                            "Student {} is listed more than once",
                            student_id
                        )));
                    }
                }
                students
            }
        };

        let fee = self
            .stores
            .fees
            .create(NewFee {
                department_id: request.department_id,
                batch_id: request.batch_id,
                semester_id: request.semester_id,
                fee_name: request.fee_name.trim().to_string(),
                total_amount: request.total_amount,
                due_date: request.due_date,
                students,
            })
            .await?;

        let amount = fee.total_amount.to_string();
        log_fee_event(SERVICE_NAME, "fee_created", fee.id, Some(&amount), Some(actor.id));
        Ok(fee)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Fee> {
        self.stores
            .fees
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Fee"))
    }

    pub async fn list(&self, query: FeeQuery) -> ServiceResult<Vec<Fee>> {
        let filter = FeeFilter {
            department_id: query.department_id,
            batch_id: query.batch_id,
            semester_id: query.semester_id,
        };
        Ok(self.stores.fees.list(&filter).await?)
    }

    /// Overwrites the student's discount; paid assignments are frozen.
    pub async fn apply_discount(
        &self,
        actor: &AuthUser,
        fee_id: Uuid,
        student_id: Uuid,
        request: DiscountRequest,
    ) -> ServiceResult<Fee> {
        let fee = self.get(fee_id).await?;
        check_discount(request.discount, fee.total_amount)?;

        let fee = self.stores.fees.apply_discount(fee_id, student_id, request.discount).await?;
        let amount = request.discount.to_string();
        log_fee_event(SERVICE_NAME, "discount_applied", fee_id, Some(&amount), Some(actor.id));
        Ok(fee)
    }

    pub async fn mark_paid(
        &self,
        actor: &AuthUser,
        fee_id: Uuid,
        student_id: Uuid,
        request: PaymentRequest,
    ) -> ServiceResult<Fee> {
        request.validate()?;

        let payment = Payment {
            payment_mode: request.payment_mode,
            transaction_id: request
                .transaction_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            payment_date: Utc::now(),
        };
        let fee = self.stores.fees.mark_paid(fee_id, student_id, payment).await?;

        let amount = fee
            .assignment(student_id)
            .map(|a| a.amount_after_discount.to_string());
        log_fee_event(SERVICE_NAME, "fee_paid", fee_id, amount.as_deref(), Some(actor.id));
        Ok(fee)
    }
}
