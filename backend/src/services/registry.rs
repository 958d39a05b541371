//! Departments and batches.

use campus_database::models::{Batch, BatchOption, Department, NewBatch, NewDepartment};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::academics::{parse_year_span, CreateBatchRequest, DepartmentRequest};
use campus_observability::log_registry_change;
use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use super::SERVICE_NAME;
use crate::errors::{ServiceError, ServiceResult};

pub const MAX_SECTIONS_PER_BATCH: i16 = 6;

/// A batch runs from June 1st of its first year to May 31st of its last.
pub fn batch_dates(batch_name: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (start_year, end_year) = parse_year_span(batch_name)?;
    Some((
        NaiveDate::from_ymd_opt(start_year, 6, 1)?,
        NaiveDate::from_ymd_opt(end_year, 5, 31)?,
    ))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct RegistryService {
    stores: Stores,
}

impl RegistryService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    // Departments

    pub async fn create_department(&self, actor: &AuthUser, request: DepartmentRequest) -> ServiceResult<Department> {
        let department = self.stores.departments.create(Self::department_fields(request)?).await?;
        log_registry_change(SERVICE_NAME, "department", department.id, "department_created", Some(actor.id));
        Ok(department)
    }

    pub async fn list_departments(&self) -> ServiceResult<Vec<Department>> {
        Ok(self.stores.departments.list().await?)
    }

    pub async fn get_department(&self, id: Uuid) -> ServiceResult<Department> {
        self.stores
            .departments
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Department"))
    }

    pub async fn update_department(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: DepartmentRequest,
    ) -> ServiceResult<Department> {
        let department = self.stores.departments.update(id, Self::department_fields(request)?).await?;
        log_registry_change(SERVICE_NAME, "department", id, "department_updated", Some(actor.id));
        Ok(department)
    }

    pub async fn delete_department(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.departments.delete(id).await?;
        log_registry_change(SERVICE_NAME, "department", id, "department_deleted", Some(actor.id));
        Ok(())
    }

    fn department_fields(request: DepartmentRequest) -> ServiceResult<NewDepartment> {
        request.validate()?;
        let department_name = request.department_name.trim().to_string();
        if department_name.len() < 2 {
            return Err(ServiceError::bad_request(
                "Department name must be between 2 and 100 characters",
            ));
        }
        Ok(NewDepartment {
            department_name,
            description: optional_text(request.description),
            image_url: optional_text(request.image_url),
        })
    }

    // Batches

    pub async fn create_batch(&self, actor: &AuthUser, request: CreateBatchRequest) -> ServiceResult<Batch> {
        request.validate()?;

        let batch_name = request.batch_name.trim().to_string();
        let (start_date, end_date) = batch_dates(&batch_name).ok_or_else(|| {
            ServiceError::bad_request("Batch name must look like 2023-2027 with the end year after the start year")
        })?;

        let mut departments = Vec::with_capacity(request.departments.len());
        for link in &request.departments {
            if !(1..=MAX_SECTIONS_PER_BATCH).contains(&link.number_of_sections) {
                return Err(ServiceError::bad_request("Number of sections must be between 1 and 6"));
            }
            departments.push((link.department_id, link.number_of_sections));
        }

        let batch = self
            .stores
            .batches
            .create(NewBatch {
                batch_name,
                start_date,
                end_date,
                departments,
            })
            .await?;

        log_registry_change(SERVICE_NAME, "batch", batch.id, "batch_created", Some(actor.id));
        Ok(batch)
    }

    pub async fn list_batches(&self) -> ServiceResult<Vec<Batch>> {
        Ok(self.stores.batches.list().await?)
    }

    pub async fn get_batch(&self, id: Uuid) -> ServiceResult<Batch> {
        self.stores
            .batches
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Batch"))
    }

    /// Unknown departments give an empty list.
    pub async fn batches_for_department(&self, department_id: Uuid) -> ServiceResult<Vec<BatchOption>> {
        Ok(self.stores.batches.list_for_department(department_id).await?)
    }

    pub async fn delete_batch(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.batches.delete(id).await?;
        log_registry_change(SERVICE_NAME, "batch", id, "batch_deleted", Some(actor.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn batch_years_become_academic_dates() {
        let (start, end) = batch_dates("2023-2027").unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2023, 6, 1));
        assert_eq!((end.year(), end.month(), end.day()), (2027, 5, 31));
    }

    #[test]
    fn batch_end_must_follow_start() {
        assert!(batch_dates("2027-2023").is_none());
        assert!(batch_dates("2023-2023").is_none());
        assert!(batch_dates("batch-one").is_none());
    }
}
