use campus_database::models::{AllocationFilter, NewAllocation, TeacherAllocation};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::academics::{AllocationQuery, CreateAllocationRequest};
use campus_observability::log_registry_change;
use uuid::Uuid;
use validator::Validate;

use super::sections::require_active_section;
use super::{normalize_section, require_academic_year, SERVICE_NAME};
use crate::errors::{ServiceError, ServiceResult};

pub struct AllocationService {
    stores: Stores,
}

impl AllocationService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn create(&self, actor: &AuthUser, request: CreateAllocationRequest) -> ServiceResult<TeacherAllocation> {
        request.validate()?;
        let academic_year = require_academic_year(&request.academic_year)?;
        let section = normalize_section(&request.section)?;

        let teacher = self
            .stores
            .users
            .find(request.teacher_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Teacher"))?;
        if !teacher.is_teacher() || !teacher.is_active {
            return Err(ServiceError::bad_request("Allocated user must be an active teacher"));
        }

        let subject = self
            .stores
            .subjects
            .find(request.subject_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subject"))?;
        if subject.department_id != request.department_id {
            return Err(ServiceError::bad_request("Subject does not belong to this department"));
        }
        if subject.year != request.year {
            return Err(ServiceError::bad_request(format!(
                "Subject {} is taught in year {}",
                subject.subject_code, subject.year
            )));
        }

        let batch = self
            .stores
            .batches
            .find(request.batch_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Batch"))?;
        if !batch.includes(request.department_id) {
            return Err(ServiceError::bad_request("Department is not part of this batch"));
        }
        require_active_section(
            &self.stores,
            request.department_id,
            batch.id,
            request.year,
            &academic_year,
            &section,
        )
        .await?;

        let allocation = self
            .stores
            .allocations
            .create(NewAllocation {
                teacher_id: teacher.id,
                subject_id: subject.id,
                department_id: request.department_id,
                batch_id: batch.id,
                section,
                year: request.year,
                academic_year,
            })
            .await?;

        log_registry_change(SERVICE_NAME, "teacher_allocation", allocation.id, "allocation_created", Some(actor.id));
        Ok(allocation)
    }

    pub async fn list(&self, query: AllocationQuery) -> ServiceResult<Vec<TeacherAllocation>> {
        let section = match query.section.as_deref() {
            Some(section) => Some(normalize_section(section)?),
            None => None,
        };
        let filter = AllocationFilter {
            teacher_id: query.teacher_id,
            batch_id: query.batch_id,
            section,
            academic_year: query.academic_year.map(|y| y.trim().to_string()),
        };
        Ok(self.stores.allocations.list(&filter).await?)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.allocations.delete(id).await?;
        log_registry_change(SERVICE_NAME, "teacher_allocation", id, "allocation_deleted", Some(actor.id));
        Ok(())
    }
}
