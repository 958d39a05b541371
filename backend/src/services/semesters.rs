use campus_database::models::{NewSemester, Semester};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::academics::{CreateSemesterRequest, SemesterQuery};
use campus_observability::{log_registry_change, log_semester_switched};
use uuid::Uuid;
use validator::Validate;

use super::{require_academic_year, SERVICE_NAME};
use crate::errors::{ServiceError, ServiceResult};

pub struct SemesterService {
    stores: Stores,
}

impl SemesterService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// A semester created as current takes over from the department's
    /// previous current semester.
    pub async fn create(&self, actor: &AuthUser, request: CreateSemesterRequest) -> ServiceResult<Semester> {
        request.validate()?;
        let academic_year = require_academic_year(&request.academic_year)?;
        if request.start_date >= request.end_date {
            return Err(ServiceError::bad_request("Start date must be before end date"));
        }
        if self.stores.departments.find(request.department_id).await?.is_none() {
            return Err(ServiceError::not_found("Department"));
        }

        let is_current = request.is_current.unwrap_or(false);
        let previous = if is_current {
            self.stores.semesters.current(request.department_id).await?
        } else {
            None
        };

        let semester = self
            .stores
            .semesters
            .create(NewSemester {
                semester_name: request.semester_name.trim().to_string(),
                semester_number: request.semester_number,
                academic_year,
                department_id: request.department_id,
                start_date: request.start_date,
                end_date: request.end_date,
                is_active: request.is_active.unwrap_or(true),
                is_current,
            })
            .await?;

        log_registry_change(SERVICE_NAME, "semester", semester.id, "semester_created", Some(actor.id));
        if is_current {
            log_semester_switched(SERVICE_NAME, semester.id, previous.map(|s| s.id), Some(actor.id));
        }
        Ok(semester)
    }

    pub async fn list(&self, query: SemesterQuery) -> ServiceResult<Vec<Semester>> {
        Ok(self.stores.semesters.list(query.department_id).await?)
    }

    pub async fn current(&self, department_id: Uuid) -> ServiceResult<Option<Semester>> {
        Ok(self.stores.semesters.current(department_id).await?)
    }

    pub async fn set_current(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Semester> {
        let semester = self
            .stores
            .semesters
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Semester"))?;
        let previous = self.stores.semesters.current(semester.department_id).await?;

        let current = self.stores.semesters.set_current(id).await?;
        log_semester_switched(SERVICE_NAME, current.id, previous.map(|s| s.id), Some(actor.id));
        Ok(current)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.semesters.delete(id).await?;
        log_registry_change(SERVICE_NAME, "semester", id, "semester_deleted", Some(actor.id));
        Ok(())
    }
}
