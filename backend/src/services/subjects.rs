use campus_database::models::{year_of_semester, NewSubject, Subject, SubjectFilter};
use campus_database::Stores;
use campus_middleware::AuthUser;
use campus_models::academics::{CreateSubjectRequest, SubjectQuery};
use campus_observability::log_registry_change;
use uuid::Uuid;
use validator::Validate;

use super::SERVICE_NAME;
use crate::errors::{ServiceError, ServiceResult};

pub struct SubjectService {
    stores: Stores,
}

impl SubjectService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn create(&self, actor: &AuthUser, request: CreateSubjectRequest) -> ServiceResult<Subject> {
        request.validate()?;

        let subject_code = request.subject_code.trim().to_uppercase();
        if subject_code.len() < 2 {
            return Err(ServiceError::bad_request("Subject code must be between 2 and 20 characters"));
        }
        if year_of_semester(request.semester) != request.year {
            return Err(ServiceError::bad_request(format!(
                "Semester {} is not taught in year {}",
                request.semester, request.year
            )));
        }
        if self.stores.departments.find(request.department_id).await?.is_none() {
            return Err(ServiceError::not_found("Department"));
        }

        let subject = self
            .stores
            .subjects
            .create(NewSubject {
                subject_name: request.subject_name.trim().to_string(),
                subject_code,
                department_id: request.department_id,
                year: request.year,
                semester: request.semester,
                credits: request.credits,
                subject_type: request.subject_type,
            })
            .await?;

        log_registry_change(SERVICE_NAME, "subject", subject.id, "subject_created", Some(actor.id));
        Ok(subject)
    }

    pub async fn list(&self, query: SubjectQuery) -> ServiceResult<Vec<Subject>> {
        let filter = SubjectFilter {
            department_id: query.department_id,
            year: query.year,
            semester: query.semester,
        };
        Ok(self.stores.subjects.list(&filter).await?)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        self.stores.subjects.delete(id).await?;
        log_registry_change(SERVICE_NAME, "subject", id, "subject_deleted", Some(actor.id));
        Ok(())
    }
}
