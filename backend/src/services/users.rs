use campus_database::models::{NewUser, StudentFilter, User};
use campus_database::utils::{hash_password, normalize_email};
use campus_database::Stores;
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::{StudentQuery, TeacherQuery};
use campus_models::auth::RegisterUserRequest;
use campus_models::RoleKind;
use campus_observability::log_registry_change;
use uuid::Uuid;
use validator::Validate;

use super::sections::{enrolled_count, ensure_room, require_active_section};
use super::{normalize_section, require_academic_year, SERVICE_NAME};
use crate::errors::{ServiceError, ServiceResult};

pub struct UserService {
    stores: Stores,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(stores: Stores, bcrypt_cost: u32) -> Self {
        Self { stores, bcrypt_cost }
    }

    /// Admins register anyone; teachers holding the registration flag
    /// register students only. Students join an open Section with a free seat.
    pub async fn register(&self, actor: &AuthUser, request: RegisterUserRequest) -> ServiceResult<User> {
        request.validate()?;

        let needed = match request.role {
            RoleKind::Student => Capability::RegisterStudents,
            _ => Capability::RegisterStaff,
        };
        actor.require(needed)?;

        let (department_id, batch_id, section) = match request.role {
            RoleKind::Student => {
                let (Some(department_id), Some(batch_id), Some(section), Some(year), Some(academic_year)) = (
                    request.department_id,
                    request.batch_id,
                    request.section.as_deref(),
                    request.year,
                    request.academic_year.as_deref(),
                ) else {
                    return Err(ServiceError::bad_request(
                        "Students need a department, a batch, a section, a year and an academic year",
                    ));
                };
                self.require_enrollment_target(department_id, batch_id).await?;
                let academic_year = require_academic_year(academic_year)?;
                let section = normalize_section(section)?;

                let placed =
                    require_active_section(&self.stores, department_id, batch_id, year, &academic_year, &section)
                        .await?;
                let enrolled = enrolled_count(&self.stores, &placed).await?;
                ensure_room(&placed, enrolled)?;

                (Some(department_id), Some(batch_id), Some(section))
            }
            _ => {
                if let Some(department_id) = request.department_id {
                    self.require_department(department_id).await?;
                }
                (request.department_id, None, None)
            }
        };

        let user = self
            .stores
            .users
            .create(NewUser {
                name: request.name.trim().to_string(),
                email: normalize_email(&request.email),
                password_hash: hash_password(&request.password, self.bcrypt_cost)?,
                role: request.role,
                department_id,
                batch_id,
                section,
                enrollment_id: request.enrollment_id,
                employee_id: request.employee_id,
                can_register_students: request.role == RoleKind::Teacher && request.can_register_students,
            })
            .await?;

        log_registry_change(SERVICE_NAME, "user", user.id, "user_registered", Some(actor.id));
        Ok(user)
    }

    pub async fn me(&self, actor: &AuthUser) -> ServiceResult<User> {
        self.stores
            .users
            .find(actor.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn list_students(&self, query: StudentQuery) -> ServiceResult<Vec<User>> {
        let section = match query.section.as_deref() {
            Some(section) => Some(normalize_section(section)?),
            None => None,
        };
        let filter = StudentFilter {
            department_id: query.department_id,
            batch_id: query.batch_id,
            section,
        };
        Ok(self.stores.users.list_students(&filter).await?)
    }

    pub async fn list_teachers(&self, query: TeacherQuery) -> ServiceResult<Vec<User>> {
        Ok(self.stores.users.list_teachers(query.department_id).await?)
    }

    async fn require_department(&self, department_id: Uuid) -> ServiceResult<()> {
        match self.stores.departments.find(department_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("Department")),
        }
    }

    async fn require_enrollment_target(&self, department_id: Uuid, batch_id: Uuid) -> ServiceResult<()> {
        self.require_department(department_id).await?;
        let batch = self
            .stores
            .batches
            .find(batch_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Batch"))?;
        if !batch.includes(department_id) {
            return Err(ServiceError::bad_request("Department is not part of this batch"));
        }
        Ok(())
    }
}
