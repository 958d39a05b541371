use campus_models::{Role, RoleKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DeletionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: RoleKind,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub section: Option<String>,
    pub enrollment_id: Option<String>,
    pub employee_id: Option<String>,
    pub can_register_students: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_parts(self.role, self.can_register_students)
    }

    pub fn is_student(&self) -> bool {
        self.role == RoleKind::Student
    }

    pub fn is_teacher(&self) -> bool {
        self.role == RoleKind::Teacher
    }

    /// Active student enrolled in the given batch and section.
    pub fn is_enrolled_in(&self, batch_id: Uuid, section: &str) -> bool {
        self.is_student()
            && self.is_active
            && self.batch_id == Some(batch_id)
            && self.section.as_deref() == Some(section)
    }
}

super::impl_model!(User, "User", DeletionPolicy::Soft);

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    /// Already lowercased.
    pub email: String,
    pub password_hash: String,
    pub role: RoleKind,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub section: Option<String>,
    pub enrollment_id: Option<String>,
    pub employee_id: Option<String>,
    pub can_register_students: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub section: Option<String>,
}

impl StudentFilter {
    pub fn matches(&self, user: &User) -> bool {
        user.is_student()
            && user.is_active
            && self.department_id.map_or(true, |d| user.department_id == Some(d))
            && self.batch_id.map_or(true, |b| user.batch_id == Some(b))
            && self.section.as_deref().map_or(true, |s| user.section.as_deref() == Some(s))
    }
}
