use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const TOKEN_ISSUER: &str = "campus";
pub const TOKEN_AUDIENCE: &str = "campus";

/// Role column as stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Principal,
    Admin,
    Teacher,
    Student,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Principal => "principal",
            RoleKind::Admin => "admin",
            RoleKind::Teacher => "teacher",
            RoleKind::Student => "student",
        }
    }
}

/// Role of an authenticated caller. Teachers carry the student
/// registration flag so that capability checks never reach back into
/// the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Role {
    Principal,
    Admin,
    Teacher {
        #[serde(rename = "canRegisterStudents")]
        can_register_students: bool,
    },
    Student,
}

impl Role {
    pub fn from_parts(kind: RoleKind, can_register_students: bool) -> Self {
        match kind {
            RoleKind::Principal => Role::Principal,
            RoleKind::Admin => Role::Admin,
            RoleKind::Teacher => Role::Teacher { can_register_students },
            RoleKind::Student => Role::Student,
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Principal => RoleKind::Principal,
            Role::Admin => RoleKind::Admin,
            Role::Teacher { .. } => RoleKind::Teacher,
            Role::Student => RoleKind::Student,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    pub role: RoleKind,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2, message = "Section must be a section letter"))]
    pub section: Option<String>,
    /// Study year and academic year pick the Section a student joins.
    #[validate(range(min = 1, max = 4, message = "Year must be between 1 and 4"))]
    pub year: Option<i16>,
    pub academic_year: Option<String>,
    #[validate(length(max = 50, message = "Enrollment id is too long"))]
    pub enrollment_id: Option<String>,
    #[validate(length(max = 50, message = "Employee id is too long"))]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub can_register_students: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_role_serializes_with_flag() {
        let role = Role::from_parts(RoleKind::Teacher, true);
        let value = serde_json::to_value(role).unwrap();
        assert_eq!(value["kind"], "teacher");
        assert_eq!(value["canRegisterStudents"], true);

        let back: Role = serde_json::from_value(value).unwrap();
        assert_eq!(back, role);
        assert_eq!(back.kind(), RoleKind::Teacher);
    }

    #[test]
    fn flag_is_dropped_for_non_teachers() {
        assert_eq!(Role::from_parts(RoleKind::Admin, true), Role::Admin);
        assert_eq!(Role::from_parts(RoleKind::Student, true), Role::Student);
    }
}
