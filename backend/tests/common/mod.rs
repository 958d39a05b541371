#![allow(dead_code)]

use actix_web::{test::TestRequest, web};
use campus_backend::config::{AppConfig, BootstrapAdmin};
use campus_backend::state::AppState;
use campus_database::models::{Batch, Department, Section, Subject, TeacherAllocation, User};
use campus_middleware::AuthUser;
use campus_models::academics::{
    BatchDepartmentRequest, CreateAllocationRequest, CreateBatchRequest, CreateSectionsRequest, CreateSubjectRequest,
    DepartmentRequest, SubjectType,
};
use campus_models::auth::{LoginRequest, RegisterUserRequest};
use campus_models::RoleKind;
use serde_json::Value;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@campus.edu";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const ACADEMIC_YEAR: &str = "2024-2025";

/// Builds the full application around an in-memory state.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .wrap(
                    campus_middleware::AuthMiddlewareFactory::new($state.jwt.clone())
                        .with_accounts($state.auth_service.clone()),
                )
                .wrap(campus_observability::observability("campus-backend-test"))
                .configure(campus_backend::routes::configure_routes),
        )
        .await
    };
}

/// Sends a request and returns the status with the JSON body (`null` when
/// the body is not JSON).
macro_rules! call {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let bytes = actix_web::test::read_body(resp).await;
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }};
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub admin: AuthUser,
    pub admin_token: String,
}

pub async fn setup() -> TestContext {
    let state = AppState::in_memory(AppConfig::for_tests());
    state
        .auth_service
        .ensure_bootstrap_admin(&BootstrapAdmin {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Administrator".to_string(),
        })
        .await
        .expect("bootstrap admin");

    let login = state
        .auth_service
        .login(LoginRequest {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .await
        .expect("admin login");

    TestContext {
        admin: actor(&login.user),
        admin_token: login.token,
        state: web::Data::new(state),
    }
}

pub fn actor(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role(),
    }
}

impl TestContext {
    pub fn token_for(&self, user: &User) -> String {
        self.state
            .jwt
            .issue(user.id, &user.email, &user.name, user.role())
            .expect("token")
            .0
    }

    pub async fn department(&self, name: &str) -> Department {
        self.state
            .registry_service
            .create_department(
                &self.admin,
                DepartmentRequest {
                    department_name: name.to_string(),
                    description: None,
                    image_url: None,
                },
            )
            .await
            .expect("department")
    }

    pub async fn batch(&self, name: &str, department_id: Uuid, sections: i16) -> Batch {
        self.state
            .registry_service
            .create_batch(
                &self.admin,
                CreateBatchRequest {
                    batch_name: name.to_string(),
                    departments: vec![BatchDepartmentRequest {
                        department_id,
                        number_of_sections: sections,
                    }],
                },
            )
            .await
            .expect("batch")
    }

    /// Opens sections A.. for year 1 of `ACADEMIC_YEAR`.
    pub async fn sections(&self, department_id: Uuid, batch_id: Uuid, count: i16, capacity: i16) -> Vec<Section> {
        self.state
            .section_service
            .create(
                &self.admin,
                CreateSectionsRequest {
                    department_id,
                    batch_id,
                    year: 1,
                    number_of_sections: count,
                    capacity,
                    academic_year: ACADEMIC_YEAR.to_string(),
                },
            )
            .await
            .expect("sections")
    }

    pub async fn user(&self, name: &str, role: RoleKind, department_id: Option<Uuid>) -> User {
        self.register(RegisterUserRequest {
            name: name.to_string(),
            email: email_for(name),
            password: "password-123".to_string(),
            role,
            department_id,
            batch_id: None,
            section: None,
            year: None,
            academic_year: None,
            enrollment_id: None,
            employee_id: None,
            can_register_students: false,
        })
        .await
    }

    pub async fn student(&self, name: &str, department_id: Uuid, batch_id: Uuid, section: &str) -> User {
        self.register(RegisterUserRequest {
            name: name.to_string(),
            email: email_for(name),
            password: "password-123".to_string(),
            role: RoleKind::Student,
            department_id: Some(department_id),
            batch_id: Some(batch_id),
            section: Some(section.to_string()),
            year: Some(1),
            academic_year: Some(ACADEMIC_YEAR.to_string()),
            enrollment_id: None,
            employee_id: None,
            can_register_students: false,
        })
        .await
    }

    pub async fn register(&self, request: RegisterUserRequest) -> User {
        self.state
            .user_service
            .register(&self.admin, request)
            .await
            .expect("user")
    }

    pub async fn subject(&self, code: &str, department_id: Uuid) -> Subject {
        self.state
            .subject_service
            .create(
                &self.admin,
                CreateSubjectRequest {
                    subject_name: format!("Subject {}", code),
                    subject_code: code.to_string(),
                    department_id,
                    year: 1,
                    semester: 1,
                    credits: 4,
                    subject_type: SubjectType::Theory,
                },
            )
            .await
            .expect("subject")
    }

    pub async fn allocation(
        &self,
        teacher: &User,
        subject: &Subject,
        batch_id: Uuid,
        section: &str,
    ) -> TeacherAllocation {
        self.state
            .allocation_service
            .create(
                &self.admin,
                CreateAllocationRequest {
                    teacher_id: teacher.id,
                    subject_id: subject.id,
                    department_id: subject.department_id,
                    batch_id,
                    section: section.to_string(),
                    year: 1,
                    academic_year: ACADEMIC_YEAR.to_string(),
                },
            )
            .await
            .expect("allocation")
    }
}

pub fn email_for(name: &str) -> String {
    format!("{}@campus.edu", name.to_lowercase().replace(' ', "."))
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn get(uri: &str, token: &str) -> TestRequest {
    TestRequest::get().uri(uri).insert_header(bearer(token))
}

pub fn post(uri: &str, token: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(uri).insert_header(bearer(token)).set_json(body)
}

pub fn put(uri: &str, token: &str, body: Value) -> TestRequest {
    TestRequest::put().uri(uri).insert_header(bearer(token)).set_json(body)
}

pub fn patch(uri: &str, token: &str, body: Value) -> TestRequest {
    TestRequest::patch().uri(uri).insert_header(bearer(token)).set_json(body)
}

pub fn delete(uri: &str, token: &str) -> TestRequest {
    TestRequest::delete().uri(uri).insert_header(bearer(token))
}
