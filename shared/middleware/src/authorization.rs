//! Capability checks. Every permission decision in the API goes through
//! [`can`], either from a handler via [`AuthUser::require`] or for a whole
//! scope via [`CapabilityGuardFactory`].

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, StatusCode},
    Error as ActixError, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use campus_models::{ApiResponse, Claims, Role};
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use std::fmt;
use std::future::{ready, Ready};
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Capability {
    ViewRecords,
    ManageRegistry,
    ManageTimetable,
    MarkAttendance,
    ViewReports,
    ManageFees,
    ViewFees,
    RegisterStudents,
    RegisterStaff,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The role/capability table.
pub fn can(role: &Role, capability: Capability) -> bool {
    use Capability::*;
    match role {
        Role::Admin => true,
        Role::Principal => matches!(capability, ViewRecords | ViewReports | ViewFees),
        Role::Teacher { can_register_students } => match capability {
            ViewRecords | MarkAttendance | ViewReports => true,
            RegisterStudents => *can_register_students,
            _ => false,
        },
        Role::Student => matches!(capability, ViewRecords),
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Insufficient permissions")]
    Forbidden(Capability),
}

impl ResponseError for AccessError {
    fn status_code(&self) -> StatusCode {
        match self {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.to_string()))
    }
}

/// The authenticated caller, taken from the claims the auth middleware
/// stored on the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Self {
            id: claims.user_id()?,
            email: claims.email.clone(),
            name: claims.name.clone(),
            role: claims.role,
        })
    }

    pub fn can(&self, capability: Capability) -> bool {
        can(&self.role, capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AccessError> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.id, %capability, "Capability denied");
            Err(AccessError::Forbidden(capability))
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

impl FromRequest for AuthUser {
    type Error = AccessError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<Claims>()
            .and_then(AuthUser::from_claims)
            .ok_or(AccessError::Unauthenticated);
        ready(user)
    }
}

/// Scope-level guard: reads (GET/HEAD) need one capability, every other
/// method needs the other.
pub struct CapabilityGuard<S> {
    service: Rc<S>,
    read: Capability,
    write: Capability,
}

impl<S, B> Service<ServiceRequest> for CapabilityGuard<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let needed = if matches!(*req.method(), Method::GET | Method::HEAD) {
            self.read
        } else {
            self.write
        };

        Box::pin(async move {
            let decision = match req.extensions().get::<Claims>() {
                None => Err(AccessError::Unauthenticated),
                Some(claims) if can(&claims.role, needed) => Ok(()),
                Some(_) => Err(AccessError::Forbidden(needed)),
            };

            match decision {
                Ok(()) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => Ok(req.into_response(e.error_response()).map_into_right_body()),
            }
        })
    }
}

pub struct CapabilityGuardFactory {
    read: Capability,
    write: Capability,
}

impl CapabilityGuardFactory {
    pub fn new(read: Capability, write: Capability) -> Self {
        Self { read, write }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CapabilityGuardFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = CapabilityGuard<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CapabilityGuard {
            service: Rc::new(service),
            read: self.read,
            write: self.write,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthMiddlewareFactory, JwtKeys};
    use actix_web::{test, web, App};
    use std::sync::Arc;

    const TEACHER: Role = Role::Teacher { can_register_students: false };
    const REGISTRAR: Role = Role::Teacher { can_register_students: true };

    #[::core::prelude::v1::test]
    fn table_matches_roles() {
        use Capability::*;
        let all = [
            ViewRecords,
            ManageRegistry,
            ManageTimetable,
            MarkAttendance,
            ViewReports,
            ManageFees,
            ViewFees,
            RegisterStudents,
            RegisterStaff,
        ];
        assert!(all.iter().all(|c| can(&Role::Admin, *c)));

        assert!(can(&Role::Principal, ViewFees));
        assert!(can(&Role::Principal, ViewReports));
        assert!(!can(&Role::Principal, ManageFees));
        assert!(!can(&Role::Principal, MarkAttendance));

        assert!(can(&TEACHER, MarkAttendance));
        assert!(!can(&TEACHER, RegisterStudents));
        assert!(can(&REGISTRAR, RegisterStudents));
        assert!(!can(&REGISTRAR, RegisterStaff));
        assert!(!can(&TEACHER, ViewFees));

        assert!(can(&Role::Student, ViewRecords));
        assert!(!can(&Role::Student, ViewReports));
        assert!(!can(&Role::Student, MarkAttendance));
    }

    #[::core::prelude::v1::test]
    fn require_reports_the_missing_capability() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "s@campus.edu".into(),
            name: "Student".into(),
            role: Role::Student,
        };
        assert!(user.require(Capability::ViewRecords).is_ok());
        match user.require(Capability::ManageFees) {
            Err(AccessError::Forbidden(cap)) => assert_eq!(cap, Capability::ManageFees),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[actix_web::test]
    async fn guard_splits_reads_and_writes() {
        let keys = Arc::new(JwtKeys::new("guard-secret", 1));
        let app = test::init_service(
            App::new().wrap(AuthMiddlewareFactory::new(keys.clone())).service(
                web::scope("/api/fees")
                    .wrap(CapabilityGuardFactory::new(Capability::ViewFees, Capability::ManageFees))
                    .route("", web::get().to(|| async { HttpResponse::Ok().finish() }))
                    .route("", web::post().to(|| async { HttpResponse::Created().finish() })),
            ),
        )
        .await;

        let (principal, _) = keys
            .issue(Uuid::new_v4(), "p@campus.edu", "P", Role::Principal)
            .unwrap();
        let (student, _) = keys
            .issue(Uuid::new_v4(), "s@campus.edu", "S", Role::Student)
            .unwrap();

        let call = |method: Method, token: &str| {
            test::TestRequest::default()
                .method(method)
                .uri("/api/fees")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request()
        };

        let res = test::call_service(&app, call(Method::GET, &principal)).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = test::call_service(&app, call(Method::POST, &principal)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = test::call_service(&app, call(Method::GET, &student)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Insufficient permissions");
    }
}
