use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::{StudentQuery, TeacherQuery};
use campus_models::auth::RegisterUserRequest;

use super::{created, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

/// Capability depends on the requested role and is checked by the service.
pub async fn register_user(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<RegisterUserRequest>,
) -> Result<HttpResponse, ServiceError> {
    let registered = state.user_service.register(&user, body.into_inner()).await?;
    Ok(created(registered, "User registered"))
}

pub async fn me(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ServiceError> {
    Ok(ok(state.user_service.me(&user).await?))
}

pub async fn list_students(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<StudentQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewReports)?;
    Ok(ok(state.user_service.list_students(query.into_inner()).await?))
}

pub async fn list_teachers(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<TeacherQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.user_service.list_teachers(query.into_inner()).await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::post().to(register_user))
            .route("/me", web::get().to(me))
            .route("/students", web::get().to(list_students))
            .route("/teachers", web::get().to(list_teachers)),
    );
}
