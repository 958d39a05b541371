use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::{CreateSemesterRequest, SemesterQuery};
use campus_models::ApiResponse;
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_semester(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateSemesterRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let semester = state.semester_service.create(&user, body.into_inner()).await?;
    Ok(created(semester, "Semester created"))
}

pub async fn list_semesters(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<SemesterQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.semester_service.list(query.into_inner()).await?))
}

/// `data` is `null` when the department has no current semester.
pub async fn current_semester(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    let current = state.semester_service.current(path.into_inner()).await?;
    let response = match current {
        Some(semester) => ApiResponse::success(Some(semester)),
        None => ApiResponse::success(None).with_message("No current semester for this department"),
    };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn set_current_semester(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let semester = state.semester_service.set_current(&user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(semester).with_message("Current semester updated")))
}

pub async fn delete_semester(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    state.semester_service.delete(&user, path.into_inner()).await?;
    Ok(done("Semester deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/semesters")
            .route("", web::post().to(create_semester))
            .route("", web::get().to(list_semesters))
            .route("/current/{department_id}", web::get().to(current_semester))
            .route("/{id}/set-current", web::put().to(set_current_semester))
            .route("/{id}", web::delete().to(delete_semester)),
    );
}
