use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::DepartmentRequest;
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn register_department(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<DepartmentRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let department = state.registry_service.create_department(&user, body.into_inner()).await?;
    Ok(created(department, "Department registered"))
}

/// Public: the sign-up and landing pages list departments.
pub async fn list_departments(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    Ok(ok(state.registry_service.list_departments().await?))
}

pub async fn get_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.registry_service.get_department(path.into_inner()).await?))
}

pub async fn update_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<DepartmentRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let department = state
        .registry_service
        .update_department(&user, path.into_inner(), body.into_inner())
        .await?;
    Ok(ok(department))
}

pub async fn delete_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    state.registry_service.delete_department(&user, path.into_inner()).await?;
    Ok(done("Department deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/departments")
            .route("", web::get().to(list_departments))
            .route("/register", web::post().to(register_department))
            .route("/{id}", web::get().to(get_department))
            .route("/{id}", web::put().to(update_department))
            .route("/{id}", web::delete().to(delete_department)),
    );
}
