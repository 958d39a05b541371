use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::CreateBatchRequest;
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_batch(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateBatchRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let batch = state.registry_service.create_batch(&user, body.into_inner()).await?;
    Ok(created(batch, "Batch created"))
}

pub async fn list_batches(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewReports)?;
    Ok(ok(state.registry_service.list_batches().await?))
}

pub async fn get_batch(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewReports)?;
    Ok(ok(state.registry_service.get_batch(path.into_inner()).await?))
}

pub async fn batches_for_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.registry_service.batches_for_department(path.into_inner()).await?))
}

pub async fn delete_batch(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    state.registry_service.delete_batch(&user, path.into_inner()).await?;
    Ok(done("Batch deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/batches")
            .route("", web::post().to(create_batch))
            .route("", web::get().to(list_batches))
            .route("/department/{department_id}", web::get().to(batches_for_department))
            .route("/{batch_id}", web::get().to(get_batch))
            .route("/{batch_id}", web::delete().to(delete_batch)),
    );
}
