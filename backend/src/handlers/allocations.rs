use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::{AllocationQuery, CreateAllocationRequest};
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_allocation(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateAllocationRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let allocation = state.allocation_service.create(&user, body.into_inner()).await?;
    Ok(created(allocation, "Teacher allocated"))
}

pub async fn list_allocations(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<AllocationQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.allocation_service.list(query.into_inner()).await?))
}

pub async fn delete_allocation(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    state.allocation_service.delete(&user, path.into_inner()).await?;
    Ok(done("Teacher allocation deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/allocations")
            .route("", web::post().to(create_allocation))
            .route("", web::get().to(list_allocations))
            .route("/{id}", web::delete().to(delete_allocation)),
    );
}
