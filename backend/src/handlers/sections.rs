use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::{CreateSectionsRequest, SectionQuery, UpdateSectionRequest};
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_sections(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateSectionsRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let sections = state.section_service.create(&user, body.into_inner()).await?;
    let message = format!("{} sections created", sections.len());
    Ok(created(sections, &message))
}

pub async fn list_sections(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<SectionQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.section_service.list(query.into_inner()).await?))
}

pub async fn update_section(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateSectionRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let section = state
        .section_service
        .update(&user, path.into_inner(), body.into_inner())
        .await?;
    Ok(ok(section))
}

pub async fn delete_section(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    state.section_service.delete(&user, path.into_inner()).await?;
    Ok(done("Section deactivated"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sections")
            .route("", web::post().to(create_sections))
            .route("", web::get().to(list_sections))
            .route("/{id}", web::put().to(update_section))
            .route("/{id}", web::delete().to(delete_section)),
    );
}
