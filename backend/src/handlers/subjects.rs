use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::academics::{CreateSubjectRequest, SubjectQuery};
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_subject(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateSubjectRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    let subject = state.subject_service.create(&user, body.into_inner()).await?;
    Ok(created(subject, "Subject created"))
}

pub async fn list_subjects(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<SubjectQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewRecords)?;
    Ok(ok(state.subject_service.list(query.into_inner()).await?))
}

pub async fn delete_subject(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageRegistry)?;
    state.subject_service.delete(&user, path.into_inner()).await?;
    Ok(done("Subject deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subjects")
            .route("", web::post().to(create_subject))
            .route("", web::get().to(list_subjects))
            .route("/{id}", web::delete().to(delete_subject)),
    );
}
