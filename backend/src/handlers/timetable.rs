use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::timetable::{CreateTimetableEntryRequest, TimetableQuery};
use uuid::Uuid;

use super::{created, done, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_entry(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateTimetableEntryRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageTimetable)?;
    let entry = state.timetable_service.create(&user, body.into_inner()).await?;
    Ok(created(entry, "Timetable entry created"))
}

/// Any signed-in user may read a section's week.
pub async fn section_timetable(
    state: web::Data<AppState>,
    _user: AuthUser,
    path: web::Path<(Uuid, String)>,
    query: web::Query<TimetableQuery>,
) -> Result<HttpResponse, ServiceError> {
    let (batch_id, section) = path.into_inner();
    let timetable = state
        .timetable_service
        .for_section(batch_id, &section, query.into_inner())
        .await?;
    Ok(ok(timetable))
}

pub async fn delete_entry(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ManageTimetable)?;
    state.timetable_service.delete(&user, path.into_inner()).await?;
    Ok(done("Timetable entry deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/timetable")
            .route("", web::post().to(create_entry))
            .route("/batch/{batch_id}/section/{section}", web::get().to(section_timetable))
            .route("/{id}", web::delete().to(delete_entry)),
    );
}
