use actix_web::{http::header, web, HttpResponse};
use campus_middleware::{AuthUser, Capability};
use campus_models::attendance::{MarkAttendanceRequest, ReportQuery};
use campus_models::ApiResponse;
use chrono::NaiveDate;
use uuid::Uuid;

use super::ok;
use crate::errors::ServiceError;
use crate::state::AppState;

/// 201 for a new sheet, 200 when an existing one was replaced.
pub async fn mark_attendance(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<MarkAttendanceRequest>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::MarkAttendance)?;
    let (attendance, replaced) = state.attendance_service.mark(&user, body.into_inner()).await?;

    let response = if replaced {
        HttpResponse::Ok().json(ApiResponse::success(attendance).with_message("Attendance updated"))
    } else {
        HttpResponse::Created().json(ApiResponse::success(attendance).with_message("Attendance recorded"))
    };
    Ok(response)
}

pub async fn get_attendance(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, NaiveDate)>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewReports)?;
    let (timetable_id, date) = path.into_inner();
    Ok(ok(state.attendance_service.get(timetable_id, date).await?))
}

pub async fn attendance_report(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, String)>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewReports)?;
    let (batch_id, section) = path.into_inner();
    let report = state
        .attendance_service
        .report(batch_id, &section, query.into_inner())
        .await?;
    Ok(ok(report))
}

pub async fn attendance_report_csv(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, String)>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ServiceError> {
    user.require(Capability::ViewReports)?;
    let (batch_id, section) = path.into_inner();
    let report = state
        .attendance_service
        .report(batch_id, &section, query.into_inner())
        .await?;

    let filename = format!("attendance-{}-{}.csv", batch_id, report.section);
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(report.to_csv()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .route("", web::post().to(mark_attendance))
            .route("/timetable/{timetable_id}/date/{date}", web::get().to(get_attendance))
            .route("/report/batch/{batch_id}/section/{section}", web::get().to(attendance_report))
            .route("/report/batch/{batch_id}/section/{section}/csv", web::get().to(attendance_report_csv)),
    );
}
