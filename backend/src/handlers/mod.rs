pub mod allocations;
pub mod attendance;
pub mod auth;
pub mod batches;
pub mod departments;
pub mod fees;
pub mod health;
pub mod sections;
pub mod semesters;
pub mod subjects;
pub mod timetable;
pub mod users;

use actix_web::HttpResponse;
use campus_models::ApiResponse;
use serde::Serialize;

pub(crate) fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}

pub(crate) fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::success(data).with_message(message))
}

pub(crate) fn done(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::message(message))
}
