//! Fee ledger. The whole scope sits behind the capability guard: reads
//! need `ViewFees`, writes `ManageFees`.

use actix_web::{web, HttpResponse};
use campus_middleware::{AuthUser, Capability, CapabilityGuardFactory};
use campus_models::fees::{CreateFeeRequest, DiscountRequest, FeeQuery, PaymentRequest};
use campus_models::ApiResponse;
use uuid::Uuid;

use super::{created, ok};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn create_fee(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateFeeRequest>,
) -> Result<HttpResponse, ServiceError> {
    let fee = state.fee_service.create(&user, body.into_inner()).await?;
    Ok(created(fee, "Fee created"))
}

pub async fn list_fees(
    state: web::Data<AppState>,
    query: web::Query<FeeQuery>,
) -> Result<HttpResponse, ServiceError> {
    Ok(ok(state.fee_service.list(query.into_inner()).await?))
}

pub async fn get_fee(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ServiceError> {
    Ok(ok(state.fee_service.get(path.into_inner()).await?))
}

pub async fn apply_discount(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<DiscountRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (fee_id, student_id) = path.into_inner();
    let fee = state
        .fee_service
        .apply_discount(&user, fee_id, student_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(fee).with_message("Discount applied")))
}

pub async fn mark_paid(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<PaymentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (fee_id, student_id) = path.into_inner();
    let fee = state
        .fee_service
        .mark_paid(&user, fee_id, student_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(fee).with_message("Payment recorded")))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/fees")
            .wrap(CapabilityGuardFactory::new(Capability::ViewFees, Capability::ManageFees))
            .route("", web::post().to(create_fee))
            .route("", web::get().to(list_fees))
            .route("/{fee_id}", web::get().to(get_fee))
            .route("/{fee_id}/discount/{student_id}", web::patch().to(apply_discount))
            .route("/{fee_id}/pay/{student_id}", web::patch().to(mark_paid)),
    );
}
