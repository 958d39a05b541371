use actix_web::{web, HttpResponse};
use campus_models::auth::LoginRequest;

use super::ok;
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    let session = state.auth_service.login(body.into_inner()).await?;
    Ok(ok(session))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auth").route("/login", web::post().to(login)));
}
