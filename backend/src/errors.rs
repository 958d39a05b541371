use actix_web::{
    error::InternalError,
    http::StatusCode,
    web, HttpRequest, HttpResponse, ResponseError,
};
use campus_database::StoreError;
use campus_middleware::AccessError;
use campus_models::ApiResponse;
use thiserror::Error;
use validator::ValidationErrors;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Server error")]
    Internal(#[source] anyhow::Error),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ServiceError::Internal(source) = self {
            tracing::error!(error = ?source, "Request failed");
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.to_string()))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(message) => ServiceError::NotFound(message),
            StoreError::Conflict(message) => ServiceError::Conflict(message),
            StoreError::Database(e) => ServiceError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => ServiceError::Unauthorized(err.to_string()),
            AccessError::Forbidden(_) => ServiceError::Forbidden(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Internal(err)
    }
}

/// The first failing field decides the message; fields are visited in
/// name order so the message is stable.
impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .first()
            .map(|(field, errs)| {
                errs.first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field))
            })
            .unwrap_or_else(|| "Validation failed".to_string());
        ServiceError::BadRequest(message)
    }
}

fn bad_request<E>(err: E) -> actix_web::Error
where
    E: std::fmt::Display + std::fmt::Debug + 'static,
{
    let body = ApiResponse::error(err.to_string());
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// Malformed bodies, paths and query strings answer with the JSON envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| bad_request(err))
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req: &HttpRequest| bad_request(err))
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| bad_request(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(range(min = 1, max = 4, message = "Year must be between 1 and 4"))]
        year: i16,
        #[validate(length(min = 2))]
        name: String,
    }

    #[test]
    fn validation_message_comes_from_the_first_field() {
        let sample = Sample { year: 9, name: "x".into() };
        let err = ServiceError::from(sample.validate().unwrap_err());
        assert_eq!(err.to_string(), "Invalid name");

        let sample = Sample { year: 9, name: "ok".into() };
        let err = ServiceError::from(sample.validate().unwrap_err());
        assert_eq!(err.to_string(), "Year must be between 1 and 4");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let err = ServiceError::from(StoreError::not_found("Batch"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Batch not found");

        let err = ServiceError::from(StoreError::in_use("Subject", "teacher allocations"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = ServiceError::from(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.to_string(), "Server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
