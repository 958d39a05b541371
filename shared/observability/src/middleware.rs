//! HTTP middleware for request/response logging with trace context.
//!
//! Registered outside authentication so that it sees the final status of
//! every request, including rejected ones.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::{debug, error, info, span, warn, Instrument, Level};

use crate::trace_context::{TraceContext, REQUEST_ID_HEADER};

/// Paths logged at debug level only.
const QUIET_PATHS: [&str; 1] = ["/health"];
const SLOW_REQUEST_MS: u64 = 1000;

#[derive(Clone)]
pub struct ObservabilityMiddleware {
    service_name: Rc<str>,
}

pub fn observability(service_name: impl Into<String>) -> ObservabilityMiddleware {
    ObservabilityMiddleware {
        service_name: Rc::from(service_name.into()),
    }
}

impl<S, B> Transform<S, ServiceRequest> for ObservabilityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ObservabilityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ObservabilityMiddlewareService {
            service: Rc::new(service),
            service_name: Rc::clone(&self.service_name),
        }))
    }
}

pub struct ObservabilityMiddlewareService<S> {
    service: Rc<S>,
    service_name: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for ObservabilityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let service_name = Rc::clone(&self.service_name);

        Box::pin(async move {
            let path = req.path().to_string();
            let method = req.method().to_string();
            let quiet = QUIET_PATHS.iter().any(|p| path.starts_with(p));

            let trace_ctx = TraceContext::from_request(req.request());
            req.extensions_mut().insert(trace_ctx.clone());

            let request_span = span!(
                Level::INFO,
                "http_request",
                trace_id = %trace_ctx.trace_id,
                request_id = %trace_ctx.request_id,
                method = %method,
                path = %path,
                service = %service_name,
            );

            let start = Instant::now();
            let result = service.call(req).instrument(request_span).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let mut res = match result {
                Ok(res) => res,
                Err(e) => {
                    error!(trace_id = %trace_ctx.trace_id, duration_ms, error = %e, "{} {} failed", method, path);
                    return Err(e);
                }
            };

            let status = res.status().as_u16();
            // The auth layer replaces the context once the caller is known.
            let actor = res
                .request()
                .extensions()
                .get::<TraceContext>()
                .and_then(|ctx| ctx.user_id)
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());

            if let Ok(value) = HeaderValue::from_str(&trace_ctx.request_id) {
                res.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            if status >= 500 {
                error!(trace_id = %trace_ctx.trace_id, actor = %actor, status, duration_ms, "{} {}", method, path);
            } else if status >= 400 || duration_ms > SLOW_REQUEST_MS {
                warn!(trace_id = %trace_ctx.trace_id, actor = %actor, status, duration_ms, "{} {}", method, path);
            } else if quiet {
                debug!(status, duration_ms, "{} {}", method, path);
            } else {
                info!(trace_id = %trace_ctx.trace_id, actor = %actor, status, duration_ms, "{} {}", method, path);
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_web::test]
    async fn echoes_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(observability("campus-test"))
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header((REQUEST_ID_HEADER, "abc-123"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert!(res.status().is_success());
        assert_eq!(
            res.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()),
            Some("abc-123")
        );
    }

    #[actix_web::test]
    async fn generated_ids_are_echoed_on_errors() {
        let app = test::init_service(
            App::new()
                .wrap(observability("campus-test"))
                .route("/missing", web::get().to(|| async { HttpResponse::NotFound().finish() })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/missing").to_request()).await;
        assert_eq!(res.status().as_u16(), 404);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }
}
