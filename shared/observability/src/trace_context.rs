//! Request correlation for campus API calls.
//!
//! The caller may send an `x-request-id` or a W3C `traceparent`; the
//! request id is echoed back on the response either way.

use actix_web::HttpRequest;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Correlation ids of one request, kept in the request extensions.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
    pub request_id: String,
    /// Authenticated caller, filled in once the token has been verified.
    pub user_id: Option<Uuid>,
}

impl TraceContext {
    pub fn from_request(req: &HttpRequest) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let trace_id = header(TRACEPARENT_HEADER)
            .as_deref()
            .and_then(trace_id_of)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let request_id = header(REQUEST_ID_HEADER).unwrap_or_else(|| trace_id.clone());

        Self {
            trace_id,
            request_id,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// `version-trace_id-parent_id-flags`
fn trace_id_of(traceparent: &str) -> Option<String> {
    let mut parts = traceparent.split('-');
    let _version = parts.next()?;
    let trace_id = parts.next().filter(|p| !p.is_empty())?;
    parts.next().filter(|p| !p.is_empty())?;
    Some(trace_id.to_string())
}
