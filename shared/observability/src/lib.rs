//! Campus observability library
//!
//! Logging and tracing shared by the campus services.
//!
//! # Features
//! - Structured pretty or JSON logging through `tracing-subscriber`
//! - Trace ID propagation from incoming headers
//! - HTTP middleware for request/response logging
//! - Domain event logging for registry, timetable, attendance and fee changes

pub mod trace_context;
pub mod domain_events;
pub mod middleware;
pub mod init;

pub use trace_context::*;
pub use domain_events::*;
pub use middleware::*;
pub use init::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, warn};
