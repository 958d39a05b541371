// Wire types shared by the campus services: request payloads, enums stored
// in Postgres, token claims and the response envelope.

pub mod academics;
pub mod api;
pub mod attendance;
pub mod auth;
pub mod fees;
pub mod timetable;

pub use api::ApiResponse;
pub use auth::{Claims, Role, RoleKind};
