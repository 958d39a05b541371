// Database models for the campus registry

macro_rules! impl_model {
    ($ty:ty, $name:literal, $policy:expr) => {
        impl $crate::models::Model for $ty {
            type Id = uuid::Uuid;

            const NAME: &'static str = $name;
            const DELETION: $crate::models::DeletionPolicy = $policy;

            fn id(&self) -> &Self::Id {
                &self.id
            }

            fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.updated_at
            }
        }
    };
}
pub(crate) use impl_model;

pub mod academics;
pub mod attendance;
pub mod department;
pub mod fee;
pub mod timetable;
pub mod user;

pub use academics::*;
pub use attendance::*;
pub use department::*;
pub use fee::*;
pub use timetable::*;
pub use user::*;

use chrono::{DateTime, Utc};

/// How a row leaves the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Kept with `is_active = false`.
    Soft,
    /// Removed unless one of the listed children still points at it.
    Restrict(&'static [&'static str]),
    /// Removed unconditionally; dependants keep a dangling id.
    Detach,
}

/// Common traits for all models
pub trait Model {
    type Id;

    /// Singular display name used in error messages.
    const NAME: &'static str;
    const DELETION: DeletionPolicy;

    fn id(&self) -> &Self::Id;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}
