//! Domain event logging for campus services.
//!
//! Every state change in the registry, timetable, attendance and fee ledger
//! emits one structured event under the `domain_event` target.

use serde::Serialize;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of a domain operation
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Categories of domain events for filtering
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Auth,
    Registry,
    Timetable,
    Attendance,
    Fees,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::Registry => "registry",
            Self::Timetable => "timetable",
            Self::Attendance => "attendance",
            Self::Fees => "fees",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub category: EventCategory,
    /// e.g. "section_created", "fee_paid"
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub outcome: Outcome,
    pub error: Option<String>,
    /// Acting user
    pub user_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl DomainEvent {
    pub fn new(service: impl Into<String>, category: EventCategory, event_type: impl Into<String>) -> DomainEventBuilder {
        DomainEventBuilder {
            event: DomainEvent {
                timestamp: Utc::now(),
                service: service.into(),
                category,
                event_type: event_type.into(),
                entity_type: None,
                entity_id: None,
                outcome: Outcome::Success,
                error: None,
                user_id: None,
                metadata: None,
            },
        }
    }
}

pub struct DomainEventBuilder {
    event: DomainEvent,
}

impl DomainEventBuilder {
    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.event.entity_type = Some(entity_type.into());
        self.event.entity_id = Some(entity_id.into());
        self
    }

    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.event.outcome = Outcome::Failure;
        self.event.error = Some(error.into());
        self
    }

    pub fn user(mut self, user_id: Option<Uuid>) -> Self {
        self.event.user_id = user_id;
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.event.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> DomainEvent {
        self.event
    }

    /// Emits the event under the `domain_event` target.
    pub fn emit(self) {
        let event = self.event;
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());

        match event.outcome {
            Outcome::Success => tracing::info!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                "DomainEvent: {}", json
            ),
            Outcome::Failure => tracing::warn!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                error = ?event.error,
                "DomainEvent: {}", json
            ),
        }
    }
}

// Convenience functions for common domain events

/// Log a create/update/delete in the academic registry.
pub fn log_registry_change(
    service: &str,
    entity_type: &str,
    entity_id: Uuid,
    event_type: &str,
    actor: Option<Uuid>,
) {
    DomainEvent::new(service, EventCategory::Registry, event_type)
        .entity(entity_type, entity_id.to_string())
        .user(actor)
        .emit();
}

/// Log a change of the current semester.
pub fn log_semester_switched(service: &str, semester_id: Uuid, previous: Option<Uuid>, actor: Option<Uuid>) {
    DomainEvent::new(service, EventCategory::Registry, "semester_switched")
        .entity("semester", semester_id.to_string())
        .metadata(serde_json::json!({ "previous": previous }))
        .user(actor)
        .emit();
}

/// Log a timetable slot being placed or removed.
pub fn log_timetable_change(service: &str, entry_id: Uuid, event_type: &str, actor: Option<Uuid>) {
    DomainEvent::new(service, EventCategory::Timetable, event_type)
        .entity("timetable_entry", entry_id.to_string())
        .user(actor)
        .emit();
}

/// Log an attendance sheet being recorded for one period.
pub fn log_attendance_marked(
    service: &str,
    attendance_id: Uuid,
    timetable_id: Uuid,
    records: usize,
    replaced: bool,
    actor: Uuid,
) {
    DomainEvent::new(service, EventCategory::Attendance, "attendance_marked")
        .entity("attendance", attendance_id.to_string())
        .user(Some(actor))
        .metadata(serde_json::json!({
            "timetable_id": timetable_id,
            "records": records,
            "replaced": replaced
        }))
        .emit();
}

/// Log a fee ledger event; `amount` is the rendered decimal, if any.
pub fn log_fee_event(service: &str, event_type: &str, entity_id: Uuid, amount: Option<&str>, actor: Option<Uuid>) {
    let mut builder = DomainEvent::new(service, EventCategory::Fees, event_type)
        .entity("fee", entity_id.to_string())
        .user(actor);
    if let Some(amount) = amount {
        builder = builder.metadata(serde_json::json!({ "amount": amount }));
    }
    builder.emit();
}

/// Log a login attempt; `error` marks it failed.
pub fn log_auth_event(service: &str, event_type: &str, user_id: Option<Uuid>, error: Option<&str>) {
    let mut builder = DomainEvent::new(service, EventCategory::Auth, event_type).user(user_id);
    if let Some(uid) = user_id {
        builder = builder.entity("user", uid.to_string());
    }
    if let Some(err) = error {
        builder = builder.failure(err);
    }
    builder.emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_entity_and_actor() {
        let actor = Uuid::new_v4();
        let event = DomainEvent::new("campus-test", EventCategory::Fees, "payment_recorded")
            .entity("fee_assignment", "42")
            .user(Some(actor))
            .build();

        assert_eq!(event.service, "campus-test");
        assert_eq!(event.event_type, "payment_recorded");
        assert_eq!(event.entity_id, Some("42".to_string()));
        assert_eq!(event.user_id, Some(actor));
        assert_eq!(event.outcome, Outcome::Success);
    }

    #[test]
    fn failure_records_error() {
        let event = DomainEvent::new("campus-test", EventCategory::Auth, "login")
            .failure("Invalid credentials")
            .build();
        assert_eq!(event.outcome, Outcome::Failure);
        assert_eq!(event.error.as_deref(), Some("Invalid credentials"));
        assert_eq!(event.category.to_string(), "auth");
    }
}
