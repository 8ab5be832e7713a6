// Workflow Triggers - Business events that can start workflow execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of business events that can trigger workflows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    // Customer triggers
    CustomerCreated,
    CustomerStatusChanged,
    NoCustomerResponse,

    // Breeding triggers
    LitterBorn,
    PuppyReadyForPickup,
    DaysAfterPickup,
    PuppyBirthday,
    HeatCycleDetected,

    // Payment triggers
    PaymentReceived,
    PaymentOverdue,

    // Waitlist triggers
    WaitlistJoined,

    // Operator-initiated
    Manual,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerCreated => "customer_created",
            Self::CustomerStatusChanged => "customer_status_changed",
            Self::NoCustomerResponse => "no_customer_response",
            Self::LitterBorn => "litter_born",
            Self::PuppyReadyForPickup => "puppy_ready_for_pickup",
            Self::DaysAfterPickup => "days_after_pickup",
            Self::PuppyBirthday => "puppy_birthday",
            Self::HeatCycleDetected => "heat_cycle_detected",
            Self::PaymentReceived => "payment_received",
            Self::PaymentOverdue => "payment_overdue",
            Self::WaitlistJoined => "waitlist_joined",
            Self::Manual => "manual",
        }
    }
}

/// Trigger specification stored on a workflow: the event type it listens
/// for plus optional type-specific parameters (e.g. the day offset for
/// `days_after_pickup`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Trigger {
    pub fn new(trigger_type: TriggerType) -> Self {
        Self {
            trigger_type,
            params: None,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Payload carried by a trigger event. Open key-value map; events that
/// concern a customer conventionally carry a `customer` object snapshot.
pub type EventContext = serde_json::Value;

/// One concrete occurrence of a business event, routed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub trigger_type: TriggerType,
    pub context: EventContext,
    pub timestamp: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(user_id: Uuid, trigger_type: TriggerType, context: EventContext) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            user_id,
            trigger_type,
            context,
            timestamp: Utc::now(),
        }
    }

    /// Customer record snapshot, when the event carries one.
    pub fn customer(&self) -> Option<&serde_json::Value> {
        match self.context.get("customer") {
            Some(serde_json::Value::Null) | None => None,
            Some(c) => Some(c),
        }
    }

    /// Customer id from the snapshot, when present.
    pub fn customer_id(&self) -> Option<Uuid> {
        self.customer()
            .and_then(|c| c.get("id"))
            .and_then(|id| id.as_str())
            .and_then(|id| id.parse().ok())
    }

    /// Customer email address from the snapshot, when present.
    pub fn customer_email(&self) -> Option<&str> {
        self.customer()
            .and_then(|c| c.get("email"))
            .and_then(|e| e.as_str())
    }

    /// Create a customer created event
    pub fn customer_created(user_id: Uuid, customer: serde_json::Value) -> Self {
        Self::new(
            user_id,
            TriggerType::CustomerCreated,
            serde_json::json!({ "customer": customer }),
        )
    }

    /// Create a customer status changed event
    pub fn customer_status_changed(
        user_id: Uuid,
        customer: serde_json::Value,
        old_status: &str,
        new_status: &str,
    ) -> Self {
        Self::new(
            user_id,
            TriggerType::CustomerStatusChanged,
            serde_json::json!({
                "customer": customer,
                "old_status": old_status,
                "new_status": new_status
            }),
        )
    }

    /// Create a litter born event
    pub fn litter_born(user_id: Uuid, litter_id: Uuid, dam_name: &str, puppy_count: i64) -> Self {
        Self::new(
            user_id,
            TriggerType::LitterBorn,
            serde_json::json!({
                "litter_id": litter_id,
                "dam_name": dam_name,
                "puppy_count": puppy_count
            }),
        )
    }

    /// Create a payment overdue event
    pub fn payment_overdue(
        user_id: Uuid,
        customer: serde_json::Value,
        amount: f64,
        days_overdue: i64,
    ) -> Self {
        Self::new(
            user_id,
            TriggerType::PaymentOverdue,
            serde_json::json!({
                "customer": customer,
                "amount": amount,
                "days_overdue": days_overdue
            }),
        )
    }

    /// Create a waitlist joined event
    pub fn waitlist_joined(
        user_id: Uuid,
        customer: serde_json::Value,
        litter_id: Option<Uuid>,
    ) -> Self {
        Self::new(
            user_id,
            TriggerType::WaitlistJoined,
            serde_json::json!({
                "customer": customer,
                "litter_id": litter_id
            }),
        )
    }

    /// Create a manual event fired by an operator
    pub fn manual(user_id: Uuid, context: EventContext) -> Self {
        Self::new(user_id, TriggerType::Manual, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_event_creation() {
        let event = TriggerEvent::customer_created(
            Uuid::new_v4(),
            serde_json::json!({ "id": Uuid::new_v4(), "name": "Jordan Avery" }),
        );

        assert_eq!(event.trigger_type, TriggerType::CustomerCreated);
        assert!(event.customer().is_some());
    }

    #[test]
    fn test_customer_id_extraction() {
        let customer_id = Uuid::new_v4();
        let event = TriggerEvent::customer_created(
            Uuid::new_v4(),
            serde_json::json!({ "id": customer_id, "name": "Sam" }),
        );

        assert_eq!(event.customer_id(), Some(customer_id));
    }

    #[test]
    fn test_customer_email_extraction() {
        let event = TriggerEvent::customer_created(
            Uuid::new_v4(),
            serde_json::json!({
                "id": Uuid::new_v4(),
                "name": "Sam Reyes",
                "email": "sam@example.com",
                "status": "inquiry",
                "tags": ["new-lead"]
            }),
        );

        assert_eq!(event.customer_email(), Some("sam@example.com"));
    }

    #[test]
    fn test_event_without_customer() {
        let event = TriggerEvent::litter_born(Uuid::new_v4(), Uuid::new_v4(), "Willow", 6);

        assert!(event.customer().is_none());
        assert!(event.customer_id().is_none());
        assert_eq!(event.context.get("puppy_count").unwrap(), 6);
    }

    #[test]
    fn test_trigger_type_wire_format() {
        let json = serde_json::to_string(&TriggerType::PuppyReadyForPickup).unwrap();
        assert_eq!(json, "\"puppy_ready_for_pickup\"");
        assert_eq!(
            TriggerType::PuppyReadyForPickup.as_str(),
            "puppy_ready_for_pickup"
        );
    }
}
