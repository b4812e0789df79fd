use crate::error::{DomainError, DomainResult};
use crate::sensor::{DamageEvent, Severity};
use serde::{Deserialize, Serialize};

/// Order statuses the damage path can produce. Statuses are carried as
/// plain strings on the wire; these constants pin the closed vocabulary.
pub mod order_status {
    pub const CREATED: &str = "created";
    pub const CREATED_FROM_DAMAGE_EVENT: &str = "created_from_damage_event";
    pub const DAMAGE_DETECTED_MINOR: &str = "damage_detected_minor";
    pub const DAMAGE_DETECTED_MAJOR: &str = "damage_detected_major";
    pub const DAMAGE_DETECTED_UNKNOWN: &str = "damage_detected_unknown";
    pub const CANCELLED_DAMAGE: &str = "cancelled_damage";
}

/// Maps damage severity to the order status it forces.
pub fn status_for_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Minor => order_status::DAMAGE_DETECTED_MINOR,
        Severity::Major => order_status::DAMAGE_DETECTED_MAJOR,
        Severity::Critical => order_status::CANCELLED_DAMAGE,
    }
}

/// The Order aggregate, owned by the order service. Everything else
/// sees snapshots embedded in events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub status: String,
    pub total_amount: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Order {
    /// Synthesize a placeholder order for a damage event whose order id
    /// is unknown. The sensor only knows the id, so customer/product
    /// fields start as placeholders.
    pub fn from_damage_event(event: &DamageEvent) -> Self {
        Self {
            id: event.order_id.clone(),
            customer_id: "unknown".to_string(),
            product_id: "unknown".to_string(),
            quantity: 1,
            status: order_status::CREATED_FROM_DAMAGE_EVENT.to_string(),
            total_amount: 0.0,
            created_at: event.occurred_at,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Lifecycle event published after a successful Order mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_type: String,
    pub order_id: String,
    pub order: Order,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Order event types emitted by the order service (closed set).
pub mod order_event_type {
    pub const CREATED: &str = "order.created";
    pub const UPDATED: &str = "order.updated";
    pub const DAMAGE_PROCESSED: &str = "order.damage_processed";
}

impl OrderEvent {
    pub fn new(event_type: &str, order: Order) -> Self {
        Self {
            event_type: event_type.to_string(),
            order_id: order.id.clone(),
            order,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Bridge wrapper carrying an MQTT payload onto the queue broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgedMessage {
    pub mqtt_topic: String,
    pub payload: String,
    pub timestamp: f64,
}

/// The topic the bridge stamps on wrapped damage events.
pub const DAMAGE_MQTT_TOPIC: &str = "events/order-damage";

/// A delivery on the order-damage queue: either a bare damage event, or
/// a bridge wrapper whose string payload contains one.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Damage(DamageEvent),
    Wrapped(DamageEvent),
}

impl Delivery {
    /// Single deserialization entry point for queue deliveries.
    ///
    /// A wrapper with an unexpected topic, or a body that parses as
    /// neither shape, is a poison message (`UnknownEnvelope`); a wrapper
    /// whose inner payload fails to parse surfaces the decode error.
    pub fn decode(body: &[u8]) -> DomainResult<Self> {
        if let Ok(bridged) = serde_json::from_slice::<BridgedMessage>(body) {
            if bridged.mqtt_topic == DAMAGE_MQTT_TOPIC {
                let inner: DamageEvent = serde_json::from_str(&bridged.payload)?;
                return Ok(Delivery::Wrapped(inner));
            }
        }

        if let Ok(event) = serde_json::from_slice::<DamageEvent>(body) {
            return Ok(Delivery::Damage(event));
        }

        Err(DomainError::UnknownEnvelope)
    }

    pub fn into_damage_event(self) -> DamageEvent {
        match self {
            Delivery::Damage(event) | Delivery::Wrapped(event) => event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{DamageDetails, DAMAGE_EVENT_TYPE};

    fn sample_damage_event(severity: Severity) -> DamageEvent {
        DamageEvent {
            event_id: "evt_9".to_string(),
            event_type: DAMAGE_EVENT_TYPE.to_string(),
            source: "damage-detector".to_string(),
            occurred_at: chrono::Utc::now(),
            order_id: "evt_9".to_string(),
            severity,
            description: "Potential damage detected".to_string(),
            details: DamageDetails {
                temperature: 6.5,
                humidity: 40.0,
                status: "active".to_string(),
                mqtt_topic: "events/sensor".to_string(),
            },
        }
    }

    #[test]
    fn test_status_for_severity_table() {
        assert_eq!(
            status_for_severity(Severity::Minor),
            order_status::DAMAGE_DETECTED_MINOR
        );
        assert_eq!(
            status_for_severity(Severity::Major),
            order_status::DAMAGE_DETECTED_MAJOR
        );
        assert_eq!(
            status_for_severity(Severity::Critical),
            order_status::CANCELLED_DAMAGE
        );
    }

    #[test]
    fn test_order_synthesized_from_damage_event() {
        let event = sample_damage_event(Severity::Minor);
        let order = Order::from_damage_event(&event);

        assert_eq!(order.id, "evt_9");
        assert_eq!(order.customer_id, "unknown");
        assert_eq!(order.product_id, "unknown");
        assert_eq!(order.quantity, 1);
        assert_eq!(order.total_amount, 0.0);
        assert_eq!(order.status, order_status::CREATED_FROM_DAMAGE_EVENT);
        assert_eq!(order.created_at, event.occurred_at);
    }

    #[test]
    fn test_decode_bare_damage_event() {
        let event = sample_damage_event(Severity::Major);
        let body = serde_json::to_vec(&event).unwrap();

        let delivery = Delivery::decode(&body).unwrap();
        assert_eq!(delivery, Delivery::Damage(event));
    }

    #[test]
    fn test_decode_wrapped_damage_event() {
        let event = sample_damage_event(Severity::Critical);
        let wrapper = BridgedMessage {
            mqtt_topic: DAMAGE_MQTT_TOPIC.to_string(),
            payload: serde_json::to_string(&event).unwrap(),
            timestamp: 1_700_000_000.5,
        };
        let body = serde_json::to_vec(&wrapper).unwrap();

        let delivery = Delivery::decode(&body).unwrap();
        assert_eq!(delivery.into_damage_event(), event);
    }

    #[test]
    fn test_decode_wrapper_with_unexpected_topic_is_poison() {
        let wrapper = BridgedMessage {
            mqtt_topic: "events/other".to_string(),
            payload: "{}".to_string(),
            timestamp: 0.0,
        };
        let body = serde_json::to_vec(&wrapper).unwrap();

        assert!(matches!(
            Delivery::decode(&body),
            Err(DomainError::UnknownEnvelope)
        ));
    }

    #[test]
    fn test_decode_wrapper_with_garbage_payload_is_decode_error() {
        let wrapper = BridgedMessage {
            mqtt_topic: DAMAGE_MQTT_TOPIC.to_string(),
            payload: "not json".to_string(),
            timestamp: 0.0,
        };
        let body = serde_json::to_vec(&wrapper).unwrap();

        assert!(matches!(
            Delivery::decode(&body),
            Err(DomainError::DecodeError(_))
        ));
    }

    #[test]
    fn test_decode_garbage_is_poison() {
        assert!(matches!(
            Delivery::decode(b"not even json"),
            Err(DomainError::UnknownEnvelope)
        ));
    }

    #[test]
    fn test_order_event_round_trip() {
        let order = Order {
            id: "order-1".to_string(),
            customer_id: "customer-1".to_string(),
            product_id: "p1".to_string(),
            quantity: 3,
            status: order_status::CREATED.to_string(),
            total_amount: 42.5,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let event = OrderEvent::new(order_event_type::CREATED, order);

        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains("\"event_type\":\"order.created\""));
        assert!(encoded.contains("\"order_id\":\"order-1\""));

        let decoded: OrderEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }
}
