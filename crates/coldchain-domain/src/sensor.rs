use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// A reading emitted by the upstream sensor simulator on `events/sensor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub temperature: f64,
    pub humidity: f64,
    pub status: String,
}

/// Damage severity derived from a sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Pure function of (temperature, humidity); equal inputs always
    /// yield equal severity.
    pub fn derive(temperature: f64, humidity: f64) -> Self {
        if temperature >= 40.0 || humidity >= 90.0 {
            Severity::Critical
        } else if temperature >= 30.0 || humidity >= 80.0 {
            Severity::Major
        } else {
            Severity::Minor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The live-tunable threshold pair for the damage detector.
/// A reading fires a damage event when its temperature is below `min_temperature`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min_temperature: f64,
    pub max_temperature: f64,
}

impl TemperatureRange {
    pub fn new(min_temperature: f64, max_temperature: f64) -> DomainResult<Self> {
        if min_temperature >= max_temperature {
            return Err(DomainError::InvalidTemperatureRange {
                min: min_temperature,
                max: max_temperature,
            });
        }
        Ok(Self {
            min_temperature,
            max_temperature,
        })
    }

    pub fn is_damaging(&self, temperature: f64) -> bool {
        temperature < self.min_temperature
    }
}

/// Sensor context carried inside a damage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageDetails {
    pub temperature: f64,
    pub humidity: f64,
    pub status: String,
    #[serde(rename = "mqttTopic")]
    pub mqtt_topic: String,
}

/// Event emitted when a sensor reading crosses the damage threshold.
///
/// Published to both the MQTT damage topic and the log-broker damage
/// topic; camelCase field names are the wire contract shared with the
/// downstream order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEvent {
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    pub order_id: String,
    pub severity: Severity,
    pub description: String,
    pub details: DamageDetails,
}

pub const DAMAGE_EVENT_TYPE: &str = "order.damage";

impl DamageEvent {
    /// Build a damage event from a sensor reading. The reading id doubles
    /// as the order id downstream.
    pub fn from_reading(reading: &SensorReading, source: &str, source_topic: &str) -> Self {
        let severity = Severity::derive(reading.temperature, reading.humidity);
        Self {
            event_id: reading.id.clone(),
            event_type: DAMAGE_EVENT_TYPE.to_string(),
            source: source.to_string(),
            occurred_at: chrono::Utc::now(),
            order_id: reading.id.clone(),
            severity,
            description: format!(
                "Potential damage detected: temp={:.2}C, humidity={:.2}%",
                reading.temperature, reading.humidity
            ),
            details: DamageDetails {
                temperature: reading.temperature,
                humidity: reading.humidity,
                status: reading.status.clone(),
                mqtt_topic: source_topic.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(Severity::derive(9.0, 50.0), Severity::Minor);
        assert_eq!(Severity::derive(30.0, 50.0), Severity::Major);
        assert_eq!(Severity::derive(5.0, 80.0), Severity::Major);
        assert_eq!(Severity::derive(40.0, 50.0), Severity::Critical);
        assert_eq!(Severity::derive(45.0, 95.0), Severity::Critical);
        assert_eq!(Severity::derive(5.0, 90.0), Severity::Critical);
    }

    #[test]
    fn test_severity_is_pure() {
        let a = Severity::derive(31.5, 42.0);
        let b = Severity::derive(31.5, 42.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_temperature_range_rejects_inverted_bounds() {
        assert!(TemperatureRange::new(10.0, 50.0).is_ok());
        assert!(matches!(
            TemperatureRange::new(25.0, 15.0),
            Err(DomainError::InvalidTemperatureRange { .. })
        ));
        assert!(TemperatureRange::new(15.0, 15.0).is_err());
    }

    #[test]
    fn test_damage_trigger_is_strictly_below_min() {
        let range = TemperatureRange::new(10.0, 50.0).unwrap();
        assert!(range.is_damaging(9.99));
        assert!(!range.is_damaging(10.0));
        assert!(!range.is_damaging(20.0));
    }

    #[test]
    fn test_damage_event_round_trip() {
        let reading = SensorReading {
            id: "evt_1".to_string(),
            timestamp: chrono::Utc::now(),
            source: "sensor-sim".to_string(),
            temperature: 9.23,
            humidity: 58.0,
            status: "active".to_string(),
        };

        let event = DamageEvent::from_reading(&reading, "damage-detector", "events/sensor");
        assert_eq!(event.order_id, "evt_1");
        assert_eq!(event.severity, Severity::Minor);
        assert_eq!(event.event_type, DAMAGE_EVENT_TYPE);

        let encoded = serde_json::to_string(&event).unwrap();
        // camelCase wire names shared with the order service
        assert!(encoded.contains("\"eventId\""));
        assert!(encoded.contains("\"occurredAt\""));
        assert!(encoded.contains("\"mqttTopic\""));
        assert!(encoded.contains("\"severity\":\"minor\""));

        let decoded: DamageEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }
}
