use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // MQTT configuration
    /// MQTT broker URL (mqtt://host:port)
    #[serde(default = "default_mqtt_broker_url")]
    pub mqtt_broker_url: String,

    /// MQTT client id
    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    /// Optional MQTT credentials
    #[serde(default)]
    pub mqtt_username: Option<String>,

    #[serde(default)]
    pub mqtt_password: Option<String>,

    /// Topic carrying sensor readings
    #[serde(default = "default_sensor_topic")]
    pub sensor_topic: String,

    /// Topic damage events are published on
    #[serde(default = "default_damage_topic")]
    pub damage_topic: String,

    /// Pacing of the upstream simulator, in milliseconds. Carried in the
    /// contract so deployments can tune simulator and detector together.
    #[serde(default = "default_event_interval_ms")]
    pub event_interval_ms: u64,

    /// Delay between MQTT reconnection attempts, in milliseconds
    #[serde(default = "default_mqtt_retry_delay_ms")]
    pub mqtt_retry_delay_ms: u64,

    // Threshold configuration
    /// Readings below this temperature fire a damage event
    #[serde(default = "default_min_temperature")]
    pub min_temperature: f64,

    /// Upper bound of the accepted temperature range
    #[serde(default = "default_max_temperature")]
    pub max_temperature: f64,

    // Log broker configuration
    /// Kafka bootstrap servers
    #[serde(default = "default_kafka_brokers")]
    pub kafka_brokers: String,

    /// Kafka topic mirroring damage events
    #[serde(default = "default_kafka_damage_topic")]
    pub kafka_damage_topic: String,

    // HTTP configuration
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mqtt_broker_url() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_mqtt_client_id() -> String {
    "damage-detector".to_string()
}

fn default_sensor_topic() -> String {
    "events/sensor".to_string()
}

fn default_damage_topic() -> String {
    "events/order-damage".to_string()
}

fn default_event_interval_ms() -> u64 {
    1000
}

fn default_mqtt_retry_delay_ms() -> u64 {
    5000
}

fn default_min_temperature() -> f64 {
    10.0
}

fn default_max_temperature() -> f64 {
    50.0
}

fn default_kafka_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_kafka_damage_topic() -> String {
    "order-status-events".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl DetectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("DETECTOR"))
            .build()?
            .try_deserialize()
    }

    pub fn mqtt_retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.mqtt_retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let config: DetectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.sensor_topic, "events/sensor");
        assert_eq!(config.damage_topic, "events/order-damage");
        assert_eq!(config.kafka_damage_topic, "order-status-events");
        assert_eq!(config.min_temperature, 10.0);
        assert!(config.min_temperature < config.max_temperature);
        assert_eq!(config.http_port, 8080);
    }
}
