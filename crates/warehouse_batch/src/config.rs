use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WarehouseConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Kafka bootstrap servers
    #[serde(default = "default_kafka_brokers")]
    pub kafka_brokers: String,

    /// Topic carrying order lifecycle events in
    #[serde(default = "default_order_events_topic")]
    pub order_events_topic: String,

    /// Topic batch events are published on
    #[serde(default = "default_batch_events_topic")]
    pub batch_events_topic: String,

    /// Durable consumer group
    #[serde(default = "default_group_id")]
    pub group_id: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_kafka_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_order_events_topic() -> String {
    "order-events".to_string()
}

fn default_batch_events_topic() -> String {
    "warehouse-batch-events".to_string()
}

fn default_group_id() -> String {
    "warehouse-batch-service".to_string()
}

fn default_http_port() -> u16 {
    8082
}

impl WarehouseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("WAREHOUSE"))
            .build()?
            .try_deserialize()
    }
}
