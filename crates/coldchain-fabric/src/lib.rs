//! Broker plumbing shared by the coldchain services: MQTT options, Kafka
//! client builders, AMQP topology declaration, and telemetry init.
//!
//! Topic/queue names and delivery discipline live with the services; this
//! crate only owns how clients are constructed and bound.

pub mod amqp;
pub mod http;
pub mod kafka;
pub mod mqtt;
pub mod telemetry;

pub use telemetry::{init_telemetry, TelemetryConfig};
