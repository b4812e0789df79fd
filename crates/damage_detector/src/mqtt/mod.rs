mod damage_publisher;
mod subscriber;

pub use damage_publisher::MqttDamagePublisher;
pub use subscriber::run_sensor_subscriber;
