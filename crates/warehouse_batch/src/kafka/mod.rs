mod batch_event_publisher;
mod consumer;

pub use batch_event_publisher::KafkaBatchEventPublisher;
pub use consumer::OrderEventConsumer;
