mod consumer;
mod publisher;

pub use consumer::DamageEventConsumer;
pub use publisher::AmqpOrderEventPublisher;
