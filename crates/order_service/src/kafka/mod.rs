mod order_event_producer;

pub use order_event_producer::KafkaOrderEventProducer;
