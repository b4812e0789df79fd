mod damage_producer;

pub use damage_producer::KafkaDamageProducer;
