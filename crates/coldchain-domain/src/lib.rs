pub mod batch;
pub mod error;
pub mod order;
pub mod repository;
pub mod sensor;

pub use batch::*;
pub use error::{DomainError, DomainResult};
pub use order::*;
pub use repository::{
    BatchEventPublisher, BatchRepository, DamageEventSink, OrderEventPublisher, OrderRepository,
};
pub use sensor::*;

#[cfg(any(test, feature = "testing"))]
pub use repository::{
    MockBatchEventPublisher, MockBatchRepository, MockDamageEventSink, MockOrderEventPublisher,
    MockOrderRepository,
};
