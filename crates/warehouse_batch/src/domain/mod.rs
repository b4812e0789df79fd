mod batch_service;
mod in_memory_batch_repository;
mod order_event_handler;

pub use batch_service::BatchService;
pub use in_memory_batch_repository::InMemoryBatchRepository;
pub use order_event_handler::{warehouse_action, OrderEventHandler, WarehouseAction};
