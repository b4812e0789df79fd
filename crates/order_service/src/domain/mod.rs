mod in_memory_order_repository;
mod order_service;

pub use in_memory_order_repository::InMemoryOrderRepository;
pub use order_service::OrderService;
