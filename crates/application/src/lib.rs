//! Application layer - Connection lifecycle and call orchestration

pub mod connection;
pub mod facade;
pub mod transport;

pub use connection::{ConnectionSettings, ServiceConnectionManager};
pub use facade::ReceiptPrinter;
pub use transport::TransportClient;
