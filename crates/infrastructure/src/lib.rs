//! Infrastructure layer - Platform transport and configuration

pub mod config;
pub mod logging;
pub mod service;

pub use config::{ServiceConfig, ServiceGeneration};
pub use logging::TracingEventPublisher;
pub use service::{MockPrinterService, MockServiceBinder, RecordedCall, SocketServiceBinder};
