//! Domain layer - Pure types and contracts for the receipt printer client
//!
//! This crate contains:
//! - Value Objects (TextFormat, Bitmap, WireMap)
//! - The connection state machine
//! - Connection lifecycle events
//! - Service interfaces (traits)
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Validation enforced at domain level
//! - Testable in isolation

pub mod bitmap;
pub mod connection_state;
pub mod error;
pub mod event;
pub mod format;
pub mod request;
pub mod service;
pub mod status;
pub mod wire;

// Re-export commonly used types
pub use bitmap::Bitmap;
pub use connection_state::ConnectionState;
pub use error::{PrintError, Result};
pub use event::{ConnectionEvent, EventPublisher};
pub use format::{PrinterFont, TextAlign, TextFormat, TextStyle};
pub use request::PrintRequest;
pub use service::{PrinterService, RemoteReply, ServiceBinder, ServiceIdentity};
pub use wire::{WireMap, WireValue};
