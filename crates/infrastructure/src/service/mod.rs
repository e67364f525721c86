mod mock_service;
mod socket_service;

pub use mock_service::{MockPrinterService, MockServiceBinder, RecordedCall};
pub use socket_service::{SocketPrinterService, SocketServiceBinder};
