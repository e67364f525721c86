use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use domain::event::EventPublisher;
use domain::service::ServiceBinder;
use domain::status::{self, diagnostics};
use domain::{ConnectionState, Result, TextFormat};
use infrastructure::config::ServiceConfig;
use infrastructure::logging::TracingEventPublisher;
use infrastructure::service::SocketServiceBinder;

use crate::connection::{ConnectionSettings, ServiceConnectionManager};
use crate::transport::TransportClient;

pub const DEFAULT_BARCODE_WIDTH: i32 = 300;
pub const DEFAULT_BARCODE_HEIGHT: i32 = 160;
pub const DEFAULT_QR_WIDTH: i32 = 300;
pub const DEFAULT_QR_HEIGHT: i32 = 300;

/// High-level entry point for printing receipts.
///
/// Wires the platform socket binder and the tracing event sink into a
/// connection manager, then exposes the remote operations with POS
/// defaults filled in.
pub struct ReceiptPrinter {
    manager: ServiceConnectionManager,
    transport: TransportClient,
}

impl ReceiptPrinter {
    /// Attach using the loaded configuration and the platform socket
    /// transport.
    pub fn attach(config: &ServiceConfig) -> Self {
        let mut settings = ConnectionSettings::new(config.bind_candidates());
        settings.reconnect_base = Duration::from_millis(config.reconnect_base_ms);
        settings.max_reconnect_attempts = config.max_reconnect_attempts;
        settings.call_timeout = Duration::from_secs(config.call_timeout_secs);

        Self::attach_with(
            Arc::new(SocketServiceBinder::new()),
            Arc::new(TracingEventPublisher::new()),
            settings,
        )
    }

    /// Attach with explicit wiring. Used by tests and embedders that
    /// bring their own binder or event sink.
    pub fn attach_with(
        binder: Arc<dyn ServiceBinder>,
        events: Arc<dyn EventPublisher>,
        settings: ConnectionSettings,
    ) -> Self {
        let manager = ServiceConnectionManager::attach(binder, events, settings);
        let transport = TransportClient::new(&manager);
        Self { manager, transport }
    }

    /// Release the service binding and stop background work.
    pub async fn detach(self) {
        self.manager.detach().await;
    }

    pub fn is_service_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.manager.subscribe_state()
    }

    pub async fn print_text(&self, text: &str) -> Result<()> {
        self.transport.print_text(text, &TextFormat::default()).await
    }

    pub async fn print_text_formatted(&self, text: &str, format: &TextFormat) -> Result<()> {
        self.transport.print_text(text, format).await
    }

    pub async fn print_barcode(&self, text: &str) -> Result<()> {
        self.transport
            .print_barcode(text, DEFAULT_BARCODE_WIDTH, DEFAULT_BARCODE_HEIGHT)
            .await
    }

    pub async fn print_barcode_sized(&self, text: &str, width: i32, height: i32) -> Result<()> {
        self.transport.print_barcode(text, width, height).await
    }

    pub async fn print_qr_code(&self, text: &str) -> Result<()> {
        self.transport
            .print_qr_code(text, DEFAULT_QR_WIDTH, DEFAULT_QR_HEIGHT)
            .await
    }

    pub async fn print_qr_code_sized(&self, text: &str, width: i32, height: i32) -> Result<()> {
        self.transport.print_qr_code(text, width, height).await
    }

    pub async fn print_image(&self, data: &[u8]) -> Result<()> {
        self.transport.print_image(data).await
    }

    pub async fn check_paper(&self) -> Result<Option<i32>> {
        self.transport.check_paper().await
    }

    pub async fn feed_paper(&self, pixels: i32) -> Result<()> {
        self.transport.feed_paper(pixels).await
    }

    pub async fn get_version(&self) -> Result<Option<String>> {
        self.transport.printer_version().await
    }

    pub async fn get_service_version(&self) -> Result<Option<String>> {
        self.transport.service_version().await
    }

    pub async fn get_printer_model(&self) -> Result<Option<String>> {
        self.transport.printer_model().await
    }

    pub async fn get_printer_status(&self) -> Result<Option<i32>> {
        self.transport.printer_status().await
    }

    /// True when the printer reports ready and paper is present.
    /// Errors count as not ready.
    pub async fn is_ready(&self) -> bool {
        match self.transport.printer_status().await {
            Ok(Some(status::PRINTER_STATUS_READY)) => {}
            _ => return false,
        }
        matches!(
            self.transport.check_paper().await,
            Ok(Some(status::PAPER_PRESENT))
        )
    }

    /// Snapshot of printer identity and health for support bundles.
    /// Never fails; fields that could not be read carry the error text.
    pub async fn diagnostics(&self) -> BTreeMap<String, String> {
        let mut report = BTreeMap::new();
        report.insert(
            diagnostics::PRINTER_VERSION.to_string(),
            render_text(self.transport.printer_version().await),
        );
        report.insert(
            diagnostics::SERVICE_VERSION.to_string(),
            render_text(self.transport.service_version().await),
        );
        report.insert(
            diagnostics::PRINTER_MODEL.to_string(),
            render_text(self.transport.printer_model().await),
        );
        report.insert(
            diagnostics::PRINTER_STATUS.to_string(),
            render_code(self.transport.printer_status().await),
        );
        report.insert(
            diagnostics::PAPER_STATUS.to_string(),
            render_code(self.transport.check_paper().await),
        );
        report
    }
}

fn render_text(result: Result<Option<String>>) -> String {
    match result {
        Ok(Some(value)) => value,
        Ok(None) => "unknown".to_string(),
        Err(e) => e.to_string(),
    }
}

fn render_code(result: Result<Option<i32>>) -> String {
    match result {
        Ok(Some(value)) => value.to_string(),
        Ok(None) => "unknown".to_string(),
        Err(e) => e.to_string(),
    }
}
