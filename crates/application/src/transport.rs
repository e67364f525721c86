use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use domain::{
    Bitmap, ConnectionState, PrintError, PrintRequest, RemoteReply, Result, TextFormat,
};

use crate::connection::{Dispatch, ServiceConnectionManager};

/// Typed call surface over the connection manager's queue.
///
/// Every operation validates its arguments locally, fails fast when no
/// binding is up, and bounds the whole round trip with one timeout.
pub struct TransportClient {
    call_tx: mpsc::Sender<Dispatch>,
    state_rx: watch::Receiver<ConnectionState>,
    call_timeout: Duration,
}

impl TransportClient {
    pub fn new(manager: &ServiceConnectionManager) -> Self {
        Self {
            call_tx: manager.call_sender(),
            state_rx: manager.subscribe_state(),
            call_timeout: manager.call_timeout(),
        }
    }

    pub async fn printer_version(&self) -> Result<Option<String>> {
        self.query_text(PrintRequest::GetVersion).await
    }

    pub async fn service_version(&self) -> Result<Option<String>> {
        self.query_text(PrintRequest::GetServiceVersion).await
    }

    pub async fn printer_model(&self) -> Result<Option<String>> {
        self.query_text(PrintRequest::GetPrinterModel).await
    }

    pub async fn printer_status(&self) -> Result<Option<i32>> {
        self.query_code(PrintRequest::GetPrinterStatus).await
    }

    pub async fn print_text(&self, text: &str, format: &TextFormat) -> Result<()> {
        self.ack(PrintRequest::PrintText {
            text: text.to_string(),
            format: format.clone(),
        })
        .await
    }

    pub async fn print_barcode(&self, text: &str, width: i32, height: i32) -> Result<()> {
        self.ack(PrintRequest::PrintBarcode {
            text: text.to_string(),
            width,
            height,
        })
        .await
    }

    pub async fn print_qr_code(&self, text: &str, width: i32, height: i32) -> Result<()> {
        self.ack(PrintRequest::PrintQrCode {
            text: text.to_string(),
            width,
            height,
        })
        .await
    }

    /// Decode an encoded image (PNG, JPEG) and print it as a raster.
    pub async fn print_image(&self, data: &[u8]) -> Result<()> {
        let bitmap = decode_image(data)?;
        self.ack(PrintRequest::PrintBitmap { bitmap }).await
    }

    pub async fn check_paper(&self) -> Result<Option<i32>> {
        self.query_code(PrintRequest::CheckPaper).await
    }

    pub async fn feed_paper(&self, pixels: i32) -> Result<()> {
        self.ack(PrintRequest::FeedPaper { pixels }).await
    }

    async fn ack(&self, request: PrintRequest) -> Result<()> {
        self.dispatch(request).await.map(|_| ())
    }

    async fn query_code(&self, request: PrintRequest) -> Result<Option<i32>> {
        match self.dispatch(request).await? {
            RemoteReply::Code(value) => Ok(value),
            _ => Ok(None),
        }
    }

    async fn query_text(&self, request: PrintRequest) -> Result<Option<String>> {
        match self.dispatch(request).await? {
            RemoteReply::Text(value) => Ok(value),
            RemoteReply::Code(value) => Ok(value.map(|code| code.to_string())),
            RemoteReply::Ack => Ok(None),
        }
    }

    async fn dispatch(&self, request: PrintRequest) -> Result<RemoteReply> {
        request.validate()?;

        if !self.state_rx.borrow().can_dispatch() {
            return Err(PrintError::ServiceUnavailable);
        }

        let op = request.op_name();
        let (reply_tx, reply_rx) = oneshot::channel();
        let dispatch = Dispatch {
            request,
            reply: reply_tx,
        };

        let outcome = tokio::time::timeout(self.call_timeout, async {
            self.call_tx
                .send(dispatch)
                .await
                .map_err(|_| PrintError::ServiceUnavailable)?;
            reply_rx.await.map_err(|_| PrintError::ServiceUnavailable)?
        })
        .await;

        match outcome {
            Ok(result) => {
                if let Err(e) = &result {
                    debug!(op, error = %e, "Call failed");
                }
                result
            }
            Err(_) => {
                warn!(op, timeout_ms = self.call_timeout.as_millis() as u64, "Call timed out");
                Err(PrintError::Timeout)
            }
        }
    }
}

/// Decode image bytes into the grayscale raster the service accepts.
fn decode_image(data: &[u8]) -> Result<Bitmap> {
    if data.is_empty() {
        return Err(PrintError::invalid_argument("image", "must not be empty"));
    }
    let decoded = image::load_from_memory(data)
        .map_err(|e| PrintError::invalid_argument("image", e.to_string()))?;
    let gray = decoded.to_luma8();
    Bitmap::new(gray.width(), gray.height(), gray.into_raw())
}
