use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::service::{PrinterService, ServiceBinder, ServiceIdentity};
use domain::{Bitmap, PrintError, Result, WireMap};

const BIND_TIMEOUT: Duration = Duration::from_secs(5);

// Flags confirmed against the vendor service
const BARCODE_SHOW_TEXT: bool = true;
const BARCODE_CUT: bool = false;
const QR_CUT: bool = false;
const BITMAP_CENTERED: bool = true;
const BITMAP_CUT: bool = false;

/// One reply line from the service, matched to its call by id.
#[derive(Debug, Deserialize)]
struct ResponseFrame {
    id: u64,
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    value: serde_json::Value,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<ResponseFrame>>>>;

/// Client for the platform's Unix-socket printer daemon.
///
/// Calls go out as newline-delimited JSON frames; a background reader
/// task routes reply frames back to waiting calls by id and flips the
/// closed token when the peer goes away.
pub struct SocketPrinterService {
    writer: Mutex<OwnedWriteHalf>,
    pending: PendingMap,
    next_id: AtomicU64,
    closed: CancellationToken,
    reader: JoinHandle<()>,
}

impl SocketPrinterService {
    async fn connect(identity: &ServiceIdentity) -> Result<Self> {
        let connect = UnixStream::connect(&identity.address);
        let stream = match tokio::time::timeout(BIND_TIMEOUT, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(PrintError::ConnectionFailed(e.to_string())),
            Err(_) => {
                return Err(PrintError::ConnectionFailed(
                    "connect timed out".to_string(),
                ));
            }
        };

        let (read_half, write_half) = stream.into_split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = CancellationToken::new();
        let reader = tokio::spawn(read_loop(read_half, pending.clone(), closed.clone()));

        Ok(Self {
            writer: Mutex::new(write_half),
            pending,
            next_id: AtomicU64::new(1),
            closed,
            reader,
        })
    }

    async fn call(&self, op: &str, fields: &WireMap) -> Result<serde_json::Value> {
        if self.closed.is_cancelled() {
            return Err(PrintError::ConnectionFailed(
                "binding already closed".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut frame = serde_json::Map::new();
        frame.insert("id".to_string(), serde_json::json!(id));
        frame.insert("op".to_string(), serde_json::json!(op));
        for (key, value) in fields.iter() {
            let encoded = serde_json::to_value(value)
                .map_err(|e| PrintError::ConnectionFailed(e.to_string()))?;
            frame.insert(key.clone(), encoded);
        }
        let mut line = serde_json::Value::Object(frame).to_string();
        line.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, reply_tx);

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&id);
                return Err(PrintError::ConnectionFailed(e.to_string()));
            }
            if let Err(e) = writer.flush().await {
                self.pending.lock().await.remove(&id);
                return Err(PrintError::ConnectionFailed(e.to_string()));
            }
        }

        debug!(op, id, "Call frame sent");

        let response = reply_rx.await.map_err(|_| {
            PrintError::ConnectionFailed("binding lost before reply".to_string())
        })?;

        if response.code != 0 {
            return Err(PrintError::remote(response.code, response.message));
        }
        Ok(response.value)
    }

    async fn call_ack(&self, op: &str, fields: &WireMap) -> Result<()> {
        self.call(op, fields).await.map(|_| ())
    }

    async fn call_text(&self, op: &str) -> Result<Option<String>> {
        let value = self.call(op, &WireMap::new()).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn call_code(&self, op: &str, fields: &WireMap) -> Result<Option<i32>> {
        let value = self.call(op, fields).await?;
        Ok(value.as_i64().map(|v| v as i32))
    }
}

impl Drop for SocketPrinterService {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(read_half: OwnedReadHalf, pending: PendingMap, closed: CancellationToken) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<ResponseFrame>(&line) {
                Ok(frame) => {
                    let waiter = pending.lock().await.remove(&frame.id);
                    match waiter {
                        Some(reply_tx) => {
                            let _ = reply_tx.send(frame);
                        }
                        None => debug!(id = frame.id, "Reply without a waiting call"),
                    }
                }
                Err(e) => warn!(error = %e, "Discarding malformed reply frame"),
            },
            Ok(None) => {
                info!("Printer service closed the socket");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Socket read failed");
                break;
            }
        }
    }
    // Wake every waiting call, then signal the binding loss
    pending.lock().await.clear();
    closed.cancel();
}

#[async_trait]
impl PrinterService for SocketPrinterService {
    async fn printer_version(&self) -> Result<Option<String>> {
        self.call_text("getPrinterVersion").await
    }

    async fn service_version(&self) -> Result<Option<String>> {
        self.call_text("serviceVersion").await
    }

    async fn printer_model(&self) -> Result<Option<String>> {
        self.call_text("getPrinterModel").await
    }

    async fn printer_status(&self) -> Result<Option<i32>> {
        self.call_code("printerStatus", &WireMap::new()).await
    }

    async fn check_paper(&self) -> Result<Option<i32>> {
        // A zero-pixel feed doubles as the paper presence query
        let mut fields = WireMap::new();
        fields.insert("pixels", 0);
        self.call_code("paperOut", &fields).await
    }

    async fn feed_paper(&self, pixels: i32) -> Result<()> {
        let mut fields = WireMap::new();
        fields.insert("pixels", pixels);
        self.call_ack("paperOut", &fields).await
    }

    async fn print_text(&self, text: &str, format: &WireMap) -> Result<()> {
        let mut fields = format.clone();
        fields.insert("text", text);
        self.call_ack("printText", &fields).await
    }

    async fn print_barcode(&self, text: &str, width: i32, height: i32) -> Result<()> {
        let mut fields = WireMap::new();
        fields.insert("text", text);
        fields.insert("width", width);
        fields.insert("height", height);
        fields.insert("showText", BARCODE_SHOW_TEXT);
        fields.insert("cut", BARCODE_CUT);
        self.call_ack("printBarcode", &fields).await
    }

    async fn print_qr_code(&self, text: &str, width: i32, height: i32) -> Result<()> {
        let mut fields = WireMap::new();
        fields.insert("text", text);
        fields.insert("width", width);
        fields.insert("height", height);
        fields.insert("cut", QR_CUT);
        self.call_ack("printQrCode", &fields).await
    }

    async fn print_bitmap(&self, bitmap: &Bitmap) -> Result<()> {
        let mut fields = WireMap::new();
        fields.insert("width", bitmap.width() as i64);
        fields.insert("height", bitmap.height() as i64);
        fields.insert("pixels", bitmap.pixels().to_vec());
        fields.insert("centered", BITMAP_CENTERED);
        fields.insert("cut", BITMAP_CUT);
        self.call_ack("printBitmap", &fields).await
    }

    async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

/// Binds candidates by connecting to their Unix sockets.
pub struct SocketServiceBinder;

impl SocketServiceBinder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SocketServiceBinder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceBinder for SocketServiceBinder {
    async fn bind(&self, identity: &ServiceIdentity) -> Result<Arc<dyn PrinterService>> {
        info!(service = %identity.name, address = %identity.address, "Binding printer service socket");
        let service = SocketPrinterService::connect(identity).await?;
        Ok(Arc::new(service))
    }
}
