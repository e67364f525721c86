use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use domain::service::{PrinterService, ServiceBinder, ServiceIdentity};
use domain::{Bitmap, PrintError, Result, WireMap};

/// One remote call as the mock saw it, arguments included
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    PrinterVersion,
    ServiceVersion,
    PrinterModel,
    PrinterStatus,
    CheckPaper,
    FeedPaper { pixels: i32 },
    PrintText { text: String, format: WireMap },
    PrintBarcode { text: String, width: i32, height: i32 },
    PrintQrCode { text: String, width: i32, height: i32 },
    PrintBitmap { width: u32, height: u32 },
}

struct MockInner {
    calls: Mutex<Vec<RecordedCall>>,
    printer_version: Mutex<Option<String>>,
    service_version: Mutex<Option<String>>,
    printer_model: Mutex<Option<String>>,
    printer_status: Mutex<Option<i32>>,
    paper_status: Mutex<Option<i32>>,
    fail_with: Mutex<Option<PrintError>>,
    hang: AtomicBool,
    lost: CancellationToken,
}

/// Scriptable in-memory service for tests.
///
/// Records every call, returns canned answers, and can be told to
/// fail, hang, or drop its binding on demand.
#[derive(Clone)]
pub struct MockPrinterService {
    inner: Arc<MockInner>,
}

impl MockPrinterService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockInner {
                calls: Mutex::new(Vec::new()),
                printer_version: Mutex::new(Some("1.0.0".to_string())),
                service_version: Mutex::new(Some("1.0.0".to_string())),
                printer_model: Mutex::new(Some("AUR-80".to_string())),
                printer_status: Mutex::new(Some(0)),
                paper_status: Mutex::new(Some(1)),
                fail_with: Mutex::new(None),
                hang: AtomicBool::new(false),
                lost: CancellationToken::new(),
            }),
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls.lock().await.clone()
    }

    pub async fn set_printer_version(&self, value: Option<String>) {
        *self.inner.printer_version.lock().await = value;
    }

    pub async fn set_service_version(&self, value: Option<String>) {
        *self.inner.service_version.lock().await = value;
    }

    pub async fn set_printer_model(&self, value: Option<String>) {
        *self.inner.printer_model.lock().await = value;
    }

    pub async fn set_printer_status(&self, value: Option<i32>) {
        *self.inner.printer_status.lock().await = value;
    }

    pub async fn set_paper_status(&self, value: Option<i32>) {
        *self.inner.paper_status.lock().await = value;
    }

    /// Every following call fails with a clone of this error.
    pub async fn fail_calls_with(&self, error: PrintError) {
        *self.inner.fail_with.lock().await = Some(error);
    }

    pub async fn clear_failure(&self) {
        *self.inner.fail_with.lock().await = None;
    }

    /// Make every following call block forever.
    pub fn hang_calls(&self, hang: bool) {
        self.inner.hang.store(hang, Ordering::Relaxed);
    }

    /// Simulate the service dropping the binding.
    pub fn drop_binding(&self) {
        self.inner.lost.cancel();
    }

    async fn guard(&self, call: RecordedCall) -> Result<()> {
        self.inner.calls.lock().await.push(call);
        if self.inner.hang.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        if let Some(error) = self.inner.fail_with.lock().await.clone() {
            return Err(error);
        }
        Ok(())
    }
}

impl Default for MockPrinterService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrinterService for MockPrinterService {
    async fn printer_version(&self) -> Result<Option<String>> {
        self.guard(RecordedCall::PrinterVersion).await?;
        Ok(self.inner.printer_version.lock().await.clone())
    }

    async fn service_version(&self) -> Result<Option<String>> {
        self.guard(RecordedCall::ServiceVersion).await?;
        Ok(self.inner.service_version.lock().await.clone())
    }

    async fn printer_model(&self) -> Result<Option<String>> {
        self.guard(RecordedCall::PrinterModel).await?;
        Ok(self.inner.printer_model.lock().await.clone())
    }

    async fn printer_status(&self) -> Result<Option<i32>> {
        self.guard(RecordedCall::PrinterStatus).await?;
        Ok(*self.inner.printer_status.lock().await)
    }

    async fn check_paper(&self) -> Result<Option<i32>> {
        self.guard(RecordedCall::CheckPaper).await?;
        Ok(*self.inner.paper_status.lock().await)
    }

    async fn feed_paper(&self, pixels: i32) -> Result<()> {
        self.guard(RecordedCall::FeedPaper { pixels }).await
    }

    async fn print_text(&self, text: &str, format: &WireMap) -> Result<()> {
        self.guard(RecordedCall::PrintText {
            text: text.to_string(),
            format: format.clone(),
        })
        .await
    }

    async fn print_barcode(&self, text: &str, width: i32, height: i32) -> Result<()> {
        self.guard(RecordedCall::PrintBarcode {
            text: text.to_string(),
            width,
            height,
        })
        .await
    }

    async fn print_qr_code(&self, text: &str, width: i32, height: i32) -> Result<()> {
        self.guard(RecordedCall::PrintQrCode {
            text: text.to_string(),
            width,
            height,
        })
        .await
    }

    async fn print_bitmap(&self, bitmap: &Bitmap) -> Result<()> {
        self.guard(RecordedCall::PrintBitmap {
            width: bitmap.width(),
            height: bitmap.height(),
        })
        .await
    }

    async fn closed(&self) {
        self.inner.lost.cancelled().await;
    }
}

/// Binder that hands out fresh mock services and can be scripted to
/// fail the first N binds or reject specific identities.
pub struct MockServiceBinder {
    bind_failures: AtomicUsize,
    rejected: Mutex<HashSet<String>>,
    bound: Mutex<Vec<(ServiceIdentity, MockPrinterService)>>,
    attempts: AtomicUsize,
}

impl MockServiceBinder {
    pub fn new() -> Self {
        Self {
            bind_failures: AtomicUsize::new(0),
            rejected: Mutex::new(HashSet::new()),
            bound: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail this many bind attempts before letting one succeed.
    pub fn fail_first_binds(&self, count: usize) {
        self.bind_failures.store(count, Ordering::Relaxed);
    }

    /// Always reject this identity, as if it were not registered.
    pub async fn reject_identity(&self, name: &str) {
        self.rejected.lock().await.insert(name.to_string());
    }

    /// Total bind attempts seen, failures included.
    pub fn bind_count(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Most recently bound mock, if any bind succeeded.
    pub async fn latest(&self) -> Option<MockPrinterService> {
        self.bound
            .lock()
            .await
            .last()
            .map(|(_, service)| service.clone())
    }

    /// Identity names of successful binds, in order.
    pub async fn bound_identities(&self) -> Vec<String> {
        self.bound
            .lock()
            .await
            .iter()
            .map(|(identity, _)| identity.name.clone())
            .collect()
    }
}

impl Default for MockServiceBinder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceBinder for MockServiceBinder {
    async fn bind(&self, identity: &ServiceIdentity) -> Result<Arc<dyn PrinterService>> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if self.rejected.lock().await.contains(&identity.name) {
            return Err(PrintError::ConnectionFailed(format!(
                "{} is not registered",
                identity.name
            )));
        }

        let remaining = self.bind_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.bind_failures.store(remaining - 1, Ordering::Relaxed);
            return Err(PrintError::ConnectionFailed(
                "simulated bind failure".to_string(),
            ));
        }

        let service = MockPrinterService::new();
        self.bound
            .lock()
            .await
            .push((identity.clone(), service.clone()));
        Ok(Arc::new(service))
    }
}
