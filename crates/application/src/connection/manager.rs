use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::event::{ConnectionEvent, EventPublisher};
use domain::service::{PrinterService, RemoteReply, ServiceBinder, ServiceIdentity};
use domain::{ConnectionState, PrintError, PrintRequest, Result};

/// Tuning knobs for one attach
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Service endpoints in bind order, first match wins
    pub candidates: Vec<ServiceIdentity>,
    /// Backoff for the first rebind attempt, doubled on each failure
    pub reconnect_base: Duration,
    /// Rebind attempts before the binding is declared failed
    pub max_reconnect_attempts: u32,
    /// Deadline for a single remote call, queueing included
    pub call_timeout: Duration,
    /// Call queue depth before senders start waiting
    pub queue_depth: usize,
}

impl ConnectionSettings {
    pub fn new(candidates: Vec<ServiceIdentity>) -> Self {
        Self {
            candidates,
            reconnect_base: Duration::from_secs(1),
            max_reconnect_attempts: 5,
            call_timeout: Duration::from_secs(10),
            queue_depth: 32,
        }
    }
}

/// One queued call with its reply slot
pub(crate) struct Dispatch {
    pub(crate) request: PrintRequest,
    pub(crate) reply: oneshot::Sender<Result<RemoteReply>>,
}

/// Owns the binding to the printer service and the single worker task
/// that serializes all calls onto it.
///
/// Dropping the manager aborts the worker; prefer `detach` for a clean
/// shutdown that releases the binding and emits the final event.
pub struct ServiceConnectionManager {
    call_tx: mpsc::Sender<Dispatch>,
    state_rx: watch::Receiver<ConnectionState>,
    call_timeout: Duration,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl ServiceConnectionManager {
    /// Spawn the worker and start binding immediately.
    pub fn attach(
        binder: Arc<dyn ServiceBinder>,
        events: Arc<dyn EventPublisher>,
        settings: ConnectionSettings,
    ) -> Self {
        let (call_tx, call_rx) = mpsc::channel(settings.queue_depth);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Unbound);
        let cancel = CancellationToken::new();
        let call_timeout = settings.call_timeout;

        let worker = Worker {
            binder,
            events,
            settings,
            state_tx,
            cancel: cancel.clone(),
            service: None,
            reconnect_attempts: 0,
            reconnect_at: None,
        };
        let handle = tokio::spawn(worker.run(call_rx));

        Self {
            call_tx,
            state_rx,
            call_timeout,
            cancel,
            worker: handle,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_bound()
    }

    /// Release the binding and stop the worker. Pending reconnect
    /// timers are dropped, queued calls are answered with
    /// `ServiceUnavailable` by the closing queue.
    pub async fn detach(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.worker).await {
            warn!(error = %e, "Connection worker did not shut down cleanly");
        }
    }

    pub(crate) fn call_sender(&self) -> mpsc::Sender<Dispatch> {
        self.call_tx.clone()
    }

    pub(crate) fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

impl Drop for ServiceConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker {
    binder: Arc<dyn ServiceBinder>,
    events: Arc<dyn EventPublisher>,
    settings: ConnectionSettings,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    service: Option<Arc<dyn PrinterService>>,
    reconnect_attempts: u32,
    reconnect_at: Option<Instant>,
}

impl Worker {
    async fn run(mut self, mut call_rx: mpsc::Receiver<Dispatch>) {
        info!("Service connection worker started");
        let cancel = self.cancel.clone();

        self.advance(self.state().to_binding());
        match self.bind_any().await {
            Ok((identity, service)) => self.on_bound(identity, service).await,
            Err(e) => {
                warn!(error = %e, "Initial bind failed");
                self.schedule_reconnect().await;
            }
        }

        loop {
            let live = self.service.clone();
            let due = self.reconnect_at;

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.release().await;
                    break;
                }
                maybe_call = call_rx.recv() => {
                    match maybe_call {
                        Some(dispatch) => self.handle_call(dispatch).await,
                        None => {
                            // All call handles dropped, nothing left to serve
                            self.release().await;
                            break;
                        }
                    }
                }
                _ = wait_closed(&live) => {
                    self.on_service_lost("service closed the binding").await;
                }
                _ = wait_until(due) => {
                    self.attempt_rebind().await;
                }
            }
        }

        info!("Service connection worker stopped");
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn advance(&self, transition: std::result::Result<ConnectionState, &'static str>) {
        match transition {
            Ok(next) => {
                self.state_tx.send_replace(next);
            }
            Err(reason) => warn!(reason = %reason, "Invalid connection state transition"),
        }
    }

    async fn publish(&self, event: ConnectionEvent) {
        if let Err(e) = self.events.publish(event).await {
            warn!(error = %e, "Failed to publish connection event");
        }
    }

    /// Try every candidate endpoint in order, first success wins.
    async fn bind_any(&self) -> Result<(ServiceIdentity, Arc<dyn PrinterService>)> {
        let mut last_error = PrintError::ServiceUnavailable;
        for identity in &self.settings.candidates {
            match self.binder.bind(identity).await {
                Ok(service) => {
                    info!(service = %identity.name, "Bound to printer service");
                    return Ok((identity.clone(), service));
                }
                Err(e) => {
                    warn!(service = %identity.name, error = %e, "Bind attempt failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn on_bound(&mut self, identity: ServiceIdentity, service: Arc<dyn PrinterService>) {
        self.service = Some(service);
        self.reconnect_attempts = 0;
        self.reconnect_at = None;
        self.advance(self.state().to_bound());
        self.publish(ConnectionEvent::service_bound(identity)).await;
    }

    async fn on_service_lost(&mut self, reason: &str) {
        if self.service.is_none() {
            return;
        }
        warn!(reason = %reason, "Printer service binding lost");
        self.service = None;
        self.publish(ConnectionEvent::service_lost(reason)).await;
        self.schedule_reconnect().await;
    }

    async fn schedule_reconnect(&mut self) {
        if self.reconnect_attempts >= self.settings.max_reconnect_attempts {
            warn!(
                attempts = self.reconnect_attempts,
                "Reconnect budget exhausted, giving up"
            );
            self.reconnect_at = None;
            self.state_tx.send_replace(self.state().to_failed());
            self.publish(ConnectionEvent::reconnect_exhausted(self.reconnect_attempts))
                .await;
            return;
        }

        self.reconnect_attempts += 1;
        let delay = self.settings.reconnect_base * 2u32.pow(self.reconnect_attempts - 1);
        debug!(
            attempt = self.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling rebind"
        );
        self.reconnect_at = Some(Instant::now() + delay);
        self.advance(self.state().to_reconnecting());
        self.publish(ConnectionEvent::reconnect_scheduled(
            self.reconnect_attempts,
            delay.as_millis() as u64,
        ))
        .await;
    }

    async fn attempt_rebind(&mut self) {
        self.reconnect_at = None;
        match self.bind_any().await {
            Ok((identity, service)) => self.on_bound(identity, service).await,
            Err(e) => {
                warn!(error = %e, "Rebind attempt failed");
                self.schedule_reconnect().await;
            }
        }
    }

    async fn release(&mut self) {
        self.service = None;
        self.reconnect_at = None;
        self.state_tx.send_replace(self.state().to_unbound());
        self.publish(ConnectionEvent::detached()).await;
    }

    async fn handle_call(&mut self, dispatch: Dispatch) {
        let op = dispatch.request.op_name();

        let Some(service) = self.service.clone() else {
            debug!(op, "Rejecting call, no service binding");
            let _ = dispatch.reply.send(Err(PrintError::ServiceUnavailable));
            return;
        };

        // Bound execution so a silent service cannot wedge the worker
        let result = match tokio::time::timeout(
            self.settings.call_timeout,
            execute(service.as_ref(), dispatch.request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PrintError::Timeout),
        };

        if let Err(PrintError::ConnectionFailed(reason)) = &result {
            let reason = reason.clone();
            let _ = dispatch.reply.send(Err(PrintError::ServiceUnavailable));
            self.on_service_lost(&reason).await;
            return;
        }

        if dispatch.reply.send(result).is_err() {
            // Caller gave up waiting, usually its own timeout fired
            debug!(op, "Reply receiver dropped before delivery");
        }
    }
}

/// Run one request against the live binding.
async fn execute(service: &dyn PrinterService, request: PrintRequest) -> Result<RemoteReply> {
    match request {
        PrintRequest::GetVersion => service.printer_version().await.map(RemoteReply::Text),
        PrintRequest::GetServiceVersion => service.service_version().await.map(RemoteReply::Text),
        PrintRequest::GetPrinterModel => service.printer_model().await.map(RemoteReply::Text),
        PrintRequest::GetPrinterStatus => service.printer_status().await.map(RemoteReply::Code),
        PrintRequest::PrintText { text, format } => {
            let wire_format = format.to_wire_map()?;
            service
                .print_text(&text, &wire_format)
                .await
                .map(|_| RemoteReply::Ack)
        }
        PrintRequest::PrintBarcode {
            text,
            width,
            height,
        } => service
            .print_barcode(&text, width, height)
            .await
            .map(|_| RemoteReply::Ack),
        PrintRequest::PrintQrCode {
            text,
            width,
            height,
        } => service
            .print_qr_code(&text, width, height)
            .await
            .map(|_| RemoteReply::Ack),
        PrintRequest::PrintBitmap { bitmap } => {
            service.print_bitmap(&bitmap).await.map(|_| RemoteReply::Ack)
        }
        PrintRequest::CheckPaper => service.check_paper().await.map(RemoteReply::Code),
        PrintRequest::FeedPaper { pixels } => {
            service.feed_paper(pixels).await.map(|_| RemoteReply::Ack)
        }
    }
}

async fn wait_closed(service: &Option<Arc<dyn PrinterService>>) {
    match service {
        Some(live) => live.closed().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
