use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;
use crate::error::Result;
use crate::wire::WireMap;

/// A named endpoint the printer service may be reachable under.
///
/// Platform generations ship the service under different names, so a
/// client carries an ordered list of candidates and binds the first
/// one that answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub address: String,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Result payload of a single remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteReply {
    /// Call completed, nothing to return
    Ack,
    /// Call completed with a numeric result, if the service sent one
    Code(Option<i32>),
    /// Call completed with a textual result, if the service sent one
    Text(Option<String>),
}

/// A live binding to the vendor printer service.
///
/// One method per remote operation. Implementations translate these
/// into whatever transport the platform actually speaks; errors come
/// back as `ConnectionFailed` when the transport itself broke and as
/// `RemoteFailure` when the service answered with a failure code.
#[async_trait]
pub trait PrinterService: Send + Sync {
    async fn printer_version(&self) -> Result<Option<String>>;

    async fn service_version(&self) -> Result<Option<String>>;

    async fn printer_model(&self) -> Result<Option<String>>;

    async fn printer_status(&self) -> Result<Option<i32>>;

    /// Query whether paper is present. Vendor code, see `status`.
    async fn check_paper(&self) -> Result<Option<i32>>;

    /// Advance the paper by the given number of pixels.
    async fn feed_paper(&self, pixels: i32) -> Result<()>;

    async fn print_text(&self, text: &str, format: &WireMap) -> Result<()>;

    async fn print_barcode(&self, text: &str, width: i32, height: i32) -> Result<()>;

    async fn print_qr_code(&self, text: &str, width: i32, height: i32) -> Result<()>;

    async fn print_bitmap(&self, bitmap: &Bitmap) -> Result<()>;

    /// Resolves once the binding is gone. Used by the connection
    /// manager to notice a lost service without polling.
    async fn closed(&self);
}

/// Factory for service bindings, one per endpoint candidate.
#[async_trait]
pub trait ServiceBinder: Send + Sync {
    async fn bind(&self, identity: &ServiceIdentity) -> Result<Arc<dyn PrinterService>>;
}
