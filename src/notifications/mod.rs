//! Best-effort email delivery of completed reports
//!
//! Delivery is an optional enhancement: with no transport configured the
//! dispatcher is a documented no-op, and no failure in here ever propagates
//! to the pipeline.

pub mod dispatcher;

pub use dispatcher::NotificationDispatcher;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::errors::NotificationError;

/// One attachment on an outgoing message
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// An outgoing notification message
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<MailAttachment>,
}

/// Mail delivery contract; returns a transport-specific delivery id
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<String, NotificationError>;
}

/// Optional PDF rendering of an artifact for attachment
///
/// `artifact` is the path relative to the reports root; the exporter
/// returns an absolute path to the produced PDF.
#[async_trait]
pub trait PdfExporter: Send + Sync {
    async fn export(&self, artifact: &Path) -> Result<PathBuf, NotificationError>;
}

/// Transport that logs instead of delivering
///
/// Used when notifications are enabled without real SMTP wiring, and by
/// tests.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, message: &MailMessage) -> Result<String, NotificationError> {
        info!(
            to = %message.to.join(", "),
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Would deliver notification (log transport)"
        );
        Ok(format!("log-{}", uuid::Uuid::new_v4()))
    }
}
