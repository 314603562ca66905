//! Notification dispatcher

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{ReportRecord, Schedule};
use crate::notifications::{MailAttachment, MailMessage, MailTransport, PdfExporter};

/// Best-effort dispatcher over a replaceable mail transport
///
/// Constructed per host (never a process-wide singleton) so multiple
/// instances can coexist in tests. The transport can be installed, swapped,
/// or cleared at any time.
pub struct NotificationDispatcher {
    transport: RwLock<Option<Arc<dyn MailTransport>>>,
    pdf_exporter: RwLock<Option<Arc<dyn PdfExporter>>>,
    from_address: String,
    subject_prefix: String,
}

impl NotificationDispatcher {
    pub fn new(from_address: String, subject_prefix: String) -> Self {
        Self {
            transport: RwLock::new(None),
            pdf_exporter: RwLock::new(None),
            from_address,
            subject_prefix,
        }
    }

    /// Install or replace the mail transport
    pub async fn set_transport(&self, transport: Arc<dyn MailTransport>) {
        *self.transport.write().await = Some(transport);
    }

    /// Remove the transport, turning `send` into a no-op
    pub async fn clear_transport(&self) {
        *self.transport.write().await = None;
    }

    /// Install a PDF exporter used to best-effort attach a rendered PDF
    pub async fn set_pdf_exporter(&self, exporter: Arc<dyn PdfExporter>) {
        *self.pdf_exporter.write().await = Some(exporter);
    }

    pub async fn has_transport(&self) -> bool {
        self.transport.read().await.is_some()
    }

    /// Send a completed-report notification to the schedule's recipients
    ///
    /// Never fails: with no transport configured this is a no-op, a PDF
    /// export failure degrades to a link-only message, and a transport
    /// failure is logged and swallowed.
    pub async fn send(&self, record: &ReportRecord, schedule: &Schedule) {
        let transport = match self.transport.read().await.clone() {
            Some(transport) => transport,
            None => {
                debug!(
                    record_id = %record.id,
                    "No mail transport configured, skipping notification"
                );
                return;
            }
        };

        let mut message = MailMessage {
            from: self.from_address.clone(),
            to: schedule.recipients.clone(),
            subject: format!("{}{}", self.subject_prefix, record.title),
            html: format!(
                "<p>The report <strong>{}</strong> for schedule <strong>{}</strong> \
                 was generated at {}.</p><p>Artifact: <code>{}</code></p>",
                record.title,
                schedule.name,
                record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                record.path.display()
            ),
            attachments: Vec::new(),
        };

        if let Some(exporter) = self.pdf_exporter.read().await.clone() {
            match self.build_pdf_attachment(&*exporter, record).await {
                Ok(attachment) => message.attachments.push(attachment),
                Err(e) => warn!(
                    record_id = %record.id,
                    "PDF attachment failed, sending link-only notification: {e}"
                ),
            }
        }

        match transport.send(&message).await {
            Ok(delivery_id) => info!(
                record_id = %record.id,
                delivery_id = %delivery_id,
                recipients = schedule.recipients.len(),
                "Notification delivered"
            ),
            Err(e) => warn!(record_id = %record.id, "Notification delivery failed: {e}"),
        }
    }

    async fn build_pdf_attachment(
        &self,
        exporter: &dyn PdfExporter,
        record: &ReportRecord,
    ) -> Result<MailAttachment, crate::errors::NotificationError> {
        let pdf_path = exporter.export(&record.path).await?;
        let content = tokio::fs::read(&pdf_path).await.map_err(|e| {
            crate::errors::NotificationError::Attachment {
                message: format!("reading {}: {e}", pdf_path.display()),
            }
        })?;
        Ok(MailAttachment {
            filename: format!("{}.pdf", record.id),
            content_type: "application/pdf".to_string(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NotificationError;
    use crate::models::{DataSourceSpec, ReportConfig};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: &MailMessage) -> Result<String, NotificationError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok("delivery-1".to_string())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl MailTransport for FailingTransport {
        async fn send(&self, _message: &MailMessage) -> Result<String, NotificationError> {
            Err(NotificationError::transport("smtp unreachable"))
        }
    }

    struct FailingPdfExporter;

    #[async_trait]
    impl PdfExporter for FailingPdfExporter {
        async fn export(&self, _artifact: &Path) -> Result<PathBuf, NotificationError> {
            Err(NotificationError::Attachment {
                message: "pdf engine unavailable".to_string(),
            })
        }
    }

    fn sample_schedule() -> Schedule {
        Schedule {
            id: "s1".to_string(),
            name: "Daily sales".to_string(),
            cron_expression: "0 9 * * *".to_string(),
            timezone: "UTC".to_string(),
            report_config: ReportConfig {
                title: "Daily".to_string(),
                charts: vec![],
                data_source: DataSourceSpec {
                    name: "sales".to_string(),
                    format: "json".to_string(),
                },
            },
            recipients: vec!["ops@example.com".to_string()],
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_record() -> ReportRecord {
        ReportRecord {
            id: "r1".to_string(),
            title: "Daily".to_string(),
            path: PathBuf::from("daily-1.html"),
            schedule_id: Some("s1".to_string()),
            schedule_name: "Daily sales".to_string(),
            timestamp: Utc::now(),
            tags: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_send_without_transport_is_a_noop() {
        let dispatcher = NotificationDispatcher::new(
            "reports@example.com".to_string(),
            "[reports] ".to_string(),
        );
        assert!(!dispatcher.has_transport().await);
        // Must not panic or error
        dispatcher.send(&sample_record(), &sample_schedule()).await;
    }

    #[tokio::test]
    async fn test_send_builds_message_from_record_and_schedule() {
        let dispatcher = NotificationDispatcher::new(
            "reports@example.com".to_string(),
            "[reports] ".to_string(),
        );
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        dispatcher.set_transport(transport.clone()).await;

        dispatcher.send(&sample_record(), &sample_schedule()).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "reports@example.com");
        assert_eq!(sent[0].to, vec!["ops@example.com".to_string()]);
        assert_eq!(sent[0].subject, "[reports] Daily");
        assert!(sent[0].html.contains("daily-1.html"));
        assert!(sent[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let dispatcher =
            NotificationDispatcher::new("reports@example.com".to_string(), String::new());
        dispatcher.set_transport(Arc::new(FailingTransport)).await;
        // Must not panic; failure is logged, not returned
        dispatcher.send(&sample_record(), &sample_schedule()).await;
    }

    #[tokio::test]
    async fn test_pdf_failure_degrades_to_link_only() {
        let dispatcher =
            NotificationDispatcher::new("reports@example.com".to_string(), String::new());
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        dispatcher.set_transport(transport.clone()).await;
        dispatcher.set_pdf_exporter(Arc::new(FailingPdfExporter)).await;

        dispatcher.send(&sample_record(), &sample_schedule()).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_clear_transport_restores_noop() {
        let dispatcher =
            NotificationDispatcher::new("reports@example.com".to_string(), String::new());
        dispatcher
            .set_transport(Arc::new(crate::notifications::LogTransport))
            .await;
        assert!(dispatcher.has_transport().await);
        dispatcher.clear_transport().await;
        assert!(!dispatcher.has_transport().await);
    }
}
