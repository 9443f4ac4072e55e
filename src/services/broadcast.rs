// services/broadcast.rs
use futures::future::join_all;
use serde::Serialize;
use tracing::info;

use super::notify_service::{ChannelOutcome, NotificationResult, NotificationService};
use super::templates::emergency_alert_body;

/// One broadcast target. The display name is informational only; delivery is
/// keyed on the phone number.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub phone: String,
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(phone: impl Into<String>) -> Self {
        Recipient {
            phone: phone.into(),
            name: None,
        }
    }
}

/// Per-entry result of a WhatsApp-only bulk send, tagged with the phone it
/// was addressed to. Results come back in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSendResult {
    pub phone: String,
    pub outcome: ChannelOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientResult {
    pub phone: String,
    pub result: NotificationResult,
}

/// Aggregate of a multi-recipient broadcast. A recipient counts as `sent`
/// when at least one channel got through, and as `failed` only when both
/// channels failed.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastSummary {
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<RecipientResult>,
}

impl BroadcastSummary {
    fn empty() -> Self {
        BroadcastSummary {
            sent: 0,
            failed: 0,
            results: Vec::new(),
        }
    }
}

impl NotificationService {
    /// Send each (phone, message) pair over the chat channel only, all
    /// in-flight together. One entry's failure never aborts its siblings, and
    /// a missing provider configuration short-circuits every entry without a
    /// single network call.
    pub async fn send_bulk_whatsapp(&self, entries: &[(String, String)]) -> Vec<BulkSendResult> {
        info!("Bulk whatsapp send to {} recipients", entries.len());

        let sends = entries.iter().map(|(phone, message)| async move {
            BulkSendResult {
                phone: phone.clone(),
                outcome: self.send_whatsapp(phone, message).await,
            }
        });

        join_all(sends).await
    }

    /// Fan one message out to every recipient over both channels, all
    /// recipients concurrently, and aggregate sent/failed counts.
    pub async fn broadcast_to_recipients(
        &self,
        recipients: &[Recipient],
        body: &str,
    ) -> BroadcastSummary {
        if recipients.is_empty() {
            return BroadcastSummary::empty();
        }

        info!("Broadcasting to {} recipients", recipients.len());

        let sends = recipients.iter().map(|recipient| async move {
            RecipientResult {
                phone: recipient.phone.clone(),
                result: self.send_notification(&recipient.phone, body).await,
            }
        });

        let results = join_all(sends).await;
        let sent = results.iter().filter(|r| r.result.any_sent()).count();
        let failed = results.len() - sent;

        info!("Broadcast complete: {} sent, {} failed", sent, failed);

        BroadcastSummary {
            sent,
            failed,
            results,
        }
    }

    /// Render the emergency template once and broadcast it to every recipient.
    pub async fn broadcast_emergency(
        &self,
        recipients: &[Recipient],
        severity: &str,
        title: &str,
        body: &str,
    ) -> BroadcastSummary {
        let message = emergency_alert_body(severity, title, body);
        self.broadcast_to_recipients(recipients, &message).await
    }
}
