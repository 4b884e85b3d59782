//! Shift-close notification
//!
//! At-most-once, decoupled from the closing transaction: the notification
//! fires after commit, and a failed delivery is logged with full context
//! but never surfaces into the close result.

use async_trait::async_trait;
use serde::Serialize;

/// Summary posted when a jornada closes
#[derive(Debug, Clone, Serialize)]
pub struct ShiftCloseSummary {
    pub jornada_id: i64,
    pub shift_date: String,
    pub party_name: String,
    pub closed_by: String,
    pub closed_at: i64,
    /// Settlement rows materialized from the roster
    pub settled_rows: usize,
    /// Register openings force-closed with the shift
    pub registers_closed: u64,
}

/// Close notification sink
#[async_trait]
pub trait CloseNotifier: Send + Sync {
    async fn shift_closed(&self, summary: &ShiftCloseSummary);
}

/// Log-only sink, used when no webhook is configured
pub struct LogNotifier;

#[async_trait]
impl CloseNotifier for LogNotifier {
    async fn shift_closed(&self, summary: &ShiftCloseSummary) {
        tracing::info!(
            jornada_id = summary.jornada_id,
            shift_date = %summary.shift_date,
            settled_rows = summary.settled_rows,
            "Shift closed"
        );
    }
}

/// Webhook sink posting the summary as JSON
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl CloseNotifier for WebhookNotifier {
    async fn shift_closed(&self, summary: &ShiftCloseSummary) {
        match self.client.post(&self.url).json(summary).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(
                    jornada_id = summary.jornada_id,
                    "Shift-close notification delivered"
                );
            }
            Ok(resp) => {
                tracing::warn!(
                    jornada_id = summary.jornada_id,
                    status = %resp.status(),
                    url = %self.url,
                    "Shift-close notification rejected"
                );
            }
            Err(e) => {
                tracing::warn!(
                    jornada_id = summary.jornada_id,
                    url = %self.url,
                    error = %e,
                    "Shift-close notification failed"
                );
            }
        }
    }
}
