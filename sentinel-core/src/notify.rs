//! Notification boundary
//!
//! The engine hands approved alerts to a dispatcher and moves on; it never
//! retries and a send failure never blocks sample processing.

use crate::hygiene::ApprovedAlert;
use crate::rules::Severity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-agnostic alert payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub title: String,
    pub body: String,
    pub severity: Severity,
    /// Stable key for downstream dedupe/threading
    pub dedupe_key: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ApprovedAlert> for AlertPayload {
    fn from(alert: &ApprovedAlert) -> Self {
        Self {
            title: format!("{} [{}]", alert.instrument, alert.rule_id),
            body: alert.message.clone(),
            severity: alert.severity,
            dedupe_key: format!("{}:{}", alert.rule_id, alert.instrument),
            timestamp: alert.timestamp,
        }
    }
}

/// Dispatch failure. Always retryable from the engine's point of view; the
/// external dispatcher owns any retry policy.
#[derive(Debug, Error)]
#[error("notify failed (retryable): {0}")]
pub struct NotifyError(pub String);

/// Outbound notification dispatcher.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &AlertPayload) -> std::result::Result<(), NotifyError>;
}
