use async_trait::async_trait;

use crate::collaborators::{Alert, AlertSeverity, AlertSink};
use crate::error::PromptingError;

/// Default AlertSink: logs through `tracing` at a level matched to
/// severity. The real email/Slack transport is out of scope (spec §1).
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn alert(&self, alert: Alert) -> Result<(), PromptingError> {
        match alert.severity {
            AlertSeverity::Info => tracing::info!(message = %alert.message, "alert"),
            AlertSeverity::Warning => tracing::warn!(message = %alert.message, "alert"),
            AlertSeverity::Critical => tracing::error!(message = %alert.message, "alert"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logs_without_error() {
        let sink = LoggingAlertSink;
        let result = sink
            .alert(Alert {
                severity: AlertSeverity::Warning,
                message: "broker retry".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
