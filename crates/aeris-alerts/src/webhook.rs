//! Outbound webhook dispatch: a single POST of the batch of alerts fired
//! this pipeline run. Delivery failure is logged, never fatal — the alert
//! rows are already persisted by the time this runs.

use aeris_common::model::NotificationChannel;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAlert {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub route_id: Uuid,
    pub alert_type: String,
    pub message: String,
    pub score_before: Option<f64>,
    pub score_after: f64,
    pub channels: Vec<NotificationChannel>,
}

#[derive(Debug, Clone, Serialize)]
struct WebhookPayload {
    alerts: Vec<WebhookAlert>,
    timestamp: DateTime<Utc>,
}

/// POST the alert batch to `webhook_url`. No-ops if `alerts` is empty.
/// Non-2xx responses and transport errors are logged and swallowed.
pub async fn dispatch(client: &Client, webhook_url: &str, alerts: Vec<WebhookAlert>, now: DateTime<Utc>) {
    if alerts.is_empty() {
        return;
    }
    let payload = WebhookPayload { alerts, timestamp: now };
    match client.post(webhook_url).json(&payload).send().await {
        Ok(resp) if resp.status().is_client_error() || resp.status().is_server_error() => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %body, "alert webhook POST failed");
        }
        Ok(_) => info!(count = payload.alerts.len(), "dispatched alert webhook"),
        Err(e) => warn!(error = %e, "alert webhook POST error"),
    }
}

/// Short human-readable message for the webhook payload, mirroring the
/// per-kind summaries the original automation workflow expects.
pub fn alert_message(kind: &str, score_before: Option<f64>, score_after: f64) -> String {
    match kind {
        "route_deterioration" => format!(
            "Route exposure increased from {:.2} to {:.2}.",
            score_before.unwrap_or(0.0),
            score_after
        ),
        "hazard" => format!("High pollution (UPES {:.2}) detected along your route.", score_after),
        "wind_shift" => "Wind may be moving pollution toward your route.".to_string(),
        "time_based" => "Recent exposure is higher than your recent best; consider traveling at a different time.".to_string(),
        other => format!("Alert: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_is_noop_on_empty_batch() {
        let client = Client::new();
        let fut = dispatch(&client, "https://example.invalid/hook", Vec::new(), Utc::now());
        tokio_test::block_on(fut);
    }

    #[test]
    fn message_formats_each_known_kind() {
        assert!(alert_message("hazard", None, 0.9).contains("0.90"));
        assert!(alert_message("route_deterioration", Some(0.3), 0.42).contains("0.30"));
        assert_eq!(alert_message("wind_shift", None, 0.0), "Wind may be moving pollution toward your route.");
        assert!(alert_message("unknown_kind", None, 0.0).contains("unknown_kind"));
    }
}
