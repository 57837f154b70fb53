//! Harmony job submission, polling, and GeoTIFF download, with
//! exponential-backoff retry on 429/5xx responses.

use crate::config::RetryConfig;
use aeris_common::{AerisError, AerisResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub enum SubmitOutcome {
    /// Redirect to, or JSON job-status response naming, an async job URL.
    AsyncJob(String),
    /// Synchronous GeoTIFF bytes already in hand.
    SyncBytes(Vec<u8>),
    /// A synchronous JSON response naming a direct data link.
    DataLink(String),
}

async fn request_with_retry(
    client: &Client,
    url: &str,
    token: Option<&str>,
    retry: &RetryConfig,
) -> AerisResult<reqwest::Response> {
    let mut attempt = 0;
    loop {
        let mut req = client.get(url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    attempt += 1;
                    if attempt >= retry.max_attempts {
                        return Err(AerisError::UpstreamRejected(format!(
                            "broker returned {status} after {attempt} attempts"
                        )));
                    }
                    let delay = retry.base_delay_secs * 2u64.pow(attempt - 1);
                    warn!(status = %status, delay_secs = delay, "broker request rate-limited or unavailable, retrying");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }
                return Ok(resp);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= retry.max_attempts {
                    return Err(AerisError::UpstreamTransient(format!(
                        "broker request failed after {attempt} attempts: {e}"
                    )));
                }
                let delay = retry.base_delay_secs * 2u64.pow(attempt - 1);
                warn!(error = %e, delay_secs = delay, "broker request error, retrying");
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
        }
    }
}

/// Submit a coverage rangeset request and classify the broker's response
/// shape: redirect-to-job, synchronous binary, or JSON naming a job or a
/// direct data link.
pub async fn submit_request(
    client: &Client,
    url: &str,
    token: Option<&str>,
    harmony_base_url: &str,
    retry: &RetryConfig,
) -> AerisResult<SubmitOutcome> {
    let resp = request_with_retry(client, url, token, retry).await?;
    let status = resp.status();

    if matches!(
        status,
        StatusCode::FOUND | StatusCode::SEE_OTHER | StatusCode::TEMPORARY_REDIRECT
    ) {
        let location = resp
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AerisError::UpstreamRejected("redirect missing Location header".into()))?;
        let job_url = if location.starts_with("http") {
            location.to_string()
        } else {
            format!("{}/{}", harmony_base_url.trim_end_matches('/'), location.trim_start_matches('/'))
        };
        info!(job_url = %job_url, "broker submitted an async job via redirect");
        return Ok(SubmitOutcome::AsyncJob(job_url));
    }

    if status == StatusCode::OK {
        let content_type = resp
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if content_type.contains("application/json") {
            let body: Value = resp
                .json()
                .await
                .map_err(|e| AerisError::SchemaAnomaly(format!("broker JSON response malformed: {e}")))?;
            if let Some(job_id) = body.get("jobID").and_then(|v| v.as_str()) {
                let job_url = format!("{}/jobs/{}", harmony_base_url.trim_end_matches('/'), job_id);
                return Ok(SubmitOutcome::AsyncJob(job_url));
            }
            if let Some(href) = data_link_href(&body) {
                return Ok(SubmitOutcome::DataLink(href));
            }
            return Err(AerisError::NoData("broker response named no job and no data link".into()));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AerisError::UpstreamTransient(format!("failed reading broker body: {e}")))?;
        return Ok(SubmitOutcome::SyncBytes(bytes.to_vec()));
    }

    if status == StatusCode::BAD_REQUEST || status == StatusCode::FORBIDDEN {
        let body = resp.text().await.unwrap_or_default();
        return Err(AerisError::UpstreamRejected(format!(
            "broker rejected request ({status}): {}",
            truncate_body_preview(&body, 500)
        )));
    }

    Err(AerisError::UpstreamRejected(format!("unexpected broker status {status}")))
}

/// Truncate an upstream error body to at most `max_bytes` bytes for a log
/// preview, never splitting a multi-byte UTF-8 codepoint.
fn truncate_body_preview(body: &str, max_bytes: usize) -> &str {
    if body.len() <= max_bytes {
        return body;
    }
    let end = body
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    &body[..end]
}

fn data_link_href(body: &Value) -> Option<String> {
    body.get("links")?.as_array()?.iter().find_map(|link| {
        if link.get("rel").and_then(|v| v.as_str()) == Some("data") {
            link.get("href").and_then(|v| v.as_str()).map(str::to_string)
        } else {
            None
        }
    })
}

/// Poll a Harmony job URL until it reaches a terminal state.
pub async fn wait_for_job(
    client: &Client,
    job_url: &str,
    token: Option<&str>,
    retry: &RetryConfig,
) -> AerisResult<Value> {
    let started = tokio::time::Instant::now();
    loop {
        if started.elapsed().as_secs() > retry.max_wait_secs {
            return Err(AerisError::UpstreamTransient(format!(
                "job did not complete within {}s",
                retry.max_wait_secs
            )));
        }
        let resp = request_with_retry(client, job_url, token, retry).await?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AerisError::SchemaAnomaly(format!("job status response malformed: {e}")))?;
        let status = body
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();
        info!(status = %status, "polled broker job status");
        match status.as_str() {
            "successful" | "complete" => return Ok(body),
            "failed" | "canceled" | "error" => {
                return Err(AerisError::UpstreamRejected(format!(
                    "broker job {status}: {}",
                    body.get("message").and_then(|v| v.as_str()).unwrap_or("no message")
                )))
            }
            _ => tokio::time::sleep(Duration::from_secs(retry.poll_interval_secs)).await,
        }
    }
}

pub async fn download_to_temp_file(client: &Client, url: &str, token: Option<&str>) -> AerisResult<PathBuf> {
    let mut req = client.get(url);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    let resp = req
        .send()
        .await
        .map_err(|e| AerisError::UpstreamTransient(format!("download request failed: {e}")))?;
    if !resp.status().is_success() {
        return Err(AerisError::UpstreamRejected(format!(
            "download returned {}",
            resp.status()
        )));
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AerisError::UpstreamTransient(format!("download body read failed: {e}")))?;
    write_temp_tiff(&bytes)
}

pub fn write_temp_tiff(bytes: &[u8]) -> AerisResult<PathBuf> {
    let file = tempfile::Builder::new()
        .suffix(".tif")
        .tempfile()
        .map_err(|e| AerisError::Fatal(format!("cannot create temp file: {e}")))?;
    let (_, path) = file.keep().map_err(|e| AerisError::Fatal(format!("cannot persist temp file: {e}")))?;
    std::fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_link_href_finds_rel_data() {
        let body: Value = serde_json::json!({
            "links": [
                {"rel": "self", "href": "https://x/self"},
                {"rel": "data", "href": "https://x/data.tif"},
            ]
        });
        assert_eq!(data_link_href(&body), Some("https://x/data.tif".to_string()));
    }

    #[test]
    fn data_link_href_none_without_data_rel() {
        let body: Value = serde_json::json!({"links": [{"rel": "self", "href": "https://x"}]});
        assert_eq!(data_link_href(&body), None);
    }

    #[test]
    fn truncate_body_preview_passes_short_body_through() {
        assert_eq!(truncate_body_preview("short body", 500), "short body");
    }

    #[test]
    fn truncate_body_preview_never_splits_a_codepoint() {
        // each '€' is 3 bytes; a 500-byte cutoff lands mid-codepoint at byte 500
        let body: String = std::iter::repeat('€').take(200).collect();
        let preview = truncate_body_preview(&body, 500);
        assert!(preview.len() <= 500);
        assert!(body.starts_with(preview));
    }
}
