//! Bearer token resolution against the Earthdata URS token API.
//!
//! Prefers a configured long-lived token; otherwise exchanges basic
//! credentials, preferring an already-issued token over minting a new one.

use crate::config::BrokerConfig;
use aeris_common::{AerisError, AerisResult};
use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

pub async fn get_bearer_token(client: &Client, config: &BrokerConfig) -> AerisResult<Option<String>> {
    if let Some(token) = &config.bearer_token {
        return Ok(Some(token.clone()));
    }
    let (Some(username), Some(password)) = (&config.earthdata_username, &config.earthdata_password) else {
        warn!("no bearer token and no Earthdata credentials configured");
        return Ok(None);
    };

    let basic = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    let auth_header = format!("Basic {basic}");

    let existing = client
        .get(&config.ursa_tokens_url)
        .header("Authorization", &auth_header)
        .send()
        .await;
    if let Ok(resp) = existing {
        if resp.status().is_success() {
            if let Ok(Value::Array(tokens)) = resp.json::<Value>().await {
                if let Some(token) = tokens
                    .first()
                    .and_then(|t| t.get("access_token"))
                    .and_then(|t| t.as_str())
                {
                    return Ok(Some(token.to_string()));
                }
            }
        }
    }

    let created = client
        .post(&config.ursa_token_url)
        .header("Authorization", &auth_header)
        .send()
        .await
        .map_err(|e| AerisError::AuthFailed(format!("earthdata token request failed: {e}")))?;
    if !created.status().is_success() {
        return Err(AerisError::AuthFailed(format!(
            "earthdata token request returned {}",
            created.status()
        )));
    }
    let body: Value = created
        .json()
        .await
        .map_err(|e| AerisError::AuthFailed(format!("earthdata token response not JSON: {e}")))?;
    Ok(body.get("access_token").and_then(|v| v.as_str()).map(str::to_string))
}
