// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client implementation for the Neviweb API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use crate::config::AuthConfig;
use crate::error::ClientError;
use crate::state::DeviceState;

/// Production API endpoint.
const DEFAULT_BASE_URL: &str = "https://neviweb.com";

/// Header carrying the session token on authenticated requests.
const SESSION_HEADER: &str = "Session-Id";

/// Error codes meaning the cached session is no longer valid.
const SESSION_EXPIRED_CODES: [&str; 3] = ["USRSESSEXP", "SESSION_EXPIRED", "SESSIONINVALID"];

/// Error code for the account's session limit being reached.
const TOO_MANY_SESSIONS: &str = "ACCSESSEXC";

/// Attribute carrying the heater output percentage.
const ATTR_OUTPUT_PERCENT: &str = "outputPercentDisplay";

/// An authenticated Neviweb session.
///
/// Held internally by [`NeviwebClient`] and never exposed outside it.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    established_at: DateTime<Utc>,
}

impl Session {
    fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            established_at: Utc::now(),
        }
    }

    /// Returns when this session was established.
    #[must_use]
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

/// A device as listed by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct NeviwebDevice {
    /// Device id.
    pub id: u64,
    /// Friendly name, if set.
    #[serde(default)]
    pub name: Option<String>,
    /// Hardware SKU, if reported.
    #[serde(default)]
    pub sku: Option<String>,
}

/// Client for the Neviweb cloud API.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use neviwatch::client::NeviwebClient;
/// use neviwatch::config::AuthConfig;
///
/// # async fn example() -> Result<(), neviwatch::error::ClientError> {
/// let auth = AuthConfig {
///     username: "user@example.com".to_string(),
///     password: "hunter2".to_string(),
///     location: 1234,
///     device_id: 5678,
/// };
/// let client = NeviwebClient::new(&auth, Duration::from_secs(30))?;
/// client.login().await?;
/// let state = client.heating_state(auth.device_id).await?;
/// println!("heating: {}", state.heating_active);
/// # Ok(())
/// # }
/// ```
pub struct NeviwebClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    location: u64,
    session: Mutex<Option<Session>>,
}

impl NeviwebClient {
    /// Attributes fetched for the one-shot info display.
    pub const INFO_ATTRIBUTES: [&'static str; 7] = [
        "roomTemperature",
        "roomSetpoint",
        "outputPercentDisplay",
        "temperatureFormat",
        "timeFormat",
        "occupancy",
        "heatingMode",
    ];

    /// Creates a client for the production API.
    ///
    /// Every request shares one HTTP client with the given bounded
    /// timeout; a timed-out fetch is a poll failure for that cycle.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(auth: &AuthConfig, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            username: auth.username.clone(),
            password: auth.password.clone(),
            location: auth.location,
            session: Mutex::new(None),
        })
    }

    /// Points the client at a different API endpoint.
    ///
    /// Used against mock servers in tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns `true` if a session is currently cached.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Authenticates and caches the session token.
    ///
    /// If the API reports `ACCSESSEXC` (too many active sessions), a
    /// forced logout is issued and the login is retried exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] on rejected credentials,
    /// [`ClientError::Http`] on transport failures.
    pub async fn login(&self) -> Result<(), ClientError> {
        match self.request_login().await {
            Err(ClientError::Auth { code }) if code == TOO_MANY_SESSIONS => {
                tracing::warn!("too many active sessions, forcing logout and retrying login");
                self.post_logout(None).await;
                self.request_login().await
            }
            other => other,
        }
    }

    async fn request_login(&self) -> Result<(), ClientError> {
        let payload = serde_json::json!({
            "username": self.username,
            "password": self.password,
            "interface": "neviweb",
            "stayConnected": 1,
        });

        let body: Value = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if let Some(token) = body.get("session").and_then(Value::as_str) {
            *self.session.lock() = Some(Session::new(token));
            tracing::info!("logged in to Neviweb");
            Ok(())
        } else if let Some(code) = api_error_code(&body) {
            Err(ClientError::Auth { code })
        } else {
            Err(ClientError::Parse(
                "login response missing session token".to_string(),
            ))
        }
    }

    /// Lists the devices at the configured location.
    ///
    /// # Errors
    ///
    /// Returns error on transport failures, API errors, or an unexpected
    /// response shape.
    pub async fn devices(&self) -> Result<Vec<NeviwebDevice>, ClientError> {
        let token = self.session_token()?;
        let body: Value = self
            .http
            .get(format!("{}/api/devices", self.base_url))
            .header(SESSION_HEADER, token)
            .query(&[("location$id", self.location)])
            .send()
            .await?
            .json()
            .await?;

        if let Some(code) = api_error_code(&body) {
            return Err(session_or_api_error(code));
        }

        serde_json::from_value(body)
            .map_err(|err| ClientError::Parse(format!("device list: {err}")))
    }

    /// Verifies the configured device exists at the configured location.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DeviceNotFound`] if the id is not listed, or
    /// any error from the device listing itself.
    pub async fn ensure_device(&self, device_id: u64) -> Result<NeviwebDevice, ClientError> {
        let devices = self.devices().await?;
        tracing::info!(count = devices.len(), "fetched device list");
        for device in &devices {
            tracing::debug!(
                id = device.id,
                name = device.name.as_deref().unwrap_or("?"),
                sku = device.sku.as_deref().unwrap_or("?"),
                "device"
            );
        }

        devices
            .into_iter()
            .find(|device| device.id == device_id)
            .ok_or(ClientError::DeviceNotFound { device_id })
    }

    /// Fetches named attributes for a device.
    ///
    /// On an expired session, re-authenticates once and retries the single
    /// fetch before surfacing the error.
    ///
    /// # Errors
    ///
    /// Returns error on transport failures, API errors, or if the re-login
    /// retry also fails.
    pub async fn attributes(&self, device_id: u64, attrs: &[&str]) -> Result<Value, ClientError> {
        match self.fetch_attributes(device_id, attrs).await {
            Err(err) if err.is_session_expired() => {
                tracing::info!(error = %err, "session expired, re-authenticating");
                self.login().await?;
                self.fetch_attributes(device_id, attrs).await
            }
            other => other,
        }
    }

    async fn fetch_attributes(
        &self,
        device_id: u64,
        attrs: &[&str],
    ) -> Result<Value, ClientError> {
        let token = self.session_token()?;
        let body: Value = self
            .http
            .get(format!("{}/api/device/{device_id}/attribute", self.base_url))
            .header(SESSION_HEADER, token)
            .query(&[("attributes", attrs.join(","))])
            .send()
            .await?
            .json()
            .await?;

        if let Some(code) = api_error_code(&body) {
            return Err(session_or_api_error(code));
        }
        Ok(body)
    }

    /// Fetches the heater output and derives the current device state.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Parse`] if the output attribute is missing
    /// or has an unexpected shape; such a poll counts toward the failure
    /// streak but does not trigger re-authentication.
    pub async fn heating_state(&self, device_id: u64) -> Result<DeviceState, ClientError> {
        let body = self.attributes(device_id, &[ATTR_OUTPUT_PERCENT]).await?;
        let percent = output_percent(&body)?;
        Ok(DeviceState::now(percent))
    }

    /// Fetches the full informational attribute set for display.
    ///
    /// # Errors
    ///
    /// Returns error on transport or API failures.
    pub async fn device_info(&self, device_id: u64) -> Result<Value, ClientError> {
        self.attributes(device_id, &Self::INFO_ATTRIBUTES).await
    }

    /// Logs out and clears the cached session. Best effort.
    pub async fn logout(&self) {
        let token = self.session.lock().take().map(|session| session.token);
        if let Some(token) = token {
            tracing::info!("logging out of Neviweb");
            self.post_logout(Some(token)).await;
        }
    }

    async fn post_logout(&self, token: Option<String>) {
        let mut request = self.http.post(format!("{}/api/logout", self.base_url));
        if let Some(token) = token {
            request = request.header(SESSION_HEADER, token);
        }
        if let Err(err) = request.send().await {
            tracing::debug!(error = %err, "logout request failed");
        }
    }

    fn session_token(&self) -> Result<String, ClientError> {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(ClientError::NotLoggedIn)
    }
}

/// Extracts an API error code from a response body, if present.
fn api_error_code(body: &Value) -> Option<String> {
    body.get("error")?
        .get("code")?
        .as_str()
        .map(ToString::to_string)
}

fn session_or_api_error(code: String) -> ClientError {
    if SESSION_EXPIRED_CODES.contains(&code.as_str()) {
        ClientError::SessionExpired { code }
    } else {
        ClientError::Api { code }
    }
}

/// Extracts the heater output percentage from an attribute response.
///
/// The API nests it as `{"outputPercentDisplay": {"percent": N}}`, but
/// some firmware revisions report a bare number.
fn output_percent(body: &Value) -> Result<u8, ClientError> {
    let raw = match body.get(ATTR_OUTPUT_PERCENT) {
        Some(Value::Object(map)) => map.get("percent").and_then(Value::as_u64),
        Some(value) => value.as_u64(),
        None => None,
    }
    .ok_or_else(|| {
        ClientError::Parse(format!("missing or malformed {ATTR_OUTPUT_PERCENT} attribute"))
    })?;

    u8::try_from(raw.min(100)).map_err(|_| ClientError::Parse("percent out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_code() {
        let body = serde_json::json!({ "error": { "code": "USRSESSEXP" } });
        assert_eq!(api_error_code(&body).as_deref(), Some("USRSESSEXP"));

        let body = serde_json::json!({ "session": "abc" });
        assert_eq!(api_error_code(&body), None);
    }

    #[test]
    fn classifies_session_codes() {
        assert!(session_or_api_error("USRSESSEXP".to_string()).is_session_expired());
        assert!(session_or_api_error("SESSIONINVALID".to_string()).is_session_expired());
        assert!(!session_or_api_error("MAINTENANCE".to_string()).is_session_expired());
    }

    #[test]
    fn parses_nested_output_percent() {
        let body = serde_json::json!({ "outputPercentDisplay": { "percent": 42 } });
        assert_eq!(output_percent(&body).unwrap(), 42);
    }

    #[test]
    fn parses_bare_output_percent() {
        let body = serde_json::json!({ "outputPercentDisplay": 7 });
        assert_eq!(output_percent(&body).unwrap(), 7);
    }

    #[test]
    fn clamps_out_of_range_percent() {
        let body = serde_json::json!({ "outputPercentDisplay": { "percent": 250 } });
        assert_eq!(output_percent(&body).unwrap(), 100);
    }

    #[test]
    fn missing_attribute_is_a_parse_error() {
        let body = serde_json::json!({ "roomTemperature": 20.5 });
        assert!(matches!(
            output_percent(&body),
            Err(ClientError::Parse(_))
        ));
    }

    #[test]
    fn malformed_attribute_is_a_parse_error() {
        let body = serde_json::json!({ "outputPercentDisplay": { "percent": "high" } });
        assert!(matches!(
            output_percent(&body),
            Err(ClientError::Parse(_))
        ));
    }
}
