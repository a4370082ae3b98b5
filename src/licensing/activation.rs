//! License activation and daily revalidation against the license backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::LicenseStatus;
use crate::config::AppConfig;

/// HTTP statuses meaning the key is invalid, unknown or forbidden
pub const AUTH_FAILURE_STATUSES: [u16; 3] = [401, 403, 404];

const MIN_KEY_LENGTH: usize = 10;
const LICENSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport failures talking to the license backend
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("could not reach the license server: {0}")]
    Network(String),
    #[error("failed to start HTTP runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// What this installation reports about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub app_version: String,
    pub device_label: String,
}

impl AppIdentity {
    pub fn from_env() -> Self {
        let app_version = std::env::var("SCREENSTRANSLATE_APP_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let device_label = std::env::var("COMPUTERNAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            app_version,
            device_label,
        }
    }
}

/// Body of an activation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationRequest {
    pub license_key: String,
    pub device_id: String,
    pub app_version: String,
    pub device_label: String,
}

/// Body of a 200 reply
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivationResponse {
    pub success: bool,
    pub plan: Option<String>,
    pub message: Option<String>,
    pub daily_limit: Option<u32>,
    pub max_devices: Option<u32>,
    pub expires_at: Option<String>,
    pub status: Option<String>,
}

/// Raw reply from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityReply {
    pub status: u16,
    pub body: String,
}

/// Remote license validation
pub trait LicenseAuthority {
    fn submit(&self, request: &ActivationRequest) -> Result<AuthorityReply, LicenseError>;
}

/// License backend reached over HTTP
pub struct HttpLicenseAuthority {
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
    runtime: Runtime,
}

impl HttpLicenseAuthority {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, LicenseError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let http = reqwest::Client::builder()
            .timeout(LICENSE_TIMEOUT)
            .build()
            .map_err(|e| LicenseError::Network(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
            runtime,
        })
    }

    /// Backend from `SCREENSTRANSLATE_LICENSE_API_URL`, or `None` when unset
    pub fn from_env() -> Result<Option<Self>, LicenseError> {
        let endpoint = match std::env::var("SCREENSTRANSLATE_LICENSE_API_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };
        let api_key = std::env::var("SCREENSTRANSLATE_LICENSE_API_KEY").ok();
        info!("License backend: {}", endpoint);
        Self::new(endpoint, api_key).map(Some)
    }
}

impl LicenseAuthority for HttpLicenseAuthority {
    fn submit(&self, request: &ActivationRequest) -> Result<AuthorityReply, LicenseError> {
        self.runtime.block_on(async {
            let mut builder = self.http.post(&self.endpoint).json(request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| LicenseError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Ok::<_, LicenseError>(AuthorityReply { status, body })
        })
    }
}

/// How an activation attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Key accepted, state is now active
    Activated,
    /// Backend refused the credentials; key and Pro fields cleared
    Revoked,
    /// Key not accepted; state unchanged
    Rejected,
    /// Backend could not be contacted; state unchanged
    Unreachable,
}

#[derive(Debug, Clone)]
pub struct ActivationResult {
    pub outcome: ActivationOutcome,
    pub config: AppConfig,
    pub message: String,
}

impl ActivationResult {
    pub fn success(&self) -> bool {
        self.outcome == ActivationOutcome::Activated
    }

    fn unchanged(config: &AppConfig, outcome: ActivationOutcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            config: config.clone(),
            message: message.into(),
        }
    }
}

/// Typo protection only: enough characters and a plausible alphabet
fn looks_like_license_key(key: &str) -> bool {
    if key.chars().count() < MIN_KEY_LENGTH {
        return false;
    }
    key.contains('-') || key.chars().all(char::is_alphanumeric)
}

/// Activate `key`.
///
/// With no `authority` the key is accepted on shape alone. Otherwise the key
/// and this device's identifier are submitted and the reply decides.
pub fn activate_license(
    config: &AppConfig,
    key: &str,
    authority: Option<&dyn LicenseAuthority>,
    identity: &AppIdentity,
    today: NaiveDate,
) -> ActivationResult {
    let key = key.trim();
    if key.is_empty() {
        return ActivationResult::unchanged(config, ActivationOutcome::Rejected, "Enter a license key.");
    }

    let Some(authority) = authority else {
        if !looks_like_license_key(key) {
            return ActivationResult::unchanged(
                config,
                ActivationOutcome::Rejected,
                "The license key format is not valid.",
            );
        }
        let mut next = config.clone();
        next.license.license_key = key.to_string();
        next.license.status = LicenseStatus::Active;
        info!("License {} activated offline", next.license.masked_key());
        return ActivationResult {
            outcome: ActivationOutcome::Activated,
            config: next,
            message: "Pro license activated on this device.".to_string(),
        };
    };

    let mut next = config.clone();
    let request = ActivationRequest {
        license_key: key.to_string(),
        device_id: next.license.ensure_device_id(),
        app_version: identity.app_version.clone(),
        device_label: identity.device_label.clone(),
    };

    let reply = match authority.submit(&request) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("License activation failed: {}", e);
            return ActivationResult::unchanged(config, ActivationOutcome::Unreachable, e.to_string());
        }
    };
    debug!("License backend replied {}", reply.status);

    let response: Option<ActivationResponse> = serde_json::from_str(&reply.body).ok();
    let backend_message = response.as_ref().and_then(|r| r.message.clone());

    if AUTH_FAILURE_STATUSES.contains(&reply.status) {
        info!("License {} revoked by backend", next.license.masked_key());
        next.license.revoke();
        next.license.last_check = Some(today);
        return ActivationResult {
            outcome: ActivationOutcome::Revoked,
            config: next,
            message: backend_message.unwrap_or_else(|| "The license key is not valid.".to_string()),
        };
    }

    if reply.status != 200 {
        let message = if reply.body.trim().is_empty() {
            "Remote error while activating the license.".to_string()
        } else {
            reply.body.chars().take(200).collect()
        };
        return ActivationResult::unchanged(config, ActivationOutcome::Rejected, message);
    }

    let Some(response) = response else {
        return ActivationResult::unchanged(config, ActivationOutcome::Rejected, "Invalid license response.");
    };

    if !response.success {
        return ActivationResult::unchanged(
            config,
            ActivationOutcome::Rejected,
            backend_message.unwrap_or_else(|| "License not valid.".to_string()),
        );
    }

    let plan = response
        .plan
        .map(|p| p.to_lowercase())
        .unwrap_or_else(|| "pro".to_string());

    next.license.license_key = key.to_string();
    next.license.status = LicenseStatus::Active;
    next.license.plan = Some(plan);
    next.license.remote_daily_limit = response.daily_limit;
    next.license.max_devices = response.max_devices;
    next.license.expires_at = response.expires_at;
    next.license.last_check = Some(today);
    info!(
        "License {} active (plan {})",
        next.license.masked_key(),
        next.license.plan.as_deref().unwrap_or("pro")
    );

    ActivationResult {
        outcome: ActivationOutcome::Activated,
        config: next,
        message: backend_message.unwrap_or_else(|| "Pro license activated on this device.".to_string()),
    }
}

/// Revalidate the stored key at most once per calendar day.
///
/// Network trouble fails open: the previous state is kept and the check is
/// retried on the next start.
pub fn maybe_refresh_license(
    config: &AppConfig,
    authority: Option<&dyn LicenseAuthority>,
    identity: &AppIdentity,
    today: NaiveDate,
) -> AppConfig {
    let Some(authority) = authority else {
        return config.clone();
    };
    let license = &config.license;
    if !license.has_key() || license.status == LicenseStatus::Revoked {
        return config.clone();
    }
    if license.last_check == Some(today) {
        debug!("License already checked today");
        return config.clone();
    }

    let key = license.license_key.clone();
    let result = activate_license(config, &key, Some(authority), identity, today);
    match result.outcome {
        ActivationOutcome::Activated | ActivationOutcome::Revoked => result.config,
        ActivationOutcome::Rejected => {
            warn!("License revalidation rejected: {}", result.message);
            let mut next = config.clone();
            next.license.last_check = Some(today);
            next
        }
        ActivationOutcome::Unreachable => config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeAuthority {
        reply: Result<AuthorityReply, String>,
        requests: RefCell<Vec<ActivationRequest>>,
    }

    impl FakeAuthority {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(AuthorityReply {
                    status,
                    body: body.to_string(),
                }),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn offline() -> Self {
            Self {
                reply: Err("connection refused".to_string()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl LicenseAuthority for FakeAuthority {
        fn submit(&self, request: &ActivationRequest) -> Result<AuthorityReply, LicenseError> {
            self.requests.borrow_mut().push(request.clone());
            self.reply.clone().map_err(LicenseError::Network)
        }
    }

    fn identity() -> AppIdentity {
        AppIdentity {
            app_version: "1.2.3".to_string(),
            device_label: "test-host".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn active_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.license.license_key = "ABCD-EFGH-1234".to_string();
        config.license.status = LicenseStatus::Active;
        config.license.plan = Some("pro".to_string());
        config.license.device_id = Some("device-42".to_string());
        config
    }

    #[test]
    fn test_offline_rejects_short_key() {
        let config = AppConfig::default();
        let result = activate_license(&config, "ABC-123", None, &identity(), today());

        assert_eq!(result.outcome, ActivationOutcome::Rejected);
        assert!(result.config.license.license_key.is_empty());
    }

    #[test]
    fn test_offline_key_shapes() {
        assert!(looks_like_license_key("ABCDE12345"));
        assert!(looks_like_license_key("STP-ab_cd-12"));
        assert!(!looks_like_license_key("abc def ghij"));
        assert!(!looks_like_license_key("short-1"));
    }

    #[test]
    fn test_offline_accepts_plausible_key() {
        let config = AppConfig::default();
        let result = activate_license(&config, "  ABCD-EFGH-1234 ", None, &identity(), today());

        assert!(result.success());
        assert_eq!(result.config.license.license_key, "ABCD-EFGH-1234");
        assert!(result.config.license.is_pro());
    }

    #[test]
    fn test_empty_key_leaves_state() {
        let config = active_config();
        let authority = FakeAuthority::replying(200, "{}");
        let result = activate_license(&config, "   ", Some(&authority), &identity(), today());

        assert_eq!(result.outcome, ActivationOutcome::Rejected);
        assert_eq!(result.config, config);
        assert_eq!(authority.calls(), 0);
    }

    #[test]
    fn test_remote_activation_records_grant() {
        let config = AppConfig::default();
        let authority = FakeAuthority::replying(
            200,
            r#"{"success": true, "plan": "PRO", "message": "Welcome", "max_devices": 3, "expires_at": "2025-01-01"}"#,
        );

        let result = activate_license(&config, "ABCD-EFGH-1234", Some(&authority), &identity(), today());

        assert!(result.success());
        assert_eq!(result.message, "Welcome");
        let license = &result.config.license;
        assert_eq!(license.status, LicenseStatus::Active);
        assert_eq!(license.plan.as_deref(), Some("pro"));
        assert_eq!(license.max_devices, Some(3));
        assert_eq!(license.expires_at.as_deref(), Some("2025-01-01"));
        assert_eq!(license.last_check, Some(today()));

        let sent = authority.requests.borrow();
        assert_eq!(sent[0].license_key, "ABCD-EFGH-1234");
        assert_eq!(sent[0].app_version, "1.2.3");
        assert_eq!(sent[0].device_label, "test-host");
        assert_eq!(Some(sent[0].device_id.clone()), license.device_id);
    }

    #[test]
    fn test_auth_failure_revokes_and_clears_key() {
        for status in AUTH_FAILURE_STATUSES {
            let config = active_config();
            let authority = FakeAuthority::replying(status, r#"{"message": "unknown key"}"#);

            let result = activate_license(&config, "ABCD-EFGH-1234", Some(&authority), &identity(), today());

            assert_eq!(result.outcome, ActivationOutcome::Revoked);
            assert_eq!(result.message, "unknown key");
            assert_eq!(result.config.license.status, LicenseStatus::Revoked);
            assert!(result.config.license.license_key.is_empty());
            assert!(result.config.license.plan.is_none());
            assert_eq!(result.config.license.device_id.as_deref(), Some("device-42"));
        }
    }

    #[test]
    fn test_unsuccessful_reply_is_not_revocation() {
        let config = active_config();
        let authority = FakeAuthority::replying(200, r#"{"success": false, "message": "Too many devices"}"#);

        let result = activate_license(&config, "ABCD-EFGH-1234", Some(&authority), &identity(), today());

        assert_eq!(result.outcome, ActivationOutcome::Rejected);
        assert_eq!(result.message, "Too many devices");
        assert_eq!(result.config, config);
    }

    #[test]
    fn test_server_error_leaves_state() {
        let config = active_config();
        let authority = FakeAuthority::replying(500, "");

        let result = activate_license(&config, "ABCD-EFGH-1234", Some(&authority), &identity(), today());

        assert_eq!(result.outcome, ActivationOutcome::Rejected);
        assert_eq!(result.config, config);
    }

    #[test]
    fn test_network_error_leaves_state() {
        let config = active_config();
        let authority = FakeAuthority::offline();

        let result = activate_license(&config, "ABCD-EFGH-1234", Some(&authority), &identity(), today());

        assert_eq!(result.outcome, ActivationOutcome::Unreachable);
        assert!(result.message.contains("connection refused"));
        assert_eq!(result.config, config);
    }

    #[test]
    fn test_refresh_once_per_day() {
        let authority = FakeAuthority::replying(200, r#"{"success": true, "plan": "pro"}"#);
        let config = active_config();

        let refreshed = maybe_refresh_license(&config, Some(&authority), &identity(), today());
        assert_eq!(refreshed.license.last_check, Some(today()));

        let again = maybe_refresh_license(&refreshed, Some(&authority), &identity(), today());
        assert_eq!(again, refreshed);
        assert_eq!(authority.calls(), 1);
    }

    #[test]
    fn test_refresh_fails_open() {
        let authority = FakeAuthority::offline();
        let config = active_config();

        let refreshed = maybe_refresh_license(&config, Some(&authority), &identity(), today());
        assert_eq!(refreshed, config);
        assert!(refreshed.license.is_pro());
    }

    #[test]
    fn test_refresh_applies_revocation() {
        let authority = FakeAuthority::replying(403, "");
        let refreshed = maybe_refresh_license(&active_config(), Some(&authority), &identity(), today());

        assert_eq!(refreshed.license.status, LicenseStatus::Revoked);
        assert!(!refreshed.license.is_pro());
    }

    #[test]
    fn test_refresh_skips_without_key_or_backend() {
        let authority = FakeAuthority::replying(200, "{}");
        let config = AppConfig::default();
        assert_eq!(maybe_refresh_license(&config, Some(&authority), &identity(), today()), config);
        assert_eq!(authority.calls(), 0);

        let active = active_config();
        assert_eq!(maybe_refresh_license(&active, None, &identity(), today()), active);
    }
}
