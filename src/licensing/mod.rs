//! Licensing and Usage Gate
//!
//! Decides whether a translation attempt may run. Pro accounts are unlimited;
//! everyone else gets a daily quota that resets when the calendar day changes.
//! All operations take the current `AppConfig` and return an updated copy for
//! the caller to persist.

pub mod activation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AppConfig;

pub use activation::{
    activate_license, maybe_refresh_license, ActivationOutcome, AppIdentity, HttpLicenseAuthority,
    LicenseAuthority,
};

/// Free-tier translations per day
pub const BASIC_DAILY_LIMIT: u32 = 5;

const QUOTA_EXHAUSTED_MESSAGE: &str = "You have reached the daily translation limit of the Basic \
     version. Upgrade to Pro for unlimited use.";

/// Validation status of the stored key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    #[default]
    Unset,
    Active,
    Revoked,
}

/// Persisted license state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseState {
    pub license_key: String,
    pub status: LicenseStatus,
    pub plan: Option<String>,
    /// Daily cap granted by the backend for non-pro plans
    pub remote_daily_limit: Option<u32>,
    pub max_devices: Option<u32>,
    pub expires_at: Option<String>,
    /// Stable per-installation identifier sent with activations
    pub device_id: Option<String>,
    /// Day of the last successful contact with the license backend
    pub last_check: Option<NaiveDate>,
}

impl LicenseState {
    pub fn has_key(&self) -> bool {
        !self.license_key.trim().is_empty()
    }

    /// Unlimited tier: a key that is not revoked and whose plan is `pro` or
    /// not yet known.
    pub fn is_pro(&self) -> bool {
        let status_ok = matches!(self.status, LicenseStatus::Active | LicenseStatus::Unset);
        let plan_ok = self
            .plan
            .as_deref()
            .map_or(true, |p| p.eq_ignore_ascii_case("pro"));
        self.has_key() && status_ok && plan_ok
    }

    /// Key safe for logs: first four characters only
    pub fn masked_key(&self) -> String {
        let prefix: String = self.license_key.chars().take(4).collect();
        format!("{}****", prefix)
    }

    /// Drop the key and everything the backend granted with it.
    /// The device id survives.
    pub fn revoke(&mut self) {
        self.license_key.clear();
        self.status = LicenseStatus::Revoked;
        self.plan = None;
        self.remote_daily_limit = None;
        self.max_devices = None;
        self.expires_at = None;
    }

    /// Return the device id, generating and storing one if missing
    pub fn ensure_device_id(&mut self) -> String {
        match self.device_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = uuid::Uuid::new_v4().to_string();
                self.device_id = Some(id.clone());
                id
            }
        }
    }
}

/// Daily usage counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageState {
    pub last_use_date: Option<NaiveDate>,
    pub uses_today: u32,
}

/// Quota rules in effect for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsagePolicy {
    pub daily_limit: u32,
    /// Disable all gating
    pub development_mode: bool,
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            daily_limit: BASIC_DAILY_LIMIT,
            development_mode: false,
        }
    }
}

impl UsagePolicy {
    /// Default policy with `SCREENSTRANSLATE_DEV_MODE=1` honoured
    pub fn from_env() -> Self {
        let development_mode = std::env::var("SCREENSTRANSLATE_DEV_MODE")
            .map(|v| v == "1")
            .unwrap_or(false);
        if development_mode {
            info!("Development mode: usage limits disabled");
        }
        Self {
            development_mode,
            ..Self::default()
        }
    }

    /// Cap for a non-pro license
    pub fn limit_for(&self, license: &LicenseState) -> u32 {
        license.remote_daily_limit.unwrap_or(self.daily_limit)
    }
}

/// Outcome of a quota check
#[derive(Debug, Clone)]
pub struct UsageCheck {
    pub allowed: bool,
    /// Config with the usage counter updated
    pub config: AppConfig,
    /// User-facing reason when denied
    pub message: Option<String>,
}

/// Check the quota and, if allowed, count one use.
///
/// A stored date different from `today` resets the counter first. A denied
/// attempt still persists the rollover but does not increment.
pub fn check_and_register_use(
    config: &AppConfig,
    policy: &UsagePolicy,
    today: NaiveDate,
) -> UsageCheck {
    if policy.development_mode || config.license.is_pro() {
        return UsageCheck {
            allowed: true,
            config: config.clone(),
            message: None,
        };
    }

    let mut next = config.clone();
    if next.usage.last_use_date != Some(today) {
        next.usage.last_use_date = Some(today);
        next.usage.uses_today = 0;
    }

    let limit = policy.limit_for(&config.license);
    if next.usage.uses_today >= limit {
        info!("Daily quota exhausted ({}/{})", next.usage.uses_today, limit);
        return UsageCheck {
            allowed: false,
            config: next,
            message: Some(QUOTA_EXHAUSTED_MESSAGE.to_string()),
        };
    }

    next.usage.uses_today += 1;
    debug!("Usage registered: {}/{}", next.usage.uses_today, limit);
    UsageCheck {
        allowed: true,
        config: next,
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn pro_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.license.license_key = "PRO-KEY-123456".to_string();
        config.license.status = LicenseStatus::Active;
        config.license.plan = Some("pro".to_string());
        config
    }

    #[test]
    fn test_basic_quota_allows_five_then_denies() {
        let policy = UsagePolicy::default();
        let mut config = AppConfig::default();

        for i in 1..=BASIC_DAILY_LIMIT {
            let check = check_and_register_use(&config, &policy, day(1));
            assert!(check.allowed, "use {} should be allowed", i);
            assert!(check.message.is_none());
            config = check.config;
            assert_eq!(config.usage.uses_today, i);
        }

        let denied = check_and_register_use(&config, &policy, day(1));
        assert!(!denied.allowed);
        assert!(denied.message.unwrap().contains("daily translation limit"));
        assert_eq!(denied.config.usage.uses_today, BASIC_DAILY_LIMIT);
    }

    #[test]
    fn test_new_day_resets_counter() {
        let policy = UsagePolicy::default();
        let mut config = AppConfig::default();
        config.usage.last_use_date = Some(day(1));
        config.usage.uses_today = 42;

        let check = check_and_register_use(&config, &policy, day(2));
        assert!(check.allowed);
        assert_eq!(check.config.usage.last_use_date, Some(day(2)));
        assert_eq!(check.config.usage.uses_today, 1);
    }

    #[test]
    fn test_check_does_not_mutate_input() {
        let config = AppConfig::default();
        let _ = check_and_register_use(&config, &UsagePolicy::default(), day(1));
        assert_eq!(config.usage.uses_today, 0);
    }

    #[test]
    fn test_pro_bypasses_quota() {
        let mut config = pro_config();
        config.usage.last_use_date = Some(day(1));
        config.usage.uses_today = 100;

        let check = check_and_register_use(&config, &UsagePolicy::default(), day(1));
        assert!(check.allowed);
        assert_eq!(check.config.usage.uses_today, 100);
    }

    #[test]
    fn test_development_mode_bypasses_quota() {
        let policy = UsagePolicy {
            development_mode: true,
            ..UsagePolicy::default()
        };
        let mut config = AppConfig::default();
        config.usage.last_use_date = Some(day(1));
        config.usage.uses_today = BASIC_DAILY_LIMIT;

        assert!(check_and_register_use(&config, &policy, day(1)).allowed);
    }

    #[test]
    fn test_remote_limit_replaces_basic_cap() {
        let mut config = AppConfig::default();
        config.license.license_key = "TEAM-KEY-123456".to_string();
        config.license.status = LicenseStatus::Active;
        config.license.plan = Some("basic".to_string());
        config.license.remote_daily_limit = Some(7);
        config.usage.last_use_date = Some(day(1));
        config.usage.uses_today = 6;

        let policy = UsagePolicy::default();
        let check = check_and_register_use(&config, &policy, day(1));
        assert!(check.allowed);
        assert!(!check_and_register_use(&check.config, &policy, day(1)).allowed);
    }

    #[test]
    fn test_is_pro_rules() {
        assert!(pro_config().license.is_pro());

        let mut unknown_plan = pro_config();
        unknown_plan.license.plan = None;
        unknown_plan.license.status = LicenseStatus::Unset;
        assert!(unknown_plan.license.is_pro());

        let mut revoked = pro_config();
        revoked.license.status = LicenseStatus::Revoked;
        assert!(!revoked.license.is_pro());

        let mut basic = pro_config();
        basic.license.plan = Some("basic".to_string());
        assert!(!basic.license.is_pro());

        assert!(!AppConfig::default().license.is_pro());
    }

    #[test]
    fn test_revoke_keeps_device_id() {
        let mut license = pro_config().license;
        license.device_id = Some("device-1".to_string());
        license.remote_daily_limit = Some(10);

        license.revoke();

        assert!(license.license_key.is_empty());
        assert_eq!(license.status, LicenseStatus::Revoked);
        assert!(license.plan.is_none());
        assert!(license.remote_daily_limit.is_none());
        assert_eq!(license.device_id.as_deref(), Some("device-1"));
    }

    #[test]
    fn test_ensure_device_id_is_stable() {
        let mut license = LicenseState::default();
        let first = license.ensure_device_id();
        assert_eq!(first.len(), 36);
        assert_eq!(license.ensure_device_id(), first);
    }

    #[test]
    fn test_masked_key() {
        let license = pro_config().license;
        assert_eq!(license.masked_key(), "PRO-****");
    }
}
