//! Translation Client
//!
//! Sends a batch of lines to the configured backend and returns the
//! translations in the same order. The provider is picked once, when the
//! client is built: DeepL, then a generic JSON backend, then a demo mode that
//! only tags each line with the target language.

pub mod providers;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use providers::demo_translate;

const DEEPL_FREE_URL: &str = "https://api-free.deepl.com/v2/translate";
const DEEPL_PRO_URL: &str = "https://api.deepl.com/v2/translate";

/// DeepL request timeout
pub const DEEPL_TIMEOUT: Duration = Duration::from_secs(15);
/// Generic backend request timeout
pub const GENERIC_TIMEOUT: Duration = Duration::from_secs(10);

/// Translation failures; the whole batch is discarded
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Network(String),
    #[error("translation backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected translation response: {0}")]
    InvalidResponse(String),
    #[error("backend returned {got} translations for {expected} inputs")]
    LengthMismatch { expected: usize, got: usize },
    #[error("failed to start HTTP runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Provider settings persisted in the user configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// DeepL authentication key
    pub deepl_auth_key: Option<String>,
    /// Explicit DeepL endpoint (overrides the free/pro choice)
    pub deepl_api_url: Option<String>,
    /// Use the free DeepL endpoint when no explicit URL is set
    pub deepl_free: Option<bool>,
    /// Generic backend bearer token
    pub api_key: Option<String>,
    /// Generic backend endpoint
    pub api_url: Option<String>,
}

impl TranslationSettings {
    /// Apply `DEEPL_*` and `TRANSLATION_API_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(key) = env("DEEPL_AUTH_KEY") {
            self.deepl_auth_key = Some(key);
        }
        if let Some(url) = env("DEEPL_API_URL") {
            self.deepl_api_url = Some(url);
        }
        if let Some(free) = env("DEEPL_API_FREE") {
            self.deepl_free = Some(free == "1");
        }
        if let Some(key) = env("TRANSLATION_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = env("TRANSLATION_API_URL") {
            self.api_url = Some(url);
        }
        self
    }
}

/// Translation backend, chosen once at client construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationProvider {
    /// DeepL form API
    DeepL { auth_key: String, endpoint: String },
    /// Generic JSON backend with bearer auth
    Generic { api_key: String, endpoint: String },
    /// No backend: tag each line with the target language
    Demo,
}

impl TranslationProvider {
    /// Pick a provider by precedence: DeepL, generic, demo
    pub fn resolve(settings: &TranslationSettings) -> Self {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(auth_key) = present(&settings.deepl_auth_key) {
            let endpoint = present(&settings.deepl_api_url).unwrap_or_else(|| {
                if settings.deepl_free.unwrap_or(true) {
                    DEEPL_FREE_URL.to_string()
                } else {
                    DEEPL_PRO_URL.to_string()
                }
            });
            return TranslationProvider::DeepL { auth_key, endpoint };
        }

        if let (Some(api_key), Some(endpoint)) =
            (present(&settings.api_key), present(&settings.api_url))
        {
            return TranslationProvider::Generic { api_key, endpoint };
        }

        TranslationProvider::Demo
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranslationProvider::DeepL { .. } => "deepl",
            TranslationProvider::Generic { .. } => "generic",
            TranslationProvider::Demo => "demo",
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            TranslationProvider::DeepL { endpoint, .. }
            | TranslationProvider::Generic { endpoint, .. } => Some(endpoint),
            TranslationProvider::Demo => None,
        }
    }
}

/// Blocking translation client
pub struct TranslationClient {
    provider: TranslationProvider,
    http: reqwest::Client,
    runtime: Runtime,
}

impl TranslationClient {
    /// Create a client for the given provider
    pub fn new(provider: TranslationProvider) -> Result<Self, TranslationError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        info!(
            "Translation client ready: provider={}, url={}",
            provider.name(),
            provider.endpoint().unwrap_or("-")
        );

        Ok(Self {
            provider,
            http,
            runtime,
        })
    }

    /// Create a client from persisted settings plus environment overrides
    pub fn from_settings(settings: &TranslationSettings) -> Result<Self, TranslationError> {
        Self::new(TranslationProvider::resolve(
            &settings.clone().with_env_overrides(),
        ))
    }

    pub fn provider(&self) -> &TranslationProvider {
        &self.provider
    }

    /// Translate `texts` from `source` to `target`.
    ///
    /// The result has exactly one entry per input, in input order, or the
    /// call fails as a whole.
    pub fn translate_texts(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Result<Vec<String>, TranslationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Translating {} lines via {} ({} -> {})",
            texts.len(),
            self.provider.name(),
            source,
            target
        );

        match &self.provider {
            TranslationProvider::Demo => Ok(demo_translate(texts, target)),
            TranslationProvider::DeepL { auth_key, endpoint } => {
                let form = providers::deepl_form(auth_key, texts, source, target);
                let body = self.runtime.block_on(providers::post(
                    self.http.post(endpoint).form(&form).timeout(DEEPL_TIMEOUT),
                ))?;
                providers::parse_deepl_response(&body, texts.len())
            }
            TranslationProvider::Generic { api_key, endpoint } => {
                let payload = providers::GenericRequest::new(texts, source, target);
                let body = self.runtime.block_on(providers::post(
                    self.http
                        .post(endpoint)
                        .bearer_auth(api_key)
                        .json(&payload)
                        .timeout(GENERIC_TIMEOUT),
                ))?;
                providers::parse_generic_response(&body, texts.len())
            }
        }
    }
}
