//! API keys, regions and endpoints.
//!
//! Configuration is read once at process start and shared read-only behind
//! an `Arc` by every client and node.

use crate::core::error::{ApiError, RequestError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// International API key (also the fallback for mainland China).
pub const API_KEY_VAR: &str = "DASHSCOPE_API_KEY";
/// Mainland China API key.
pub const CHINA_API_KEY_VAR: &str = "DASHSCOPE_API_KEY_CHINA";
/// Overall HTTP timeout in whole seconds.
pub const TIMEOUT_VAR: &str = "DASHSCOPE_TIMEOUT_SECS";

/// Dotenv files tried in order before the default search.
const DOTENV_CANDIDATES: [&str; 2] = ["config/.env", ".env"];

/// API deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    International,
    MainlandChina,
}

impl Region {
    /// Wire/UI name of this region.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::International => "international",
            Region::MainlandChina => "mainland_china",
        }
    }

    /// All regions in display order.
    pub fn all() -> &'static [Region] {
        &[Region::International, Region::MainlandChina]
    }

    /// Region names for UI dropdowns.
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(Region::as_str).collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| RequestError::UnknownRegion(s.to_string()))
    }
}

/// Base URLs for the two services in both regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub generation_international: String,
    pub generation_china: String,
    pub chat_international: String,
    pub chat_china: String,
}

const INTERNATIONAL_HOST: &str = "https://dashscope-intl.aliyuncs.com";
const CHINA_HOST: &str = "https://dashscope.aliyuncs.com";
const GENERATION_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";
const CHAT_PATH: &str = "/compatible-mode/v1/chat/completions";

impl Endpoints {
    /// Build endpoints from one host per region, keeping the service paths.
    pub fn from_hosts(international: &str, china: &str) -> Self {
        let international = international.trim_end_matches('/');
        let china = china.trim_end_matches('/');
        Self {
            generation_international: format!("{}{}", international, GENERATION_PATH),
            generation_china: format!("{}{}", china, GENERATION_PATH),
            chat_international: format!("{}{}", international, CHAT_PATH),
            chat_china: format!("{}{}", china, CHAT_PATH),
        }
    }

    /// Image generation/editing endpoint.
    pub fn generation(&self, region: Region) -> &str {
        match region {
            Region::International => &self.generation_international,
            Region::MainlandChina => &self.generation_china,
        }
    }

    /// OpenAI-compatible chat endpoint used by the vision models.
    pub fn chat(&self, region: Region) -> &str {
        match region {
            Region::International => &self.chat_international,
            Region::MainlandChina => &self.chat_china,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::from_hosts(INTERNATIONAL_HOST, CHINA_HOST)
    }
}

/// Process-wide API configuration.
#[derive(Clone, Default)]
pub struct ApiConfig {
    api_key: Option<String>,
    china_api_key: Option<String>,
    timeout: Option<Duration>,
    endpoints: Endpoints,
}

impl ApiConfig {
    /// Empty configuration with default endpoints and no keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dotenv file if one exists, then read the process environment.
    pub fn load() -> Self {
        load_dotenv();
        Self::from_env()
    }

    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR).as_deref().and_then(clean_key);
        let china_api_key = lookup(CHINA_API_KEY_VAR).as_deref().and_then(clean_key);
        let timeout = lookup(TIMEOUT_VAR).and_then(|raw| parse_timeout(&raw));

        match &api_key {
            Some(key) => log::info!("API key loaded: {}", mask_key(key)),
            None => log::info!("{} not set", API_KEY_VAR),
        }
        if let Some(key) = &china_api_key {
            log::info!("China API key loaded: {}", mask_key(key));
        }

        Self {
            api_key,
            china_api_key,
            timeout,
            endpoints: Endpoints::default(),
        }
    }

    /// Set the international key.
    pub fn with_api_key(mut self, key: impl AsRef<str>) -> Self {
        self.api_key = clean_key(key.as_ref());
        self
    }

    /// Set the mainland China key.
    pub fn with_china_api_key(mut self, key: impl AsRef<str>) -> Self {
        self.china_api_key = clean_key(key.as_ref());
        self
    }

    /// Set the overall HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Key to use for `region`.
    ///
    /// Mainland China prefers its own key and falls back to the
    /// international one.
    pub fn api_key_for(&self, region: Region) -> Result<&str, ApiError> {
        let key = match region {
            Region::MainlandChina => self.china_api_key.as_deref().or(self.api_key.as_deref()),
            Region::International => self.api_key.as_deref(),
        };
        key.ok_or_else(|| {
            ApiError::configuration(format!(
                "{} environment variable not set. Please set it before using this node.",
                API_KEY_VAR
            ))
        })
    }

    /// Whether any key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.china_api_key.is_some()
    }

    /// Configured HTTP timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("china_api_key", &self.china_api_key.as_deref().map(mask_key))
            .field("timeout", &self.timeout)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Trim whitespace and one layer of matching quotes. Empty keys are `None`.
pub fn clean_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|&q| {
            trimmed
                .strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(trimmed)
        .trim();

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

/// First 8 and last 4 characters of a key. Short keys are fully hidden.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn parse_timeout(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            log::warn!("Ignoring {}={:?}: expected a positive number of seconds", TIMEOUT_VAR, raw);
            None
        }
    }
}

fn load_dotenv() {
    for candidate in DOTENV_CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            match dotenv::from_path(path) {
                Ok(()) => {
                    log::info!("Loading environment variables from: {}", path.display());
                    return;
                }
                Err(e) => log::warn!("Failed to read {}: {}", path.display(), e),
            }
        }
    }

    match dotenv::dotenv() {
        Ok(path) => log::info!("Loading environment variables from: {}", path.display()),
        Err(_) => log::info!("No .env file found, using process environment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ApiErrorKind;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_clean_key() {
        assert_eq!(clean_key("  sk-abc  "), Some("sk-abc".to_string()));
        assert_eq!(clean_key("\"sk-abc\""), Some("sk-abc".to_string()));
        assert_eq!(clean_key(" 'sk-abc' \n"), Some("sk-abc".to_string()));
        // Only one matching layer is removed
        assert_eq!(clean_key("\"'sk-abc'\""), Some("'sk-abc'".to_string()));
        // Mismatched quotes are kept
        assert_eq!(clean_key("\"sk-abc'"), Some("\"sk-abc'".to_string()));
        assert_eq!(clean_key("  "), None);
        assert_eq!(clean_key("\"\""), None);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-1234567890abcdef"), "sk-12345...cdef");
        assert_eq!(mask_key("short"), "***");
    }

    #[test]
    fn test_region_falls_back_to_international_key() {
        let config = ApiConfig::from_lookup(lookup(&[(API_KEY_VAR, "intl-key")]));

        assert_eq!(config.api_key_for(Region::International).unwrap(), "intl-key");
        assert_eq!(config.api_key_for(Region::MainlandChina).unwrap(), "intl-key");
    }

    #[test]
    fn test_china_key_preferred_for_china() {
        let config = ApiConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "intl-key"),
            (CHINA_API_KEY_VAR, "'china-key'"),
        ]));

        assert_eq!(config.api_key_for(Region::International).unwrap(), "intl-key");
        assert_eq!(config.api_key_for(Region::MainlandChina).unwrap(), "china-key");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = ApiConfig::from_lookup(lookup(&[(CHINA_API_KEY_VAR, "china-key")]));

        let err = config.api_key_for(Region::International).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Configuration);
        assert!(err.detail.contains(API_KEY_VAR));
        assert!(config.has_api_key());
    }

    #[test]
    fn test_timeout_parsing() {
        let config = ApiConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "45")]));
        assert_eq!(config.timeout(), Some(Duration::from_secs(45)));

        let config = ApiConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "0")]));
        assert_eq!(config.timeout(), None);

        let config = ApiConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")]));
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.generation(Region::International),
            "https://dashscope-intl.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation"
        );
        assert_eq!(
            endpoints.generation(Region::MainlandChina),
            "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation"
        );
        assert_eq!(
            endpoints.chat(Region::International),
            "https://dashscope-intl.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
        assert_eq!(
            endpoints.chat(Region::MainlandChina),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
    }

    #[test]
    fn test_region_parsing() {
        assert_eq!("mainland_china".parse::<Region>().unwrap(), Region::MainlandChina);
        assert_eq!(
            "mars".parse::<Region>().unwrap_err(),
            RequestError::UnknownRegion("mars".to_string())
        );
    }

    #[test]
    fn test_debug_masks_keys() {
        let config = ApiConfig::new().with_api_key("sk-1234567890abcdef");
        let debug = format!("{:?}", config);
        assert!(debug.contains("sk-12345...cdef"));
        assert!(!debug.contains("sk-1234567890abcdef"));
    }
}
