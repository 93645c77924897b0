use std::env;

use serde::{Deserialize, Serialize};

use crate::{
    batch::DEFAULT_BOUNDARY,
    oauth::WALLET_OBJECT_ISSUER_SCOPE,
    save_link::{SaveLinkBuilder, DEFAULT_ORIGINS},
};

pub const DEFAULT_API_BASE_URL: &str = "https://walletobjects.googleapis.com/walletobjects/v1";
pub const DEFAULT_BATCH_URL: &str = "https://walletobjects.googleapis.com/batch";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Endpoints and deployment settings for issuing passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Base URL of the class/object REST resources
    pub api_base_url: String,
    /// Endpoint accepting `multipart/mixed` batch bodies
    pub batch_url: String,
    /// OAuth token endpoint, used when the key file does not name one
    pub token_uri: String,
    /// OAuth scope requested for API calls
    pub scope: String,
    /// Origins allowed to present save links
    pub origins: Vec<String>,
    /// Boundary for batch bodies
    pub boundary: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            batch_url: DEFAULT_BATCH_URL.to_owned(),
            token_uri: DEFAULT_TOKEN_URI.to_owned(),
            scope: WALLET_OBJECT_ISSUER_SCOPE.to_owned(),
            origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
            boundary: DEFAULT_BOUNDARY.to_owned(),
        }
    }
}

impl WalletConfig {
    /// Defaults overridden by `WALLET_API_BASE_URL`, `WALLET_BATCH_URL`,
    /// `WALLET_TOKEN_URI`, `WALLET_ORIGINS` (comma separated) and `WALLET_BATCH_BOUNDARY`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("WALLET_API_BASE_URL") {
            self.api_base_url = v.trim_end_matches('/').to_owned();
        }
        if let Some(v) = lookup("WALLET_BATCH_URL") {
            self.batch_url = v;
        }
        if let Some(v) = lookup("WALLET_TOKEN_URI") {
            self.token_uri = v;
        }
        if let Some(v) = lookup("WALLET_ORIGINS") {
            self.origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Some(v) = lookup("WALLET_BATCH_BOUNDARY") {
            self.boundary = v;
        }

        log::debug!("Wallet config {self:?}");
        self
    }

    pub fn save_link_builder(&self) -> SaveLinkBuilder {
        SaveLinkBuilder::new(self.origins.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_public_endpoints() {
        let config = WalletConfig::default();
        assert_eq!(config.origins, vec!["www.example.com"]);
        assert_eq!(config.boundary, "batch_createobjectbatch");
        assert_eq!(config.batch_url, "https://walletobjects.googleapis.com/batch");
    }

    #[test]
    fn overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("WALLET_API_BASE_URL", "http://localhost:8080/v1/"),
            ("WALLET_ORIGINS", "https://a.test, https://b.test,"),
            ("WALLET_BATCH_BOUNDARY", "  "),
        ]
        .into_iter()
        .collect();

        let config =
            WalletConfig::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://localhost:8080/v1");
        assert_eq!(config.origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.boundary, DEFAULT_BOUNDARY);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: WalletConfig = serde_json::from_str(r#"{"origins":["x.test"]}"#).unwrap();
        assert_eq!(config.origins, vec!["x.test"]);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.save_link_builder().origins(), ["x.test".to_owned()]);
    }
}
