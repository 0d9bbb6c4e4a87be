use anyhow::Result;
use discue_client::{Client, DEFAULT_TIMEOUT};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::ProviderError;

pub const API_KEY_ENV: &str = "DISCUE_API_KEY";
pub const API_ENDPOINT_ENV: &str = "DISCUE_API_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";

/// `provider:` block of a stack file. Values set here win over the environment.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn client(&self) -> Result<Client> {
        self.client_with_env(|k| std::env::var(k).ok())
    }

    pub fn client_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<Client> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let api_key = match &self.api_key {
            Some(k) if !k.expose_secret().is_empty() => Some(SecretString::new(k.expose_secret().clone())),
            _ => non_empty(env(API_KEY_ENV)).map(SecretString::new),
        };
        let endpoint = non_empty(self.api_endpoint.clone())
            .or_else(|| non_empty(env(API_ENDPOINT_ENV)))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let api_key = api_key.ok_or_else(|| ProviderError::MissingAttribute {
            attribute: "provider.api_key",
            detail: format!("set it in the provider block or via {API_KEY_ENV}"),
        })?;

        let timeout = self.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);
        let client = Client::new(&endpoint, api_key, timeout)?;
        info!(endpoint = client.endpoint(), "configured discue client");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |k| vars.iter().find(|(n, _)| *n == k).map(|(_, v)| v.to_string())
    }

    #[test]
    fn falls_back_to_environment_then_default() {
        let cfg = ProviderConfig::default();
        let client = cfg.client_with_env(env(&[(API_KEY_ENV, "from-env")])).unwrap();
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);

        let client = cfg
            .client_with_env(env(&[(API_KEY_ENV, "from-env"), (API_ENDPOINT_ENV, "https://api.discue.io/v1")]))
            .unwrap();
        assert_eq!(client.endpoint(), "https://api.discue.io/v1");
    }

    #[test]
    fn stack_values_win_over_environment() {
        let cfg: ProviderConfig = serde_yaml::from_str("api_key: from-stack\napi_endpoint: https://stack.discue.io\n").unwrap();
        let client = cfg.client_with_env(env(&[(API_ENDPOINT_ENV, "https://env.discue.io")])).unwrap();
        assert_eq!(client.endpoint(), "https://stack.discue.io");
    }

    #[test]
    fn missing_key_names_the_attribute() {
        let err = ProviderConfig::default().client_with_env(env(&[(API_KEY_ENV, "")])).unwrap_err().to_string();
        assert!(err.contains("provider.api_key"));
        assert!(err.contains(API_KEY_ENV));
    }
}
