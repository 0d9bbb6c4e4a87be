//! `discue_api_key` resources.
//!
//! Scopes are configured as a list and sent as the fixed per-resource record
//! built by [`discue_scopes::encode`]. When a key is created without scopes
//! the API grants its own defaults, and whatever it reports back is kept in
//! state.

use anyhow::{Context, Result};
use discue_client::{ApiKeyRequest, ApiKeyResponse, Client};
use discue_scopes::{decode, encode, Access, ResourceName, ScopeEntry, WILDCARD};
use discue_validate::{is_resource_alias, is_scope_target, Diagnostics, API_KEY_STATUSES};
use serde::{Serialize, Deserialize};
use std::fmt;
use tracing::{debug, info};

use crate::{not_found_as_none, Diff};

pub const TYPE_NAME: &str = "discue_api_key";

fn default_status() -> String { "enabled".to_string() }
fn default_targets() -> Vec<String> { vec![WILDCARD.to_string()] }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub resource: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
}

impl From<&ScopeConfig> for ScopeEntry {
    fn from(s: &ScopeConfig) -> Self { ScopeEntry::new(s.resource.clone(), s.access, s.targets.clone()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub name: String,
    pub alias: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub scopes: Option<Vec<ScopeConfig>>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyState {
    pub id: String,
    pub alias: String,
    pub status: String,
    /// Only returned in full when the key is created.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub scopes: Vec<ScopeEntry>,
}

impl fmt::Debug for ApiKeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyState")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("status", &self.status)
            .field("key", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ApiKeyState {
    fn from_response(res: ApiKeyResponse, known_key: &str) -> Self {
        let key = if res.key.is_empty() { known_key.to_string() } else { res.key };
        let scopes = res.scopes.as_ref().map(decode).unwrap_or_default();
        Self { id: res.id, alias: res.alias, status: res.status, key, scopes }
    }
}

impl ApiKeyConfig {
    pub fn validate(&self, diags: &mut Diagnostics) {
        diags.require(is_resource_alias(&self.alias), "alias", &self.alias, "must match the pattern for name/alias values");
        diags.require(API_KEY_STATUSES.contains(&self.status.as_str()), "status", &self.status, "must be one of enabled, disabled");

        let Some(scopes) = &self.scopes else { return };
        diags.require(!scopes.is_empty(), "scopes", "[]", "must contain at least one scope when set");
        for (i, scope) in scopes.iter().enumerate() {
            diags.require(
                scope.resource.parse::<ResourceName>().is_ok(),
                format!("scopes.{i}.resource"),
                &scope.resource,
                "must name a known resource type",
            );
            diags.require(!scope.targets.is_empty(), format!("scopes.{i}.targets"), "[]", "must contain at least one target");
            for (j, target) in scope.targets.iter().enumerate() {
                diags.require(is_scope_target(target), format!("scopes.{i}.targets.{j}"), target, "must be * or a resource id");
            }
        }
    }

    pub fn entries(&self) -> Option<Vec<ScopeEntry>> {
        self.scopes.as_ref().map(|s| s.iter().map(ScopeEntry::from).collect())
    }

    /// Fails without side effects when a scope names an unknown resource type.
    pub fn to_request(&self) -> Result<ApiKeyRequest> {
        let scopes = match self.entries() {
            Some(entries) => Some(encode(&entries).with_context(|| format!("invalid scopes for api key {}", self.name))?),
            None => None,
        };
        Ok(ApiKeyRequest { alias: self.alias.clone(), status: Some(self.status.clone()), scopes })
    }

    pub(crate) fn diff(&self, cur: &ApiKeyState) -> Diff {
        let scopes_differ = match self.entries() {
            // encode/decode puts the configured scopes in canonical order
            Some(entries) => encode(&entries).map(|r| decode(&r) != cur.scopes).unwrap_or(true),
            None => false,
        };
        if self.alias != cur.alias || self.status != cur.status || scopes_differ {
            Diff::Update
        } else {
            Diff::Same
        }
    }
}

pub async fn create(client: &Client, cfg: &ApiKeyConfig) -> Result<ApiKeyState> {
    let req = cfg.to_request()?;
    let created = client.create_api_key(&req).await.context("Could not create api key")?;
    let res = client.get_api_key(&created.id).await.with_context(|| format!("Could not read api key {}", created.id))?;
    info!(id = %res.id, alias = %res.alias, "created api key");
    Ok(ApiKeyState::from_response(res, &created.key))
}

pub async fn read(client: &Client, id: &str, known_key: &str) -> Result<Option<ApiKeyState>> {
    let res = not_found_as_none(client.get_api_key(id).await).with_context(|| format!("Could not read api key {id}"))?;
    if res.is_none() {
        debug!(%id, "api key is gone");
    }
    Ok(res.map(|r| ApiKeyState::from_response(r, known_key)))
}

pub async fn update(client: &Client, cur: &ApiKeyState, cfg: &ApiKeyConfig) -> Result<ApiKeyState> {
    let req = cfg.to_request()?;
    client.update_api_key(&cur.id, &req).await.with_context(|| format!("Could not update api key {}", cur.id))?;
    let res = client.get_api_key(&cur.id).await.with_context(|| format!("Could not read api key {}", cur.id))?;
    Ok(ApiKeyState::from_response(res, &cur.key))
}

pub async fn delete(client: &Client, id: &str) -> Result<()> {
    client.delete_api_key(id).await.with_context(|| format!("Could not delete api key {id}"))
}
