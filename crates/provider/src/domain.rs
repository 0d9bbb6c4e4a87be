//! Domains must be verified before they receive messages. The API answers a
//! create with an HTTP challenge; `challenge` and `verification` in the state
//! are filled from the API only.

use anyhow::{Context, Result};
use discue_client::{Client, DomainChallenge, DomainRequest, DomainResponse, DomainVerification};
use discue_validate::{is_hostname, is_port, is_resource_alias, Diagnostics};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::{not_found_as_none, Diff};

pub const TYPE_NAME: &str = "discue_domain";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    pub alias: String,
    pub hostname: String,
    pub port: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainState {
    pub id: String,
    pub alias: String,
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub challenge: DomainChallenge,
    #[serde(default)]
    pub verification: DomainVerification,
}

impl From<DomainResponse> for DomainState {
    fn from(d: DomainResponse) -> Self {
        Self { id: d.id, alias: d.alias, hostname: d.hostname, port: d.port, challenge: d.challenge, verification: d.verification }
    }
}

impl DomainConfig {
    pub fn validate(&self, diags: &mut Diagnostics) {
        diags.require(is_resource_alias(&self.alias), "alias", &self.alias, "must match the pattern for name/alias values");
        diags.require(is_hostname(&self.hostname), "hostname", &self.hostname, "must match the pattern for valid hostnames");
        diags.require(is_port(self.port), "port", self.port, "must be 80, 443 or between 1024 and 65535");
    }

    fn port(&self) -> Result<u16> {
        u16::try_from(self.port).with_context(|| format!("port {} is out of range", self.port))
    }

    pub fn create_request(&self) -> Result<DomainRequest> {
        Ok(DomainRequest { alias: self.alias.clone(), hostname: Some(self.hostname.clone()), port: Some(self.port()?) })
    }

    /// Hostname and port cannot be updated.
    pub fn update_request(&self) -> DomainRequest {
        DomainRequest { alias: self.alias.clone(), hostname: None, port: None }
    }

    pub(crate) fn diff(&self, cur: &DomainState) -> Diff {
        if self.hostname != cur.hostname || u32::from(cur.port) != self.port {
            Diff::Replace
        } else if self.alias != cur.alias {
            Diff::Update
        } else {
            Diff::Same
        }
    }
}

pub async fn create(client: &Client, cfg: &DomainConfig) -> Result<DomainState> {
    let created = client.create_domain(&cfg.create_request()?).await.context("Could not create domain")?;
    let d = client.get_domain(&created.id).await.with_context(|| format!("Could not read domain {}", created.id))?;
    info!(id = %d.id, hostname = %d.hostname, verified = d.verification.verified, "created domain");
    Ok(d.into())
}

pub async fn read(client: &Client, id: &str) -> Result<Option<DomainState>> {
    let d = not_found_as_none(client.get_domain(id).await).with_context(|| format!("Could not read domain {id}"))?;
    Ok(d.map(Into::into))
}

pub async fn update(client: &Client, id: &str, cfg: &DomainConfig) -> Result<DomainState> {
    client.update_domain(id, &cfg.update_request()).await.with_context(|| format!("Could not update domain {id}"))?;
    let d = client.get_domain(id).await.with_context(|| format!("Could not read domain {id}"))?;
    Ok(d.into())
}

pub async fn delete(client: &Client, id: &str) -> Result<()> {
    client.delete_domain(id).await.with_context(|| format!("Could not delete domain {id}"))
}
