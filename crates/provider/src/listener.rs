use anyhow::{Context, Result};
use discue_client::{Client, Listener, ListenerRequest};
use discue_core::{Outputs, ResourceId};
use discue_validate::{is_resource_alias, is_resource_id, is_url, Diagnostics};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::{not_found_as_none, queue, Diff, ProviderError};

pub const TYPE_NAME: &str = "discue_listener";

/// A listener belongs to a queue, given either as `queue_id` or as `queue`,
/// the name of a queue declared in the same stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub name: String,
    pub alias: String,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub queue_id: Option<String>,
    pub notify_url: String,
    pub liveness_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerState {
    pub id: String,
    pub queue_id: String,
    pub alias: String,
    pub notify_url: String,
    pub liveness_url: String,
}

impl ListenerState {
    fn from_response(queue_id: &str, l: Listener) -> Self {
        Self { id: l.id, queue_id: queue_id.to_string(), alias: l.alias, notify_url: l.notify_url, liveness_url: l.liveness_url }
    }
}

impl ListenerConfig {
    pub fn validate(&self, diags: &mut Diagnostics) {
        diags.require(is_resource_alias(&self.alias), "alias", &self.alias, "must match the pattern for name/alias values");
        diags.require(is_url(&self.notify_url), "notify_url", &self.notify_url, "must be a valid URL with http or https protocol and without authentication");
        diags.require(is_url(&self.liveness_url), "liveness_url", &self.liveness_url, "must be a valid URL with http or https protocol and without authentication");
        match (&self.queue, &self.queue_id) {
            (Some(_), None) => {}
            (None, Some(id)) => diags.require(is_resource_id(id), "queue_id", id, "must match the pattern for string id values"),
            (q, id) => diags.require(
                false,
                "queue",
                format!("queue={} queue_id={}", q.as_deref().unwrap_or("-"), id.as_deref().unwrap_or("-")),
                "exactly one of queue or queue_id must be set",
            ),
        }
    }

    pub fn queue_address(&self) -> Option<ResourceId> {
        self.queue.as_deref().map(|n| ResourceId::new(queue::TYPE_NAME, n))
    }

    /// `None` while the referenced queue has not been created.
    pub fn resolve_queue_id(&self, refs: &Outputs) -> Option<String> {
        if let Some(id) = &self.queue_id { return Some(id.clone()); }
        let addr = self.queue_address()?;
        refs.get(&addr)?.0.get("id")?.as_str().map(str::to_string)
    }

    fn require_queue_id(&self, refs: &Outputs) -> Result<String> {
        self.resolve_queue_id(refs).ok_or_else(|| {
            let addr = self.queue_address().unwrap_or_else(|| ResourceId::new(queue::TYPE_NAME, "?"));
            ProviderError::UnresolvedQueue(addr).into()
        })
    }

    pub fn to_request(&self) -> ListenerRequest {
        ListenerRequest { alias: self.alias.clone(), notify_url: self.notify_url.clone(), liveness_url: self.liveness_url.clone() }
    }

    /// Moving a listener to another queue means recreating it.
    pub(crate) fn diff(&self, cur: &ListenerState, refs: &Outputs) -> Diff {
        if self.resolve_queue_id(refs).as_deref() != Some(cur.queue_id.as_str()) {
            Diff::Replace
        } else if self.alias != cur.alias || self.notify_url != cur.notify_url || self.liveness_url != cur.liveness_url {
            Diff::Update
        } else {
            Diff::Same
        }
    }
}

/// Import ids have the form `<queue_id>,<listener_id>`.
pub fn parse_import_id(id: &str) -> Result<(String, String), ProviderError> {
    match id.split(',').collect::<Vec<_>>().as_slice() {
        [queue_id, listener_id] if !queue_id.is_empty() && !listener_id.is_empty() => {
            Ok((queue_id.to_string(), listener_id.to_string()))
        }
        _ => Err(ProviderError::InvalidImportId { type_name: TYPE_NAME, id: id.to_string(), expected: "<queue_id>,<listener_id>" }),
    }
}

pub async fn create(client: &Client, cfg: &ListenerConfig, refs: &Outputs) -> Result<ListenerState> {
    let queue_id = cfg.require_queue_id(refs)?;
    let created = client.create_listener(&queue_id, &cfg.to_request()).await.context("Could not create listener")?;
    let l = client.get_listener(&queue_id, &created.id).await.with_context(|| format!("Could not read listener {}", created.id))?;
    info!(id = %l.id, %queue_id, "created listener");
    Ok(ListenerState::from_response(&queue_id, l))
}

pub async fn read(client: &Client, queue_id: &str, id: &str) -> Result<Option<ListenerState>> {
    let l = not_found_as_none(client.get_listener(queue_id, id).await).with_context(|| format!("Could not read listener {id}"))?;
    Ok(l.map(|l| ListenerState::from_response(queue_id, l)))
}

pub async fn update(client: &Client, cur: &ListenerState, cfg: &ListenerConfig) -> Result<ListenerState> {
    client.update_listener(&cur.queue_id, &cur.id, &cfg.to_request()).await.with_context(|| format!("Could not update listener {}", cur.id))?;
    let l = client.get_listener(&cur.queue_id, &cur.id).await.with_context(|| format!("Could not read listener {}", cur.id))?;
    Ok(ListenerState::from_response(&cur.queue_id, l))
}

pub async fn delete(client: &Client, queue_id: &str, id: &str) -> Result<()> {
    client.delete_listener(queue_id, id).await.with_context(|| format!("Could not delete listener {id}"))
}
