//! discue resources for the planning engine.
//!
//! A [`Stack`] is the parsed stack file. [`build_resources`] turns its
//! declarations, together with whatever the prior state still tracks, into
//! engine resources bound to one shared [`Client`].

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use discue_client::{Client, ClientError};
use discue_core::{Current, Desired, Op, Outputs, Resource, ResourceId};
use discue_validate::{Diagnostics, Violation};
use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub mod api_key;
pub mod config;
pub mod domain;
pub mod listener;
pub mod queue;

pub use api_key::{ApiKeyConfig, ApiKeyState};
pub use config::ProviderConfig;
pub use domain::{DomainConfig, DomainState};
pub use listener::{ListenerConfig, ListenerState};
pub use queue::{QueueConfig, QueueState};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("missing {attribute}: {detail}")]
    MissingAttribute { attribute: &'static str, detail: String },
    #[error("invalid import id '{id}' for {type_name}, expected {expected}")]
    InvalidImportId { type_name: &'static str, id: String, expected: &'static str },
    #[error("queue {0} has no id yet")]
    UnresolvedQueue(ResourceId),
    #[error("unknown resource type '{0}'")]
    UnknownType(String),
}

/// Maps a 404 to `None`, so a deleted entity reads as gone.
pub(crate) fn not_found_as_none<T>(res: Result<T, ClientError>) -> Result<Option<T>, ClientError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Diff {
    Same,
    Update,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    ApiKey,
    Domain,
    Queue,
    Listener,
}

impl Kind {
    pub fn from_type_name(type_name: &str) -> Result<Self, ProviderError> {
        match type_name {
            api_key::TYPE_NAME => Ok(Kind::ApiKey),
            domain::TYPE_NAME => Ok(Kind::Domain),
            queue::TYPE_NAME => Ok(Kind::Queue),
            listener::TYPE_NAME => Ok(Kind::Listener),
            other => Err(ProviderError::UnknownType(other.to_string())),
        }
    }
}

/// One entry of the stack's `resources` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiscueResource {
    #[serde(rename = "discue_api_key")]
    ApiKey(ApiKeyConfig),
    #[serde(rename = "discue_domain")]
    Domain(DomainConfig),
    #[serde(rename = "discue_queue")]
    Queue(QueueConfig),
    #[serde(rename = "discue_listener")]
    Listener(ListenerConfig),
}

impl DiscueResource {
    pub fn kind(&self) -> Kind {
        match self {
            DiscueResource::ApiKey(_) => Kind::ApiKey,
            DiscueResource::Domain(_) => Kind::Domain,
            DiscueResource::Queue(_) => Kind::Queue,
            DiscueResource::Listener(_) => Kind::Listener,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DiscueResource::ApiKey(_) => api_key::TYPE_NAME,
            DiscueResource::Domain(_) => domain::TYPE_NAME,
            DiscueResource::Queue(_) => queue::TYPE_NAME,
            DiscueResource::Listener(_) => listener::TYPE_NAME,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DiscueResource::ApiKey(c) => &c.name,
            DiscueResource::Domain(c) => &c.name,
            DiscueResource::Queue(c) => &c.name,
            DiscueResource::Listener(c) => &c.name,
        }
    }

    pub fn id(&self) -> ResourceId { ResourceId::new(self.type_name(), self.name()) }

    pub fn validate(&self, diags: &mut Diagnostics) {
        match self {
            DiscueResource::ApiKey(c) => c.validate(diags),
            DiscueResource::Domain(c) => c.validate(diags),
            DiscueResource::Queue(c) => c.validate(diags),
            DiscueResource::Listener(c) => c.validate(diags),
        }
    }
}

/// A parsed stack file.
#[derive(Debug, Default, Deserialize)]
pub struct Stack {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub resources: Vec<DiscueResource>,
}

impl Stack {
    /// Checks every resource and the references between them, reporting all
    /// violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut diags = Diagnostics::new();
        let declared: BTreeSet<ResourceId> = self.resources.iter().map(DiscueResource::id).collect();
        let mut seen = BTreeSet::new();
        for r in &self.resources {
            let id = r.id();
            let name = r.name();
            diags.require(!name.is_empty() && !name.contains('.'), format!("{id}.name"), name, "must be non-empty and must not contain '.'");
            diags.require(seen.insert(id.clone()), id.to_string(), &id, "is declared more than once");

            let mut local = Diagnostics::new();
            r.validate(&mut local);
            for v in local.violations() {
                diags.push(Violation { path: format!("{id}.{}", v.path), ..v.clone() });
            }

            if let DiscueResource::Listener(l) = r {
                if let Some(q) = l.queue_address() {
                    diags.require(declared.contains(&q), format!("{id}.queue"), &q, "must name a queue declared in this stack");
                }
            }
        }
        diags.into_result("invalid stack")
    }

    pub fn find(&self, id: &ResourceId) -> Option<&DiscueResource> {
        self.resources.iter().find(|r| &r.id() == id)
    }
}

/// The identifying part of any persisted state.
#[derive(Debug, Deserialize)]
struct Locator {
    id: String,
    #[serde(default)]
    queue_id: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

impl Locator {
    fn of(c: &Current) -> Result<Self> {
        serde_json::from_value(c.0.clone()).context("state entry has no id")
    }

    fn queue_id(&self) -> Result<&str> {
        self.queue_id.as_deref().ok_or_else(|| anyhow!("listener state has no queue_id"))
    }
}

fn typed<T: serde::de::DeserializeOwned>(c: &Current) -> Result<T> {
    serde_json::from_value(c.0.clone()).context("malformed state entry")
}

fn current<T: Serialize>(state: T) -> Result<Current> {
    Ok(Current(serde_json::to_value(state)?))
}

/// A declared or orphaned resource bound to the API client. Orphans have no
/// configuration and are always planned for deletion.
pub struct Managed {
    id: ResourceId,
    kind: Kind,
    client: Arc<Client>,
    config: Option<DiscueResource>,
    deps: BTreeSet<ResourceId>,
}

impl Managed {
    fn config(&self) -> Result<&DiscueResource> {
        self.config.as_ref().ok_or_else(|| anyhow!("{} is not declared in the stack", self.id))
    }

    async fn create(&self, refs: &Outputs) -> Result<Current> {
        match self.config()? {
            DiscueResource::ApiKey(c) => current(api_key::create(&self.client, c).await?),
            DiscueResource::Domain(c) => current(domain::create(&self.client, c).await?),
            DiscueResource::Queue(c) => current(queue::create(&self.client, c).await?),
            DiscueResource::Listener(c) => current(listener::create(&self.client, c, refs).await?),
        }
    }

    async fn update(&self, from: &Current) -> Result<Current> {
        let loc = Locator::of(from)?;
        match self.config()? {
            DiscueResource::ApiKey(c) => current(api_key::update(&self.client, &typed(from)?, c).await?),
            DiscueResource::Domain(c) => current(domain::update(&self.client, &loc.id, c).await?),
            DiscueResource::Queue(c) => current(queue::update(&self.client, &loc.id, c).await?),
            DiscueResource::Listener(c) => current(listener::update(&self.client, &typed(from)?, c).await?),
        }
    }

    async fn delete(&self, from: &Current) -> Result<()> {
        let loc = Locator::of(from)?;
        match self.kind {
            Kind::ApiKey => api_key::delete(&self.client, &loc.id).await,
            Kind::Domain => domain::delete(&self.client, &loc.id).await,
            Kind::Queue => queue::delete(&self.client, &loc.id).await,
            Kind::Listener => listener::delete(&self.client, loc.queue_id()?, &loc.id).await,
        }
    }

    fn diff(&self, cfg: &DiscueResource, cur: &Current, refs: &Outputs) -> Result<Diff> {
        Ok(match cfg {
            DiscueResource::ApiKey(c) => c.diff(&typed(cur)?),
            DiscueResource::Domain(c) => c.diff(&typed(cur)?),
            DiscueResource::Queue(c) => c.diff(&typed(cur)?),
            DiscueResource::Listener(c) => c.diff(&typed(cur)?, refs),
        })
    }
}

#[async_trait]
impl Resource for Managed {
    fn id(&self) -> &ResourceId { &self.id }

    fn deps(&self) -> BTreeSet<ResourceId> { self.deps.clone() }

    async fn read(&self, prior: Option<&Current>) -> Result<Option<Current>> {
        let Some(prior) = prior else { return Ok(None) };
        let loc = Locator::of(prior)?;
        let client = &self.client;
        match self.kind {
            Kind::ApiKey => api_key::read(client, &loc.id, loc.key.as_deref().unwrap_or_default()).await?.map(current).transpose(),
            Kind::Domain => domain::read(client, &loc.id).await?.map(current).transpose(),
            Kind::Queue => queue::read(client, &loc.id).await?.map(current).transpose(),
            Kind::Listener => listener::read(client, loc.queue_id()?, &loc.id).await?.map(current).transpose(),
        }
    }

    async fn plan(&self, cur: Option<Current>, refs: &Outputs) -> Result<Op> {
        let op = match (&self.config, cur) {
            (None, None) => Op::Noop,
            (None, Some(c)) => Op::Delete(c),
            (Some(cfg), None) => Op::Create(Desired(serde_json::to_value(cfg)?)),
            (Some(cfg), Some(c)) => {
                let to = Desired(serde_json::to_value(cfg)?);
                match self.diff(cfg, &c, refs)? {
                    Diff::Same => Op::Noop,
                    Diff::Update => Op::Update { from: c, to },
                    Diff::Replace => Op::Replace { from: c, to },
                }
            }
        };
        debug!(resource = %self.id, op = op.symbol(), "planned");
        Ok(op)
    }

    async fn apply(&self, op: Op, refs: &Outputs) -> Result<Option<Current>> {
        match op {
            Op::Create(_) => Ok(Some(self.create(refs).await?)),
            Op::Update { from, .. } => Ok(Some(self.update(&from).await?)),
            Op::Replace { from, .. } => {
                self.delete(&from).await?;
                Ok(Some(self.create(refs).await?))
            }
            Op::Delete(from) => {
                self.delete(&from).await?;
                Ok(None)
            }
            Op::Noop => Ok(refs.get(&self.id).cloned()),
        }
    }
}

/// Queues the given listener state hangs off, by matching prior queue ids.
fn queues_with_id<'a>(queue_id: &str, prior: &'a Outputs) -> impl Iterator<Item = ResourceId> + 'a {
    let queue_id = queue_id.to_string();
    prior
        .iter()
        .filter(|(id, _)| id.type_name() == queue::TYPE_NAME)
        .filter(move |(_, c)| c.0.get("id").and_then(|v| v.as_str()) == Some(queue_id.as_str()))
        .map(|(id, _)| id.clone())
}

fn listener_deps(id: &ResourceId, cfg: Option<&ListenerConfig>, prior: &Outputs) -> BTreeSet<ResourceId> {
    let mut deps = BTreeSet::new();
    if let Some(q) = cfg.and_then(ListenerConfig::queue_address) {
        deps.insert(q);
    }
    let queue_id = cfg
        .and_then(|c| c.queue_id.clone())
        .or_else(|| prior.get(id).and_then(|c| c.0.get("queue_id")?.as_str().map(str::to_string)));
    if let Some(queue_id) = queue_id {
        deps.extend(queues_with_id(&queue_id, prior));
    }
    deps
}

/// Declared resources first, then every resource the prior state still
/// tracks but the stack no longer declares.
pub fn build_resources(declared: &[DiscueResource], client: Arc<Client>, prior: &Outputs) -> Result<Vec<Box<dyn Resource>>> {
    let mut out: Vec<Box<dyn Resource>> = Vec::new();
    let mut names = BTreeSet::new();
    for cfg in declared {
        let id = cfg.id();
        let deps = match cfg {
            DiscueResource::Listener(l) => listener_deps(&id, Some(l), prior),
            _ => BTreeSet::new(),
        };
        names.insert(id.clone());
        out.push(Box::new(Managed { id, kind: cfg.kind(), client: client.clone(), config: Some(cfg.clone()), deps }));
    }
    for id in prior.keys().filter(|id| !names.contains(*id)) {
        let kind = match Kind::from_type_name(id.type_name()) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(resource = %id, error = %e, "ignoring state entry");
                continue;
            }
        };
        let deps = match kind {
            Kind::Listener => listener_deps(id, None, prior),
            _ => BTreeSet::new(),
        };
        debug!(resource = %id, "no longer declared");
        out.push(Box::new(Managed { id: id.clone(), kind, client: client.clone(), config: None, deps }));
    }
    Ok(out)
}

/// Reads an existing entity so it can be adopted into state under `address`.
pub async fn import(client: &Client, address: &ResourceId, import_id: &str) -> Result<Current> {
    let found = match Kind::from_type_name(address.type_name())? {
        Kind::ApiKey => api_key::read(client, import_id, "").await?.map(current).transpose()?,
        Kind::Domain => domain::read(client, import_id).await?.map(current).transpose()?,
        Kind::Queue => queue::read(client, import_id).await?.map(current).transpose()?,
        Kind::Listener => {
            let (queue_id, listener_id) = listener::parse_import_id(import_id)?;
            listener::read(client, &queue_id, &listener_id).await?.map(current).transpose()?
        }
    };
    match found {
        Some(c) => Ok(c),
        None => bail!("cannot import {address}: no entity with id '{import_id}'"),
    }
}
