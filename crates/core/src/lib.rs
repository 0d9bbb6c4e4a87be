use anyhow::Context;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use petgraph::graph::DiGraph;
use petgraph::algo::toposort;
use tracing::{info, info_span, Instrument};

/// Address of a managed resource, `<type>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(type_name: &str, name: &str) -> Self { Self(format!("{type_name}.{name}")) }
    pub fn type_name(&self) -> &str { self.0.split_once('.').map_or(self.0.as_str(), |(t, _)| t) }
    pub fn name(&self) -> &str { self.0.split_once('.').map_or("", |(_, n)| n) }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desired(pub serde_json::Value);
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current(pub serde_json::Value);

/// Last known state of every managed resource.
pub type Outputs = BTreeMap<ResourceId, Current>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Create(Desired),
    Update { from: Current, to: Desired },
    /// Delete then create, for changes the API cannot apply in place.
    Replace { from: Current, to: Desired },
    Delete(Current),
    Noop,
}

impl Op {
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Create(_) => "+",
            Op::Update { .. } => "~",
            Op::Replace { .. } => "-/+",
            Op::Delete(_) => "-",
            Op::Noop => " ",
        }
    }

    pub fn is_noop(&self) -> bool { matches!(self, Op::Noop) }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("dependency cycle detected at {0}")]
    Cycle(ResourceId),
    #[error("resource {0} is declared more than once")]
    Duplicate(ResourceId),
    #[error("plan references unknown resource {0}")]
    Unknown(ResourceId),
}

#[async_trait]
pub trait Resource: Send + Sync {
    fn id(&self) -> &ResourceId;
    fn deps(&self) -> BTreeSet<ResourceId> { BTreeSet::new() }
    /// Refreshes `prior` from the remote side; `None` means the resource does not exist.
    async fn read(&self, prior: Option<&Current>) -> anyhow::Result<Option<Current>>;
    async fn plan(&self, cur: Option<Current>, refs: &Outputs) -> anyhow::Result<Op>;
    /// Performs `op` and returns the resulting state, `None` once deleted.
    async fn apply(&self, op: Op, refs: &Outputs) -> anyhow::Result<Option<Current>>;
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub changes: Vec<(ResourceId, Op)>,
    pub refreshed: Outputs,
}

impl Plan {
    pub fn pending(&self) -> impl Iterator<Item = &(ResourceId, Op)> {
        self.changes.iter().filter(|(_, op)| !op.is_noop())
    }

    pub fn has_changes(&self) -> bool { self.pending().next().is_some() }
}

fn dependency_order(resources: &[Box<dyn Resource>]) -> Result<Vec<usize>, EngineError> {
    let mut g: DiGraph<usize, ()> = DiGraph::new();
    let mut id_to_ix = HashMap::new();
    for (i, r) in resources.iter().enumerate() {
        let ix = g.add_node(i);
        if id_to_ix.insert(r.id().clone(), ix).is_some() {
            return Err(EngineError::Duplicate(r.id().clone()));
        }
    }
    for r in resources {
        let to_ix = id_to_ix[r.id()];
        for d in r.deps() {
            if let Some(&from_ix) = id_to_ix.get(&d) {
                g.add_edge(from_ix, to_ix, ());
            }
        }
    }
    let ordered = toposort(&g, None).map_err(|c| EngineError::Cycle(resources[g[c.node_id()]].id().clone()))?;
    Ok(ordered.into_iter().map(|ix| g[ix]).collect())
}

/// Refreshes and plans every resource in dependency order.
pub async fn plan_all(resources: &[Box<dyn Resource>], prior: &Outputs) -> anyhow::Result<Plan> {
    let mut refreshed = prior.clone();
    let mut changes = Vec::new();
    for i in dependency_order(resources)? {
        let r = &resources[i];
        let id = r.id().clone();
        let cur = r.read(prior.get(&id)).await.with_context(|| format!("refresh {id}"))?;
        match &cur {
            Some(c) => { refreshed.insert(id.clone(), c.clone()); }
            None => { refreshed.remove(&id); }
        }
        let op = r.plan(cur, &refreshed).await.with_context(|| format!("plan {id}"))?;
        changes.push((id, op));
    }
    Ok(Plan { changes, refreshed })
}

/// Applies `plan`: creates and updates in dependency order, then deletes in
/// reverse order. A replacement runs as a delete followed by a create.
/// `outputs` is updated after each step, so it reflects partial progress when
/// an error is returned.
pub async fn apply_all(resources: &[Box<dyn Resource>], plan: Plan, outputs: &mut Outputs) -> anyhow::Result<usize> {
    let (deletes, others): (Vec<_>, Vec<_>) = plan.changes
        .into_iter()
        .filter(|(_, op)| !op.is_noop())
        .partition(|(_, op)| matches!(op, Op::Delete(_)));
    let mut applied = 0;
    for (id, op) in others.into_iter().chain(deletes.into_iter().rev()) {
        let r = resources.iter().find(|x| x.id() == &id).ok_or_else(|| EngineError::Unknown(id.clone()))?;
        let symbol = op.symbol();
        let steps = match op {
            // the delete is recorded before the create runs
            Op::Replace { from, to } => vec![Op::Delete(from), Op::Create(to)],
            op => vec![op],
        };
        for step in steps {
            let span = info_span!("apply", resource = %id, op = step.symbol());
            let result = r.apply(step, outputs).instrument(span).await.with_context(|| format!("apply {id}"))?;
            match result {
                Some(c) => { outputs.insert(id.clone(), c); }
                None => { outputs.remove(&id); }
            }
        }
        info!(resource = %id, op = symbol, "applied");
        applied += 1;
    }
    Ok(applied)
}
