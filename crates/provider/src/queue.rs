use anyhow::{Context, Result};
use discue_client::{Client, Queue, QueueRequest};
use discue_validate::{is_resource_alias, Diagnostics};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::{not_found_as_none, Diff};

pub const TYPE_NAME: &str = "discue_queue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    pub id: String,
    pub alias: String,
}

impl From<Queue> for QueueState {
    fn from(q: Queue) -> Self { Self { id: q.id, alias: q.alias } }
}

impl QueueConfig {
    pub fn validate(&self, diags: &mut Diagnostics) {
        diags.require(is_resource_alias(&self.alias), "alias", &self.alias, "must match the pattern for name/alias values");
    }

    pub fn to_request(&self) -> QueueRequest { QueueRequest { alias: self.alias.clone() } }

    pub(crate) fn diff(&self, cur: &QueueState) -> Diff {
        if self.alias == cur.alias { Diff::Same } else { Diff::Update }
    }
}

pub async fn create(client: &Client, cfg: &QueueConfig) -> Result<QueueState> {
    let created = client.create_queue(&cfg.to_request()).await.context("Could not create queue")?;
    let q = client.get_queue(&created.id).await.with_context(|| format!("Could not read queue {}", created.id))?;
    info!(id = %q.id, alias = %q.alias, "created queue");
    Ok(q.into())
}

pub async fn read(client: &Client, id: &str) -> Result<Option<QueueState>> {
    let q = not_found_as_none(client.get_queue(id).await).with_context(|| format!("Could not read queue {id}"))?;
    Ok(q.map(Into::into))
}

pub async fn update(client: &Client, id: &str, cfg: &QueueConfig) -> Result<QueueState> {
    client.update_queue(id, &cfg.to_request()).await.with_context(|| format!("Could not update queue {id}"))?;
    let q = client.get_queue(id).await.with_context(|| format!("Could not read queue {id}"))?;
    Ok(q.into())
}

pub async fn delete(client: &Client, id: &str) -> Result<()> {
    client.delete_queue(id).await.with_context(|| format!("Could not delete queue {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{test_client, QUEUE_ID};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn update_sends_the_alias_and_rereads() {
        let server = MockServer::start();
        let put = server.mock(|when, then| {
            when.method(PUT).path(format!("/queues/{QUEUE_ID}")).json_body(json!({ "alias": "orders-v2" }));
            then.status(200).json_body(json!({ "queue": { "id": QUEUE_ID, "alias": "orders-v2" } }));
        });
        let get = server.mock(|when, then| {
            when.method(GET).path(format!("/queues/{QUEUE_ID}"));
            then.status(200).json_body(json!({ "queue": { "id": QUEUE_ID, "alias": "orders-v2" } }));
        });
        let cfg = QueueConfig { name: "orders".into(), alias: "orders-v2".into() };

        let state = update(&test_client(&server), QUEUE_ID, &cfg).await.unwrap();
        put.assert();
        get.assert();
        assert_eq!(state, QueueState { id: QUEUE_ID.into(), alias: "orders-v2".into() });
    }

    #[tokio::test]
    async fn server_errors_are_not_treated_as_gone() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(format!("/queues/{QUEUE_ID}"));
            then.status(500).body("boom");
        });
        let err = read(&test_client(&server), QUEUE_ID).await.unwrap_err();
        assert!(format!("{err:#}").contains("500"));
    }
}
