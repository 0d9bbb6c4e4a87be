use reqwest::Method;
use serde::Serialize;
use serde_json::Value as Json;

use crate::{
    ApiKeyRequest, ApiKeyResponse, Client, ClientError, DomainRequest, DomainResponse, Listener,
    ListenerRequest, Queue, QueueRequest, RequestOptions,
};

const API_KEYS: &str = "api_keys";
const DOMAINS: &str = "domains";
const QUEUES: &str = "queues";
const LISTENERS: &str = "listeners";

fn to_body<T: Serialize>(value: &T) -> Result<Json, ClientError> {
    Ok(serde_json::to_value(value)?)
}

impl Client {
    pub async fn get_api_key(&self, id: &str) -> Result<ApiKeyResponse, ClientError> {
        self.send_and_receive(RequestOptions::new(Method::GET, format!("/{API_KEYS}/{id}")), "api_key").await
    }

    pub async fn create_api_key(&self, req: &ApiKeyRequest) -> Result<ApiKeyResponse, ClientError> {
        let opts = RequestOptions::new(Method::POST, format!("/{API_KEYS}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "api_key").await
    }

    pub async fn update_api_key(&self, id: &str, req: &ApiKeyRequest) -> Result<ApiKeyResponse, ClientError> {
        let opts = RequestOptions::new(Method::PUT, format!("/{API_KEYS}/{id}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "api_key").await
    }

    pub async fn delete_api_key(&self, id: &str) -> Result<(), ClientError> {
        self.send(RequestOptions::new(Method::DELETE, format!("/{API_KEYS}/{id}"))).await
    }

    pub async fn get_domain(&self, id: &str) -> Result<DomainResponse, ClientError> {
        self.send_and_receive(RequestOptions::new(Method::GET, format!("/{DOMAINS}/{id}")), "domain").await
    }

    pub async fn create_domain(&self, req: &DomainRequest) -> Result<DomainResponse, ClientError> {
        let opts = RequestOptions::new(Method::POST, format!("/{DOMAINS}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "domain").await
    }

    pub async fn update_domain(&self, id: &str, req: &DomainRequest) -> Result<DomainResponse, ClientError> {
        let opts = RequestOptions::new(Method::PUT, format!("/{DOMAINS}/{id}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "domain").await
    }

    pub async fn delete_domain(&self, id: &str) -> Result<(), ClientError> {
        self.send(RequestOptions::new(Method::DELETE, format!("/{DOMAINS}/{id}"))).await
    }

    pub async fn get_queue(&self, id: &str) -> Result<Queue, ClientError> {
        self.send_and_receive(RequestOptions::new(Method::GET, format!("/{QUEUES}/{id}")), "queue").await
    }

    pub async fn create_queue(&self, req: &QueueRequest) -> Result<Queue, ClientError> {
        let opts = RequestOptions::new(Method::POST, format!("/{QUEUES}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "queue").await
    }

    pub async fn update_queue(&self, id: &str, req: &QueueRequest) -> Result<Queue, ClientError> {
        let opts = RequestOptions::new(Method::PUT, format!("/{QUEUES}/{id}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "queue").await
    }

    pub async fn delete_queue(&self, id: &str) -> Result<(), ClientError> {
        self.send(RequestOptions::new(Method::DELETE, format!("/{QUEUES}/{id}"))).await
    }

    // listeners live under their queue
    pub async fn get_listener(&self, queue_id: &str, id: &str) -> Result<Listener, ClientError> {
        self.send_and_receive(RequestOptions::new(Method::GET, format!("/{QUEUES}/{queue_id}/{LISTENERS}/{id}")), "listener").await
    }

    pub async fn create_listener(&self, queue_id: &str, req: &ListenerRequest) -> Result<Listener, ClientError> {
        let opts = RequestOptions::new(Method::POST, format!("/{QUEUES}/{queue_id}/{LISTENERS}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "listener").await
    }

    pub async fn update_listener(&self, queue_id: &str, id: &str, req: &ListenerRequest) -> Result<Listener, ClientError> {
        let opts = RequestOptions::new(Method::PUT, format!("/{QUEUES}/{queue_id}/{LISTENERS}/{id}")).with_body(to_body(req)?);
        self.send_and_receive(opts, "listener").await
    }

    pub async fn delete_listener(&self, queue_id: &str, id: &str) -> Result<(), ClientError> {
        self.send(RequestOptions::new(Method::DELETE, format!("/{QUEUES}/{queue_id}/{LISTENERS}/{id}"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_client;
    use discue_scopes::{Access, ScopeValue, ScopesRecord};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn creates_api_key_with_scopes_record() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api_keys").json_body(json!({
                "alias": "ci-key",
                "status": "enabled",
                "scopes": { "queues": { "access": "read", "targets": ["*"] } }
            }));
            then.status(200).json_body(json!({ "api_key": {
                "id": "Ak3zbsCzWxGqcJ2r0bAQP",
                "alias": "ci-key",
                "status": "enabled",
                "key": "k-123",
                "scopes": { "queues": { "access": "read", "targets": ["*"] } },
                "created_at": 1700000000000i64
            }}));
        });

        let mut scopes = ScopesRecord::default();
        scopes.queues = Some(ScopeValue::new(Access::Read, vec!["*".into()]));
        let req = ApiKeyRequest { alias: "ci-key".into(), status: Some("enabled".into()), scopes: Some(scopes.clone()) };
        let key = test_client(&server).create_api_key(&req).await.unwrap();
        mock.assert();
        assert_eq!(key.id, "Ak3zbsCzWxGqcJ2r0bAQP");
        assert_eq!(key.scopes, Some(scopes));
        assert_eq!(key.created_at, Some(1700000000000));
        assert_eq!(key.last_used_at, None);
    }

    #[tokio::test]
    async fn domain_update_omits_fixed_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT).path("/domains/Ak3zbsCzWxGqcJ2r0bAQP").json_body(json!({ "alias": "web-renamed" }));
            then.status(200).json_body(json!({ "domain": {
                "id": "Ak3zbsCzWxGqcJ2r0bAQP",
                "alias": "web-renamed",
                "hostname": "www.discue.io",
                "port": 443,
                "challenge": { "https": { "file_name": "challenge.txt", "context_path": "/.well-known/discue" } }
            }}));
        });

        let req = DomainRequest { alias: "web-renamed".into(), hostname: None, port: None };
        let d = test_client(&server).update_domain("Ak3zbsCzWxGqcJ2r0bAQP", &req).await.unwrap();
        mock.assert();
        assert_eq!(d.challenge.https.file_name, "challenge.txt");
        assert!(!d.verification.verified);
    }

    #[tokio::test]
    async fn listener_paths_are_nested_under_queue() {
        let server = MockServer::start();
        let get = server.mock(|when, then| {
            when.method(GET).path("/queues/q1/listeners/l1");
            then.status(200).json_body(json!({ "listener": {
                "id": "l1", "alias": "orders-listener", "status": "enabled",
                "notify_url": "https://hooks.discue.io/notify", "liveness_url": "https://hooks.discue.io/live"
            }}));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/queues/q1/listeners/l1");
            then.status(200).json_body(json!({ "_links": {} }));
        });

        let client = test_client(&server);
        let l = client.get_listener("q1", "l1").await.unwrap();
        assert_eq!(l.notify_url, "https://hooks.discue.io/notify");
        client.delete_listener("q1", "l1").await.unwrap();
        get.assert();
        delete.assert();
    }

    #[tokio::test]
    async fn queue_round_trip() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/queues").json_body(json!({ "alias": "orders" }));
            then.status(200).json_body(json!({ "queue": { "id": "q1", "alias": "orders" } }));
        });

        let q = test_client(&server).create_queue(&QueueRequest { alias: "orders".into() }).await.unwrap();
        assert_eq!(q, Queue { id: "q1".into(), alias: "orders".into() });
    }
}
