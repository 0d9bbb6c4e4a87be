use discue_scopes::ScopesRecord;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRequest {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<ScopesRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub id: String,
    pub alias: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub scopes: Option<ScopesRecord>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub last_used_at: Option<i64>,
}

/// Hostname and port are fixed after creation; updates leave them unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRequest {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResponse {
    pub id: String,
    pub alias: String,
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub challenge: DomainChallenge,
    #[serde(default)]
    pub verification: DomainVerification,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainChallenge {
    #[serde(default)]
    pub https: HttpChallenge,
}

/// The API fetches `https://{hostname}:{port}/{context_path}/{file_name}` and
/// expects `file_content` back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpChallenge {
    pub file_content: String,
    pub file_name: String,
    pub context_path: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainVerification {
    pub verified: bool,
    pub verified_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRequest {
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    pub id: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerRequest {
    pub alias: String,
    pub notify_url: String,
    pub liveness_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub id: String,
    pub alias: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notify_url: String,
    #[serde(default)]
    pub liveness_url: String,
}
