//! Connection configuration for grid cluster sessions.
//!
//! Derived by the embedding operator from the managed resource's spec and
//! passed through to the connection layer untouched. `PartialEq` matters
//! here: the session lifecycle manager compares configs structurally to
//! decide whether an existing session must be torn down and reconnected.

use serde::{Deserialize, Serialize};

/// Everything needed to open one client session to one grid cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Cluster name the remote side validates on connect.
    pub cluster_name: String,
    /// Member addresses to try, in order (`host:port`).
    pub addresses: Vec<String>,
    /// Optional client credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Optional TLS settings; `None` means plaintext.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
}

impl ConnectionConfig {
    /// Minimal plaintext config for a named cluster.
    pub fn new(cluster_name: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            addresses,
            credentials: None,
            tls: None,
        }
    }
}

/// Client credentials presented at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    /// Name of the secret holding the password; the operator resolves it,
    /// this core only carries the resolved value.
    pub password: String,
}

/// TLS settings for the client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOptions {
    /// PEM-encoded CA bundle used to verify the server.
    pub ca_bundle: String,
    /// Skip server certificate verification (test clusters only).
    #[serde(default)]
    pub insecure_skip_verify: bool,
}
