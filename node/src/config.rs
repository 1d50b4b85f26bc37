//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use likegate_action::UID_PLACEHOLDER;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a LikeGate node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Address the HTTP server binds to.
    #[serde(default = "default_rpc_bind")]
    pub rpc_bind: IpAddr,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Externally reachable base URL used to build `/verify/{code}` links.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Seconds between dispatcher cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Lifetime of a challenge link, in seconds.
    #[serde(default = "default_challenge_ttl_secs")]
    pub challenge_ttl_secs: u64,

    /// Minimum time between two successful likes for a non-VIP user.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Seconds between purges of expired, never-verified requests.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    /// Like API URL template; `{uid}` is replaced by the target UID.
    #[serde(default = "default_like_api_url")]
    pub like_api_url: String,

    #[serde(default = "default_like_api_timeout_secs")]
    pub like_api_timeout_secs: u64,

    /// Link shortener endpoint (`?api=KEY&url=LINK`). Links are not
    /// shortened when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortener_api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortener_api_key: Option<String>,

    /// Telegram bot token for result notifications. Results are only
    /// logged when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_bot_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_verify_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_access_url: Option<String>,

    /// Requester ids allowed to grant VIP.
    #[serde(default)]
    pub admin_ids: Vec<i64>,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,
}

/// Placeholder printed in place of a configured secret.
pub const REDACTED: &str = "<redacted>";

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./likegate_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_rpc_bind() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_rpc_port() -> u16 {
    8080
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_challenge_ttl_secs() -> u64 {
    10 * 60
}

fn default_cooldown_secs() -> u64 {
    24 * 60 * 60
}

fn default_purge_interval_secs() -> u64 {
    60 * 60
}

fn default_like_api_url() -> String {
    format!("http://127.0.0.1:5001/like?uid={UID_PLACEHOLDER}")
}

fn default_like_api_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// A copy safe to print: secrets are replaced by [`REDACTED`].
    pub fn redacted(&self) -> Self {
        let mask = |secret: &Option<String>| secret.as_ref().map(|_| REDACTED.to_string());
        Self {
            telegram_bot_token: mask(&self.telegram_bot_token),
            shortener_api_key: mask(&self.shortener_api_key),
            ..self.clone()
        }
    }

    /// Reject values the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if !self.like_api_url.contains(UID_PLACEHOLDER) {
            return Err(NodeError::Config(format!(
                "like_api_url must contain {UID_PLACEHOLDER}"
            )));
        }
        for (name, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("challenge_ttl_secs", self.challenge_ttl_secs),
            ("purge_interval_secs", self.purge_interval_secs),
            ("like_api_timeout_secs", self.like_api_timeout_secs),
        ] {
            if value == 0 {
                return Err(NodeError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.map_size_mb == 0 {
            return Err(NodeError::Config("map_size_mb must be non-zero".into()));
        }
        if self.shortener_api_url.is_some() != self.shortener_api_key.is_some() {
            return Err(NodeError::Config(
                "shortener_api_url and shortener_api_key must be set together".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    pub fn like_api_timeout(&self) -> Duration {
        Duration::from_secs(self.like_api_timeout_secs)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            rpc_bind: default_rpc_bind(),
            rpc_port: default_rpc_port(),
            public_base_url: default_public_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            challenge_ttl_secs: default_challenge_ttl_secs(),
            cooldown_secs: default_cooldown_secs(),
            purge_interval_secs: default_purge_interval_secs(),
            like_api_url: default_like_api_url(),
            like_api_timeout_secs: default_like_api_timeout_secs(),
            shortener_api_url: None,
            shortener_api_key: None,
            telegram_bot_token: None,
            how_to_verify_url: None,
            vip_access_url: None,
            admin_ids: Vec::new(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
