//! LikeGate daemon: entry point for running a node and for operator tasks.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use likegate_node::{init_logging, LikeGateNode, LogFormat, NodeConfig};
use likegate_policy::VipGrants;
use likegate_types::{RequesterId, SystemClock};

#[derive(Parser)]
#[command(name = "likegate-daemon", about = "Verification-gated like request service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LIKEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "LIKEGATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address the HTTP server binds to.
    #[arg(long, env = "LIKEGATE_RPC_BIND")]
    rpc_bind: Option<IpAddr>,

    /// HTTP server port.
    #[arg(long, env = "LIKEGATE_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Externally reachable base URL for verification links.
    #[arg(long, env = "LIKEGATE_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Like API URL template containing `{uid}`.
    #[arg(long, env = "LIKEGATE_LIKE_API_URL")]
    like_api_url: Option<String>,

    /// Telegram bot token used to deliver results.
    #[arg(long, env = "LIKEGATE_TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    /// Link shortener endpoint (`?api=KEY&url=LINK`).
    #[arg(long, env = "LIKEGATE_SHORTENER_API_URL")]
    shortener_api_url: Option<String>,

    /// Link shortener API key.
    #[arg(long, env = "LIKEGATE_SHORTENER_API_KEY", hide_env_values = true)]
    shortener_api_key: Option<String>,

    /// Link shown in the prompt for buying VIP access.
    #[arg(long, env = "LIKEGATE_VIP_ACCESS_URL")]
    vip_access_url: Option<String>,

    /// Link to the "how to verify" guide.
    #[arg(long, env = "LIKEGATE_HOW_TO_VERIFY_URL")]
    how_to_verify_url: Option<String>,

    /// Operators allowed to grant VIP (comma-separated requester ids).
    /// Replaces the list from the config file.
    #[arg(long, env = "LIKEGATE_ADMIN_IDS", value_delimiter = ',')]
    admin_ids: Option<Vec<i64>>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "LIKEGATE_ENABLE_METRICS")]
    metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LIKEGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LIKEGATE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// VIP administration.
    #[command(name = "vip")]
    Vip {
        #[command(subcommand)]
        action: VipAction,
    },
    /// Configuration helpers.
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT or SIGTERM.
    Run,
}

#[derive(clap::Subcommand)]
enum VipAction {
    /// Grant cooldown-free access for a number of days.
    Grant { target_id: i64, days: u32 },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Dump,
}

impl Cli {
    /// File config (or defaults) with flags and env vars layered on top.
    fn resolve_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_string_lossy();
                NodeConfig::from_toml_file(&path)
                    .with_context(|| format!("loading config file {path}"))?
            }
            None => NodeConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(bind) = self.rpc_bind {
            config.rpc_bind = bind;
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if let Some(url) = &self.public_base_url {
            config.public_base_url = url.clone();
        }
        if let Some(url) = &self.like_api_url {
            config.like_api_url = url.clone();
        }
        if let Some(token) = &self.telegram_bot_token {
            config.telegram_bot_token = Some(token.clone());
        }
        if let Some(url) = &self.shortener_api_url {
            config.shortener_api_url = Some(url.clone());
        }
        if let Some(key) = &self.shortener_api_key {
            config.shortener_api_key = Some(key.clone());
        }
        if let Some(url) = &self.vip_access_url {
            config.vip_access_url = Some(url.clone());
        }
        if let Some(url) = &self.how_to_verify_url {
            config.how_to_verify_url = Some(url.clone());
        }
        if let Some(ids) = &self.admin_ids {
            config.admin_ids = ids.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = LogFormat::parse(format);
        }
        config.enable_metrics |= self.metrics;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Node {
            action: NodeAction::Run,
        } => {
            tracing::info!(
                data_dir = %config.data_dir.display(),
                rpc = %format!("{}:{}", config.rpc_bind, config.rpc_port),
                public_base_url = %config.public_base_url,
                "starting LikeGate node"
            );
            let mut node = LikeGateNode::new(config)?;
            node.start().await?;

            node.shutdown_controller().wait_for_signal().await;
            tracing::info!("shutdown signal received, stopping node");
            node.stop().await?;
            tracing::info!("LikeGate daemon exited cleanly");
        }
        Command::Vip {
            action: VipAction::Grant { target_id, days },
        } => {
            let node = LikeGateNode::new(config)?;
            let grants = VipGrants::new(node.store(), Arc::new(SystemClock));
            let grant = grants
                .grant(RequesterId::new(target_id), days)
                .context("granting VIP")?;
            println!(
                "VIP access granted to user {} for {} days (until {})",
                target_id,
                days,
                likegate_utils::format_utc(grant.vip_expires)
            );
        }
        Command::Config {
            action: ConfigAction::Dump,
        } => {
            print!("{}", config.redacted().to_toml_string()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "likegate-daemon",
            "--rpc-port",
            "9000",
            "--metrics",
            "--log-format",
            "json",
            "config",
            "dump",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.rpc_port, 9000);
        assert!(config.enable_metrics);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.cooldown_secs, NodeConfig::default().cooldown_secs);
    }

    #[test]
    fn operator_settings_from_flags() {
        let cli = Cli::try_parse_from([
            "likegate-daemon",
            "--admin-ids",
            "11,22",
            "--shortener-api-url",
            "https://short.example/api",
            "--shortener-api-key",
            "k3y",
            "--vip-access-url",
            "https://vip.example",
            "--how-to-verify-url",
            "https://help.example",
            "config",
            "dump",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.admin_ids, vec![11, 22]);
        assert_eq!(config.shortener_api_key.as_deref(), Some("k3y"));
        assert_eq!(
            config.shortener_api_url.as_deref(),
            Some("https://short.example/api")
        );
        assert_eq!(config.vip_access_url.as_deref(), Some("https://vip.example"));
        assert_eq!(config.how_to_verify_url.as_deref(), Some("https://help.example"));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::try_parse_from([
            "likegate-daemon",
            "--like-api-url",
            "http://127.0.0.1/like",
            "node",
            "run",
        ])
        .unwrap();
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn vip_grant_arguments() {
        let cli = Cli::try_parse_from(["likegate-daemon", "vip", "grant", "42", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Vip {
                action: VipAction::Grant {
                    target_id: 42,
                    days: 7
                }
            }
        ));
    }
}
