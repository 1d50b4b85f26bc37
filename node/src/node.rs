//! The LikeGate node: opens storage, wires the services and runs the
//! dispatcher and the HTTP server until shutdown.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use likegate_action::{ActionInvoker, HttpLikeApi, LikeApi};
use likegate_notify::{LogNotifier, Notifier, TelegramNotifier};
use likegate_policy::{EligibilityPolicy, VipGrants};
use likegate_rpc::{RpcServer, RpcState};
use likegate_store_lmdb::{check_integrity, LmdbStore};
use likegate_types::{Clock, OsCodeSource, RequesterId, SystemClock};
use likegate_verification::{
    ChallengeIssuer, DirectLinks, HttpShortener, IssuerConfig, LinkShortener,
    VerificationGateway,
};

use crate::config::NodeConfig;
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::metrics::DispatchMetrics;
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// How long `stop` waits for background tasks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound ports. Built from config by default; tests substitute nullables.
pub struct Ports {
    pub like_api: Arc<dyn LikeApi>,
    pub notifier: Arc<dyn Notifier>,
    pub shortener: Arc<dyn LinkShortener>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// Real HTTP clients, falling back to log-only notification and raw
    /// links when their settings are absent.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let like_api = Arc::new(HttpLikeApi::new(
            config.like_api_url.clone(),
            config.like_api_timeout(),
        )?);

        let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
            Some(token) => Arc::new(TelegramNotifier::new(token)?),
            None => {
                tracing::warn!("no telegram_bot_token configured, results will only be logged");
                Arc::new(LogNotifier)
            }
        };

        let shortener: Arc<dyn LinkShortener> =
            match (&config.shortener_api_url, &config.shortener_api_key) {
                (Some(url), Some(key)) => Arc::new(
                    HttpShortener::new(url.clone(), key.clone()).map_err(NodeError::Config)?,
                ),
                _ => Arc::new(DirectLinks),
            };

        Ok(Self {
            like_api,
            notifier,
            shortener,
            clock: Arc::new(SystemClock),
        })
    }
}

pub struct LikeGateNode {
    config: NodeConfig,
    store: Arc<LmdbStore>,
    metrics: Arc<DispatchMetrics>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
    rpc_addr: Option<SocketAddr>,
}

impl LikeGateNode {
    /// Validate the config, open the LMDB environment and check its integrity.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let store = LmdbStore::open(&config.data_dir, config.map_size_bytes())?;
        let report = check_integrity(&store)?;
        if !report.is_healthy() {
            return Err(NodeError::Integrity(report.errors.join("; ")));
        }
        tracing::info!(
            data_dir = %config.data_dir.display(),
            entries = report.total_entries,
            "store opened"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            metrics: Arc::new(DispatchMetrics::new()?),
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
            rpc_addr: None,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<LmdbStore> {
        Arc::clone(&self.store)
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// Address the HTTP server is bound to, once started.
    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.rpc_addr
    }

    /// Start with ports built from the config.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let ports = Ports::from_config(&self.config)?;
        self.start_with(ports).await
    }

    /// Bind the HTTP server and spawn it together with the dispatcher.
    pub async fn start_with(&mut self, ports: Ports) -> Result<(), NodeError> {
        tracing::info!("LikeGate node starting");

        let gateway = Arc::new(VerificationGateway::new(
            self.store.clone(),
            ports.clock.clone(),
        ));
        let issuer = Arc::new(ChallengeIssuer::new(
            self.store.clone(),
            ports.clock.clone(),
            Arc::new(OsCodeSource),
            ports.shortener,
            IssuerConfig {
                public_base_url: self.config.public_base_url.clone(),
                challenge_ttl: self.config.challenge_ttl(),
                vip_access_url: self.config.vip_access_url.clone(),
                how_to_verify_url: self.config.how_to_verify_url.clone(),
            },
        ));
        let vip = Arc::new(VipGrants::new(self.store.clone(), ports.clock.clone()));

        let rpc_state = Arc::new(RpcState {
            gateway,
            issuer,
            vip,
            admin_ids: self
                .config
                .admin_ids
                .iter()
                .copied()
                .map(RequesterId::new)
                .collect::<HashSet<_>>(),
            metrics_registry: self
                .config
                .enable_metrics
                .then(|| self.metrics.registry.clone()),
            verifications: Some(self.metrics.verifications.clone()),
        });

        let addr = SocketAddr::new(self.config.rpc_bind, self.config.rpc_port);
        let rpc_server = RpcServer::bind(addr, rpc_state)
            .await
            .map_err(|e| NodeError::Rpc(e.to_string()))?;
        self.rpc_addr = Some(
            rpc_server
                .local_addr()
                .map_err(|e| NodeError::Rpc(e.to_string()))?,
        );

        let mut shutdown_rx_rpc = self.shutdown.subscribe();
        self.task_handles.push(tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx_rpc.recv().await;
            };
            if let Err(e) = rpc_server.serve(shutdown).await {
                tracing::error!(error = %e, "RPC server exited with error");
            }
        }));

        let dispatcher = Dispatcher::new(
            self.store.clone(),
            EligibilityPolicy::new(self.config.cooldown()),
            ActionInvoker::new(ports.like_api, self.config.like_api_timeout()),
            ports.notifier,
            ports.clock,
            DispatcherConfig {
                poll_interval: self.config.poll_interval(),
                purge_interval: self.config.purge_interval(),
            },
        )
        .with_metrics(self.metrics.clone());
        let shutdown_rx_dispatch = self.shutdown.subscribe();
        self.task_handles
            .push(tokio::spawn(dispatcher.run(shutdown_rx_dispatch)));

        tracing::info!(rpc_addr = ?self.rpc_addr, "LikeGate node started");
        Ok(())
    }

    /// Signal every task and wait for them, up to a timeout.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("LikeGate node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
            return Err(NodeError::ShutdownTimeout);
        }

        if let Err(e) = self.store.env().force_sync() {
            tracing::warn!(error = %e, "failed to flush store");
        }
        tracing::info!("LikeGate node stopped");
        Ok(())
    }
}
