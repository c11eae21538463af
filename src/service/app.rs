//! Main application state and service coordination
//!
//! This module contains the production AppState that owns the durable store,
//! the coordinator task, the WebSocket listener, the health server and the
//! background tasks.

use crate::config::AppConfig;
use crate::coordinator::{Coordinator, CoordinatorHandle};
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector, MetricsService};
use crate::service::health::{HealthCheck, ServiceProbe};
use crate::store::{GameStore, InMemoryGameStore};
use crate::transport::{self, TransportState};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to bind {address}: {message}")]
    Bind { address: String, message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    /// Durable records for users, games and chat
    store: Arc<dyn GameStore>,

    /// Sender side of the coordinator task
    coordinator: CoordinatorHandle,
    coordinator_task: Option<JoinHandle<()>>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    probe: ServiceProbe,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Address the WebSocket listener is bound to once started
    local_addr: Option<SocketAddr>,

    /// Stops the WebSocket listener
    shutdown_tx: broadcast::Sender<()>,

    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with the in-memory store
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_store(config, Arc::new(InMemoryGameStore::new())).await
    }

    /// Initialize the application around an existing store
    pub async fn with_store(
        config: AppConfig,
        store: Arc<dyn GameStore>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing arena-room coordinator service");
        info!(
            "Configuration: service={}, listen={}:{}, health_port={}",
            config.service.name, config.server.host, config.server.port, config.service.health_port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let (coordinator, coordinator_task) = Coordinator::spawn(
            store.clone(),
            config.matchmaking.clone(),
            metrics_collector.clone(),
            config.server.command_buffer,
        )
        .map_err(|e| ServiceError::Initialization {
            message: format!("Failed to start coordinator: {}", e),
        })?;

        let is_running = Arc::new(RwLock::new(false));
        let probe = ServiceProbe::new(
            config.service.name.clone(),
            coordinator.clone(),
            is_running.clone(),
        );

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: config.server.host.clone(),
        };
        let health_server = Arc::new(
            HealthServer::new(health_config, metrics_collector.clone()).with_probe(probe.clone()),
        );
        let metrics_service = Arc::new(MetricsService::new(metrics_collector, health_server));

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            store,
            coordinator,
            coordinator_task: Some(coordinator_task),
            metrics_service,
            probe,
            background_tasks: Vec::new(),
            local_addr: None,
            shutdown_tx,
            is_running,
        })
    }

    /// Bind the listeners and start background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting arena-room coordinator service");

        *self.is_running.write().await = true;

        self.start_metrics_service().await?;
        self.start_transport().await?;
        self.start_background_tasks();

        info!("✅ Arena-room coordinator service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of arena-room service");

        *self.is_running.write().await = false;

        if self.shutdown_tx.send(()).is_err() {
            debug!("WebSocket listener was not running");
        } else {
            info!("✅ WebSocket listener stopped accepting connections");
        }

        self.stop_background_tasks().await;

        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        let final_stats =
            self.probe
                .coordinator_stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;
        info!("Final service statistics: {:?}", final_stats);

        // Socket tasks may still hold handles, so the loop is stopped directly
        if let Some(task) = self.coordinator_task.take() {
            task.abort();
        }

        info!("✅ Arena-room service shutdown completed");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn coordinator(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    pub fn store(&self) -> Arc<dyn GameStore> {
        self.store.clone()
    }

    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Health probe shared with the health server
    pub fn probe(&self) -> ServiceProbe {
        self.probe.clone()
    }

    /// Address of the WebSocket listener, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {:#}", e);
            } else {
                info!("Metrics service task completed");
            }
        });
        self.background_tasks.push(metrics_handle);

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Bind `/ws` and serve it until shutdown
    async fn start_transport(&mut self) -> Result<(), ServiceError> {
        let address = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::Bind {
                address: address.clone(),
                message: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServiceError::Bind {
            address: address.clone(),
            message: e.to_string(),
        })?;
        self.local_addr = Some(local_addr);

        let app = transport::router(TransportState {
            coordinator: self.coordinator.clone(),
            metrics: self.metrics_service.collector(),
        });
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let server_task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    info!("WebSocket listener shutdown signal received");
                })
                .await;
            if let Err(e) = result {
                error!("WebSocket listener failed: {}", e);
            }
        });
        self.background_tasks.push(server_task);

        info!("✅ WebSocket endpoint listening on ws://{}/ws", local_addr);
        Ok(())
    }

    fn start_background_tasks(&mut self) {
        info!("Starting health metrics task (30s interval)...");
        let health_metrics_task = {
            let metrics_collector = self.metrics_service.collector();
            let probe = self.probe.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                info!("Health metrics task started");

                while probe.is_running().await {
                    interval.tick().await;

                    metrics_collector.update_uptime(probe.uptime());
                    match HealthCheck::check(&probe).await {
                        Ok(health) => {
                            debug!(
                                "Updated service health metrics - status: {}, waiting: {}, sessions: {}",
                                health.status,
                                health.stats.players_waiting,
                                health.stats.active_sessions
                            );
                            metrics_collector.update_health_status(health.status.as_gauge());
                        }
                        Err(e) => {
                            warn!("Health metrics update failed: {}", e);
                            metrics_collector.update_health_status(0);
                        }
                    }
                }

                info!("Health metrics task stopped");
            })
        };
        self.background_tasks.push(health_metrics_task);

        info!(
            "{} background tasks running",
            self.background_tasks.len()
        );
    }

    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        // Give the listeners a moment to drain after the shutdown signal
        tokio::time::sleep(Duration::from_millis(100)).await;
        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
