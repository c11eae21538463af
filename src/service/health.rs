//! Health check logic
//!
//! This module provides health check functionality for the arena-room
//! coordinator, including readiness and liveness probes. The coordinator is
//! probed with a stats query; a coordinator that does not answer in time is
//! reported as unhealthy.

use crate::coordinator::{CoordinatorHandle, CoordinatorStats};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Default time allowed for the coordinator to answer a stats query
pub const DEFAULT_STATS_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value exported as `arena_room_health_status`
    pub fn as_gauge(self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Handles the health checks need from a running service
#[derive(Debug, Clone)]
pub struct ServiceProbe {
    service_name: String,
    coordinator: CoordinatorHandle,
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
    stats_timeout: Duration,
}

impl ServiceProbe {
    pub fn new(
        service_name: impl Into<String>,
        coordinator: CoordinatorHandle,
        is_running: Arc<RwLock<bool>>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            coordinator,
            is_running,
            started_at: Instant::now(),
            stats_timeout: DEFAULT_STATS_TIMEOUT,
        }
    }

    pub fn with_stats_timeout(mut self, stats_timeout: Duration) -> Self {
        self.stats_timeout = stats_timeout;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Ask the coordinator for its stats, bounded by the probe timeout
    pub async fn coordinator_stats(&self) -> Result<CoordinatorStats> {
        match tokio::time::timeout(self.stats_timeout, self.coordinator.stats()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "Coordinator did not answer within {}ms",
                self.stats_timeout.as_millis()
            )),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Connections waiting for an opponent
    pub players_waiting: usize,
    /// Sessions currently in the registry
    pub active_sessions: usize,
    /// Open real-time connections
    pub connections: usize,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(probe: &ServiceProbe) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(probe).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        let (coordinator_check, coordinator_stats) = Self::check_coordinator(probe).await;
        if coordinator_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(coordinator_check);

        let stats = coordinator_stats
            .map(|stats| ServiceStats {
                players_waiting: stats.queued,
                active_sessions: stats.active_sessions,
                connections: stats.connections,
                uptime_seconds: probe.uptime().as_secs(),
            })
            .unwrap_or_else(|| ServiceStats {
                uptime_seconds: probe.uptime().as_secs(),
                ..ServiceStats::default()
            });

        Ok(HealthCheck {
            status: overall_status,
            service: probe.service_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(probe: &ServiceProbe) -> Result<HealthStatus> {
        if probe.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - the coordinator must answer
    pub async fn readiness_check(probe: &ServiceProbe) -> Result<HealthStatus> {
        if !probe.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        let (check, _) = Self::check_coordinator(probe).await;
        Ok(check.status)
    }

    async fn check_service_running(probe: &ServiceProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if probe.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_coordinator(probe: &ServiceProbe) -> (ComponentCheck, Option<CoordinatorStats>) {
        let start = Instant::now();

        let (status, message, stats) = match probe.coordinator_stats().await {
            Ok(stats) => {
                debug!(
                    "Coordinator stats - queued: {}, active_sessions: {}, connections: {}",
                    stats.queued, stats.active_sessions, stats.connections
                );
                (HealthStatus::Healthy, None, Some(stats))
            }
            Err(e) => {
                error!("Coordinator health check failed: {}", e);
                (HealthStatus::Unhealthy, Some(e.to_string()), None)
            }
        };

        (
            ComponentCheck {
                name: "coordinator".to_string(),
                status,
                message,
                duration_ms: start.elapsed().as_millis() as u64,
            },
            stats,
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchmakingSettings;
    use crate::coordinator::Coordinator;
    use crate::metrics::MetricsCollector;
    use crate::store::InMemoryGameStore;

    fn spawn_probe(running: bool) -> ServiceProbe {
        let (handle, _task) = Coordinator::spawn(
            Arc::new(InMemoryGameStore::new()),
            MatchmakingSettings::default(),
            Arc::new(MetricsCollector::new().unwrap()),
            16,
        )
        .unwrap();
        ServiceProbe::new("arena-room", handle, Arc::new(RwLock::new(running)))
    }

    #[tokio::test]
    async fn test_healthy_when_coordinator_answers() {
        let probe = spawn_probe(true);

        let health = HealthCheck::check(&probe).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.service, "arena-room");
        assert_eq!(health.checks.len(), 2);
        assert_eq!(health.stats.active_sessions, 0);

        assert_eq!(
            HealthCheck::readiness_check(&probe).await.unwrap(),
            HealthStatus::Healthy
        );
        assert!(health.to_json().unwrap().contains("coordinator"));
    }

    #[tokio::test]
    async fn test_not_running_is_unhealthy() {
        let probe = spawn_probe(false);

        assert_eq!(
            HealthCheck::liveness_check(&probe).await.unwrap(),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthCheck::readiness_check(&probe).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_stopped_coordinator_is_unhealthy() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let handle = CoordinatorHandle::new(tx);
        let probe = ServiceProbe::new("arena-room", handle, Arc::new(RwLock::new(true)))
            .with_stats_timeout(Duration::from_millis(50));

        let health = HealthCheck::check(&probe).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.checks[1].message.is_some());
    }

    #[tokio::test]
    async fn test_unresponsive_coordinator_times_out() {
        // Nobody reads the channel, so the stats reply never arrives
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let handle = CoordinatorHandle::new(tx);
        let probe = ServiceProbe::new("arena-room", handle, Arc::new(RwLock::new(true)))
            .with_stats_timeout(Duration::from_millis(50));

        assert_eq!(
            HealthCheck::readiness_check(&probe).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_gauge_values() {
        assert_eq!(HealthStatus::Healthy.as_gauge(), 2);
        assert_eq!(HealthStatus::Degraded.as_gauge(), 1);
        assert_eq!(HealthStatus::Unhealthy.as_gauge(), 0);
    }
}
