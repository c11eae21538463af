//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the arena-room coordinator:
//! inbound traffic, session lifecycle, queue behaviour and settlement cost.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the coordinator
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Session lifecycle metrics
    session_metrics: SessionMetrics,

    /// Player and queue metrics
    player_metrics: PlayerMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Inbound client events by type
    pub messages_total: IntCounterVec,

    /// Frames that could not be parsed
    pub malformed_messages_total: IntCounter,

    /// Open real-time connections
    pub connections: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Session lifecycle metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Sessions currently in the registry
    pub active_sessions: IntGauge,

    /// Sessions created, by origin (match or rematch)
    pub sessions_created_total: IntCounterVec,

    /// Sessions settled, by reason (game_over or forfeit)
    pub sessions_settled_total: IntCounterVec,

    /// Sessions ended by a lost connection
    pub sessions_abandoned_total: IntCounter,

    /// Completion signals that arrived after settlement
    pub duplicate_settlements_total: IntCounter,

    /// Wall time from creation to termination
    pub session_duration_seconds: Histogram,
}

/// Player and queue metrics
#[derive(Clone)]
pub struct PlayerMetrics {
    /// Connections waiting for an opponent
    pub players_waiting: IntGauge,

    /// Time spent in the queue before pairing
    pub queue_wait_time_seconds: Histogram,

    /// Match requests by result (queued, matched, rejected)
    pub match_requests_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Settlement duration including persistence
    pub settlement_duration: Histogram,

    /// Coordinator command handling time
    pub command_duration: HistogramVec,

    /// Durable store failures by operation
    pub store_errors_total: IntCounterVec,

    /// Absolute rating transfer per settled game
    pub rating_delta: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;
        let player_metrics = PlayerMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            session_metrics,
            player_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn player(&self) -> &PlayerMetrics {
        &self.player_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record an inbound client event
    pub fn record_message(&self, event: &str) {
        self.service_metrics
            .messages_total
            .with_label_values(&[event])
            .inc();
    }

    pub fn record_malformed_message(&self) {
        self.service_metrics.malformed_messages_total.inc();
    }

    pub fn record_connection_opened(&self) {
        self.service_metrics.connections.inc();
    }

    pub fn record_connection_closed(&self) {
        self.service_metrics.connections.dec();
    }

    /// Record the outcome of a `find-match`
    pub fn record_match_request(&self, result: &str) {
        self.player_metrics
            .match_requests_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a session entering the registry
    pub fn record_session_created(&self, origin: &str, queue_wait: Option<Duration>) {
        self.session_metrics
            .sessions_created_total
            .with_label_values(&[origin])
            .inc();
        self.session_metrics.active_sessions.inc();

        if let Some(wait) = queue_wait {
            self.player_metrics
                .queue_wait_time_seconds
                .observe(wait.as_secs_f64());
        }
    }

    /// Record a session settled with a result
    pub fn record_session_settled(&self, reason: &str, lifetime: Duration, rating_delta: i32) {
        self.session_metrics
            .sessions_settled_total
            .with_label_values(&[reason])
            .inc();
        self.session_metrics.active_sessions.dec();
        self.session_metrics
            .session_duration_seconds
            .observe(lifetime.as_secs_f64());
        self.performance_metrics
            .rating_delta
            .observe(f64::from(rating_delta.abs()));
    }

    /// Record a session ended by disconnection
    pub fn record_session_abandoned(&self, lifetime: Duration) {
        self.session_metrics.sessions_abandoned_total.inc();
        self.session_metrics.active_sessions.dec();
        self.session_metrics
            .session_duration_seconds
            .observe(lifetime.as_secs_f64());
    }

    pub fn record_duplicate_settlement(&self) {
        self.session_metrics.duplicate_settlements_total.inc();
    }

    /// Refresh queue depth
    pub fn update_players_waiting(&self, waiting: usize) {
        self.player_metrics.players_waiting.set(waiting as i64);
    }

    pub fn record_settlement(&self, duration: Duration) {
        self.performance_metrics
            .settlement_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_command(&self, command: &str, duration: Duration) {
        self.performance_metrics
            .command_duration
            .with_label_values(&[command])
            .observe(duration.as_secs_f64());
    }

    /// Record a failed durable store call
    pub fn record_store_error(&self, operation: &str) {
        self.performance_metrics
            .store_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("arena_room_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let messages_total = IntCounterVec::new(
            Opts::new(
                "arena_room_messages_total",
                "Inbound client events processed",
            ),
            &["event"],
        )?;
        registry.register(Box::new(messages_total.clone()))?;

        let malformed_messages_total = IntCounter::new(
            "arena_room_malformed_messages_total",
            "Inbound frames that failed to parse",
        )?;
        registry.register(Box::new(malformed_messages_total.clone()))?;

        let connections = IntGauge::new("arena_room_connections", "Open real-time connections")?;
        registry.register(Box::new(connections.clone()))?;

        let health_status = IntGauge::new(
            "arena_room_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            messages_total,
            malformed_messages_total,
            connections,
            health_status,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_sessions =
            IntGauge::new("arena_room_active_sessions", "Sessions currently playing")?;
        registry.register(Box::new(active_sessions.clone()))?;

        let sessions_created_total = IntCounterVec::new(
            Opts::new("arena_room_sessions_created_total", "Total sessions created"),
            &["origin"],
        )?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let sessions_settled_total = IntCounterVec::new(
            Opts::new("arena_room_sessions_settled_total", "Total sessions settled"),
            &["reason"],
        )?;
        registry.register(Box::new(sessions_settled_total.clone()))?;

        let sessions_abandoned_total = IntCounter::new(
            "arena_room_sessions_abandoned_total",
            "Total sessions abandoned on disconnect",
        )?;
        registry.register(Box::new(sessions_abandoned_total.clone()))?;

        let duplicate_settlements_total = IntCounter::new(
            "arena_room_duplicate_settlements_total",
            "Completion signals ignored because the session was already settled",
        )?;
        registry.register(Box::new(duplicate_settlements_total.clone()))?;

        let session_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "arena_room_session_duration_seconds",
                "Session lifetime in seconds",
            )
            .buckets(vec![10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
        )?;
        registry.register(Box::new(session_duration_seconds.clone()))?;

        Ok(Self {
            active_sessions,
            sessions_created_total,
            sessions_settled_total,
            sessions_abandoned_total,
            duplicate_settlements_total,
            session_duration_seconds,
        })
    }
}

impl PlayerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_waiting = IntGauge::new(
            "arena_room_players_waiting",
            "Connections waiting for an opponent",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let queue_wait_time_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "arena_room_queue_wait_time_seconds",
                "Time spent waiting for an opponent",
            )
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(queue_wait_time_seconds.clone()))?;

        let match_requests_total = IntCounterVec::new(
            Opts::new("arena_room_match_requests_total", "Match requests by result"),
            &["result"],
        )?;
        registry.register(Box::new(match_requests_total.clone()))?;

        Ok(Self {
            players_waiting,
            queue_wait_time_seconds,
            match_requests_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let settlement_duration = Histogram::with_opts(
            HistogramOpts::new(
                "arena_room_settlement_duration_seconds",
                "Settlement time including persistence",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(settlement_duration.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new(
                "arena_room_command_duration_seconds",
                "Coordinator command handling time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let store_errors_total = IntCounterVec::new(
            Opts::new("arena_room_store_errors_total", "Durable store failures"),
            &["operation"],
        )?;
        registry.register(Box::new(store_errors_total.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new(
                "arena_room_rating_delta",
                "Absolute rating transfer per settled game",
            )
            .buckets(vec![1.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        Ok(Self {
            settlement_duration,
            command_duration,
            store_errors_total,
            rating_delta,
        })
    }
}
