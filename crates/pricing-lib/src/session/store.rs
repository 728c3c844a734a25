//! In-memory session store
//!
//! Sessions are keyed by id in a concurrent map. Every access to a session
//! goes through that entry's exclusive guard, so a submission is atomic
//! with respect to its own session and sessions never observe each other.

use super::{Session, SessionView};
use crate::observability::PricingMetrics;
use crate::predictor::Artifact;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

/// Idle time after which a session is evicted (1 hour)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Concurrent map of live sessions
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
    metrics: PricingMetrics,
}

impl SessionStore {
    pub fn new(ttl: Duration, metrics: PricingMetrics) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            metrics,
        }
    }

    /// Open a new idle session, optionally with an artifact already attached
    pub fn create(&self, artifact: Option<Arc<Artifact>>) -> SessionView {
        let mut session = Session::new();
        if let Some(artifact) = artifact {
            session.attach_artifact(artifact);
        }
        let view = session.view();
        self.sessions.insert(session.id(), session);
        self.update_gauge();
        debug!(session_id = %view.id, "Session created");
        view
    }

    /// Run `f` with exclusive access to one session. `None` if it does not exist.
    pub fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut entry = self.sessions.get_mut(&id)?;
        Some(f(entry.value_mut()))
    }

    pub fn view(&self, id: Uuid) -> Option<SessionView> {
        self.sessions.get(&id).map(|s| s.view())
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            self.update_gauge();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than the configured TTL
    pub fn evict_idle(&self) -> usize {
        let ttl = match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => ttl,
            Err(_) => return 0,
        };
        let cutoff = chrono::Utc::now() - ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.last_active() >= cutoff);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            self.update_gauge();
        }
        evicted
    }

    /// Periodically evict idle sessions until shutdown
    pub async fn run_sweeper(
        self: Arc<Self>,
        every: Duration,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) {
        info!(
            interval_secs = every.as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "Starting session sweeper"
        );

        let mut ticker = interval(every);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.evict_idle();
                    if evicted > 0 {
                        info!(evicted = evicted, remaining = self.len(), "Evicted idle sessions");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down session sweeper");
                    break;
                }
            }
        }
    }

    fn update_gauge(&self) {
        self.metrics.set_sessions_active(self.sessions.len() as i64);
    }
}
