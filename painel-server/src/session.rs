//! Per-user session context
//!
//! A login opens a session keyed by a random token; every protected request
//! resolves its token back to the session and reads the entity code from it.
//! A session ends on logout or once it has gone unused for the idle timeout.
//! Expired sessions are dropped when looked up and swept whenever a new one
//! is opened, so abandoned logins do not accumulate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use painel_common::{EntityCode, EntityKind};

/// State of one logged-in user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionContext {
    #[serde(skip)]
    pub token: Uuid,
    #[serde(rename = "codigo")]
    pub entity: EntityCode,
    #[serde(rename = "tipo")]
    pub kind: EntityKind,
    pub logged_in_at: DateTime<Utc>,
    #[serde(skip)]
    last_seen: Instant,
}

impl SessionContext {
    fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.duration_since(self.last_seen) >= idle_timeout
    }
}

/// In-memory session registry shared by all handlers
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub async fn open(&self, entity: EntityCode, kind: EntityKind) -> SessionContext {
        let now = Instant::now();
        let session = SessionContext {
            token: Uuid::new_v4(),
            entity,
            kind,
            logged_in_at: Utc::now(),
            last_seen: now,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.idle_timeout));
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "Swept idle sessions");
        }
        sessions.insert(session.token, session.clone());
        session
    }

    /// Live session for `token`, refreshing its idle timer
    pub async fn get(&self, token: &Uuid) -> Option<SessionContext> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if sessions.get(token)?.is_expired(now, self.idle_timeout) {
            sessions.remove(token);
            return None;
        }

        let session = sessions.get_mut(token)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// Remove a session; false if it was not open
    pub async fn close(&self, token: &Uuid) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Number of stored sessions, expired ones not yet swept included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
