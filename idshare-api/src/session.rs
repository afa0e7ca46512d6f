//! Bearer-token sessions

use idshare_core::core_disclosure::{Account, Caller, Principal};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Session {
    caller: Caller,
    expires_at: Instant,
}

impl Session {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Manages active sessions, keyed by token
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a new token for `account`
    pub async fn create_session(&self, account: &Account) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| !session.is_expired(now));
        sessions.insert(
            token.clone(),
            Session {
                caller: Caller::new(account.id, account.username.clone()),
                expires_at: now + self.ttl,
            },
        );
        tracing::debug!(user = %account.id, active = sessions.len(), "Session created");

        token
    }

    /// Resolve a token to a principal; unknown or expired tokens are anonymous
    pub async fn resolve(&self, token: &str) -> Principal {
        let now = Instant::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if !session.is_expired(now) => {
                    return Principal::Authenticated(session.caller.clone());
                }
                Some(_) => {}
                None => return Principal::Anonymous,
            }
        }

        self.sessions.write().await.remove(token);
        Principal::Anonymous
    }

    /// Returns whether a session was removed
    pub async fn remove_session(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| !session.is_expired(now))
            .count()
    }
}
