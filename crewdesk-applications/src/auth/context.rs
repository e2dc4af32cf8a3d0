//! Signed-in session state shared by the client views
//!
//! Session-lifetime belief about who is signed in and with which role. It drives
//! UI gating only; every authorization decision is re-derived server-side from
//! the token.
//!
//! State is published as immutable [`AuthSnapshot`] values through a `watch`
//! channel. [`AuthContext::on_token_changed`] is the single update entry point.
//! A generation counter, bumped on every token change, lets late results (claim
//! resolution or a refresh finishing after sign-out) detect that they are stale
//! and drop themselves.

use super::identity::{IdentityProvider, IdentityRecord};
use super::roles::{is_authorized, AllowSet, Role};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Base identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
}

impl From<&IdentityRecord> for SessionUser {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            uid: record.uid.clone(),
            email: record.email.clone(),
            email_verified: record.email_verified,
        }
    }
}

/// Immutable view handed to consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<SessionUser>,
    pub role: Role,
}

impl AuthSnapshot {
    pub fn signed_out() -> Self {
        Self {
            user: None,
            role: Role::Public,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// UI capability check. Never use this for an access decision.
    pub fn can_see(&self, allowed: &AllowSet) -> bool {
        self.is_signed_in() && is_authorized(self.role, allowed)
    }
}

/// Token change notification, as raised by the identity provider client
#[derive(Debug, Clone)]
pub struct IdTokenEvent {
    pub user: SessionUser,
    pub token: String,
}

/// Client-side cookie jar holding the session cookie
pub trait SessionCookieStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
    fn remove(&self, name: &str);
}

/// Cookie jar kept in memory
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: RwLock<HashMap<String, String>>,
}

impl SessionCookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.cookies
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), value.to_string());
    }

    fn remove(&self, name: &str) {
        self.cookies
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
    }
}

/// Session state store; publishes an [`AuthSnapshot`] on every token change
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    cookies: Arc<dyn SessionCookieStore>,
    cookie_name: String,
    generation: AtomicU64,
    /// Current raw token; also serialises publication of new snapshots
    token: Mutex<Option<String>>,
    state: watch::Sender<AuthSnapshot>,
}

impl AuthContext {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        cookies: Arc<dyn SessionCookieStore>,
        cookie_name: impl Into<String>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(AuthSnapshot::signed_out());
        Arc::new(Self {
            provider,
            cookies,
            cookie_name: cookie_name.into(),
            generation: AtomicU64::new(0),
            token: Mutex::new(None),
            state,
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Raw token currently mirrored into the session cookie
    pub fn current_token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Single update entry point for login, logout and external invalidation
    pub async fn on_token_changed(&self, event: Option<IdTokenEvent>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.apply(generation, event).await;
    }

    /// Sign in through the identity provider and publish the result
    pub async fn sign_in(&self, email: &str, password: &str) -> super::IdentityResult<()> {
        let signed_in = self.provider.sign_in(email, password).await?;
        self.on_token_changed(Some(IdTokenEvent {
            user: SessionUser::from(&signed_in.user),
            token: signed_in.token,
        }))
        .await;
        Ok(())
    }

    pub async fn sign_out(&self) {
        self.on_token_changed(None).await;
    }

    /// Force a token refresh if a user is signed in. A result that arrives after
    /// any other token change is discarded.
    pub async fn refresh_now(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        let user = self.snapshot().user;
        let (Some(user), Some(token)) = (user, self.current_token()) else {
            return;
        };

        let fresh = match self.provider.refresh_token(&token).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(uid = %user.uid, "Token refresh failed: {}", e);
                return;
            }
        };

        let next = generation + 1;
        if self
            .generation
            .compare_exchange(generation, next, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(uid = %user.uid, "Discarding refresh result after token change");
            return;
        }

        self.apply(next, Some(IdTokenEvent { user, token: fresh })).await;
    }

    /// Start the periodic refresh task. The task stops when the returned handle
    /// is cancelled or dropped, or when the context itself is dropped.
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> RefreshHandle {
        let context: Weak<AuthContext> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(context) = context.upgrade() else {
                    break;
                };
                context.refresh_now().await;
            }
        });
        RefreshHandle { task: Some(task) }
    }

    async fn apply(&self, generation: u64, event: Option<IdTokenEvent>) {
        let Some(IdTokenEvent { user, token }) = event else {
            let mut current = self.token.lock().unwrap_or_else(|e| e.into_inner());
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            *current = None;
            self.cookies.set(&self.cookie_name, "");
            self.cookies.remove(&self.cookie_name);
            self.state.send_replace(AuthSnapshot::signed_out());
            info!("Signed out, session cleared");
            return;
        };

        let role = match self.provider.verify_token(&token).await {
            Ok(claims) => claims.role(),
            Err(e) => {
                warn!(uid = %user.uid, "Claim resolution failed, falling back to public: {}", e);
                Role::Public
            }
        };

        let mut current = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(uid = %user.uid, "Dropping stale claim resolution");
            return;
        }
        *current = Some(token.clone());
        self.cookies.set(&self.cookie_name, &token);
        debug!(uid = %user.uid, %role, "Auth context updated");
        self.state.send_replace(AuthSnapshot {
            user: Some(user),
            role,
        });
    }
}

/// Handle to the background refresh task
#[derive(Debug)]
pub struct RefreshHandle {
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn cancel(mut self) {
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
