//! Auth state record and its in-order broadcast.
//!
//! The holder keeps one [`SessionSnapshot`] and pushes every replacement to
//! every subscriber. Each subscriber has its own unbounded queue, so a slow
//! reader never causes intermediate transitions (such as the `is_loading`
//! step of a login) to be dropped or merged.

use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::models::User;

// ============================================================================
// State types
// ============================================================================

/// The session record observed by guards, the HTTP layer and the UI.
///
/// Always replaced as a whole. The only way to build an authenticated state
/// is [`AuthState::authenticated`], which requires both a user and a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    is_authenticated: bool,
    user: Option<User>,
    token: Option<String>,
    is_loading: bool,
    error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

impl AuthState {
    /// Logged out, idle, no error.
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            token: None,
            is_loading: false,
            error: None,
        }
    }

    /// Logged out while a bootstrap or login/register call is in flight.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::unauthenticated()
        }
    }

    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            token: Some(token),
            is_loading: false,
            error: None,
        }
    }

    /// Logged out after a failed login/register.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::unauthenticated()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Progress of an explicit login/register, for form affordances only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Where the session stands relative to server confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Startup, before the persisted token has been looked at
    Bootstrapping,
    Unauthenticated,
    /// Trusted from the token's own claims; server check pending
    OptimisticallyAuthenticated,
    /// Confirmed by verify-token, login or register
    ConfirmedAuthenticated,
}

impl SessionPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionPhase::OptimisticallyAuthenticated | SessionPhase::ConfirmedAuthenticated
        )
    }
}

/// One published transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub phase: SessionPhase,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            state: AuthState::loading(),
            phase: SessionPhase::Bootstrapping,
        }
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Ordered stream of published values. Starts with the value current at
/// subscription time.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Next value, waiting if none is queued. `None` once the holder is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next queued value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            out.push(value);
        }
        out
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

struct Subscribers<T> {
    senders: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> Subscribers<T> {
    fn new() -> Self {
        Self {
            senders: Vec::new(),
        }
    }

    fn add(&mut self, current: T) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Cannot fail: the receiver is still in scope
        let _ = tx.send(current);
        self.senders.push(tx);
        Subscription { rx }
    }

    fn publish(&mut self, value: &T) {
        self.senders.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

// ============================================================================
// Holder
// ============================================================================

struct Inner {
    snapshot: SessionSnapshot,
    loading: LoadingState,
    state_subscribers: Subscribers<SessionSnapshot>,
    loading_subscribers: Subscribers<LoadingState>,
}

/// Owner of the current [`SessionSnapshot`] and [`LoadingState`].
///
/// Writes are crate-private; only the session coordinator mutates it.
pub struct StateHolder {
    inner: Mutex<Inner>,
    bootstrapped: watch::Sender<bool>,
}

impl Default for StateHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHolder {
    pub fn new() -> Self {
        let (bootstrapped, _) = watch::channel(false);
        Self {
            inner: Mutex::new(Inner {
                snapshot: SessionSnapshot::initial(),
                loading: LoadingState::Idle,
                state_subscribers: Subscribers::new(),
                loading_subscribers: Subscribers::new(),
            }),
            bootstrapped,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the snapshot half
        // written, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ----- read projections -----

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn state(&self) -> AuthState {
        self.lock().snapshot.state.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().snapshot.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().snapshot.state.is_authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().snapshot.state.user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().snapshot.state.token.clone()
    }

    pub fn loading_state(&self) -> LoadingState {
        self.lock().loading
    }

    pub fn subscribe(&self) -> Subscription<SessionSnapshot> {
        let mut inner = self.lock();
        let current = inner.snapshot.clone();
        inner.state_subscribers.add(current)
    }

    pub fn subscribe_loading(&self) -> Subscription<LoadingState> {
        let mut inner = self.lock();
        let current = inner.loading;
        inner.loading_subscribers.add(current)
    }

    // ----- bootstrap latch -----

    pub fn is_bootstrapped(&self) -> bool {
        *self.bootstrapped.borrow()
    }

    /// Resolves once bootstrap has decided the initial state.
    pub async fn wait_bootstrapped(&self) {
        let mut rx = self.bootstrapped.subscribe();
        // Only errors if the sender is dropped, which cannot happen while
        // `self` is borrowed.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub(crate) fn mark_bootstrapped(&self) {
        self.bootstrapped.send_replace(true);
    }

    // ----- writes -----

    /// Replace the whole record and publish it.
    pub(crate) fn set_state(&self, state: AuthState, phase: SessionPhase) {
        debug_assert!(
            !state.is_authenticated || (state.user.is_some() && state.token.is_some()),
            "authenticated state without user or token"
        );
        let mut inner = self.lock();
        inner.snapshot = SessionSnapshot { state, phase };
        trace!(
            phase = ?inner.snapshot.phase,
            authenticated = inner.snapshot.state.is_authenticated,
            loading = inner.snapshot.state.is_loading,
            "Publishing auth state"
        );
        let snapshot = inner.snapshot.clone();
        inner.state_subscribers.publish(&snapshot);
    }

    pub(crate) fn set_loading_state(&self, loading: LoadingState) {
        let mut inner = self.lock();
        inner.loading = loading;
        inner.loading_subscribers.publish(&loading);
    }
}
