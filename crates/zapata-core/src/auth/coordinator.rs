//! Session coordinator: the only writer of auth state.
//!
//! Startup runs an optimistic bootstrap: a locally valid persisted token is
//! trusted immediately (so guards do not bounce the user to the login screen)
//! and confirmed against `/verify-token` in the background.
//!
//! ```text
//! no token ─────────────────────────────► Unauthenticated
//! token, malformed/expired ─────────────► Unauthenticated (store cleared)
//! token, locally valid ─► OptimisticallyAuthenticated ─┬► ConfirmedAuthenticated
//!                                                      └► Unauthenticated
//! ```
//!
//! Verification is not cancelled by a later logout. A rejection that lands
//! after a logout just clears the already empty store again; a success that
//! lands after a logout re-authenticates the user. The latter is logged with
//! a warning and left unresolved until the intended behaviour is decided.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::state::{AuthState, LoadingState, SessionPhase, SessionSnapshot, StateHolder, Subscription};
use super::store::TokenStore;
use super::token;
use super::AuthError;
use crate::api::{AuthApi, AuthSession};
use crate::models::{LoginRequest, RegisterRequest, User};

/// How often the expiry sweep looks at the held token.
pub const DEFAULT_EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct SessionCoordinator {
    state: StateHolder,
    store: TokenStore,
    api: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    bootstrap_started: AtomicBool,
}

impl SessionCoordinator {
    pub fn new(api: Arc<dyn AuthApi>, store: TokenStore) -> Arc<Self> {
        Self::with_clock(api, store, Arc::new(SystemClock))
    }

    pub fn with_clock(api: Arc<dyn AuthApi>, store: TokenStore, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            state: StateHolder::new(),
            store,
            api,
            clock,
            bootstrap_started: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Read projections
    // =========================================================================

    /// Read access to the state holder; writes stay with the coordinator.
    pub fn state(&self) -> &StateHolder {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.current_user()
    }

    pub fn current_token(&self) -> Option<String> {
        self.state.token()
    }

    pub fn loading_state(&self) -> LoadingState {
        self.state.loading_state()
    }

    pub fn subscribe(&self) -> Subscription<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn subscribe_loading(&self) -> Subscription<LoadingState> {
        self.state.subscribe_loading()
    }

    pub async fn wait_bootstrapped(&self) {
        self.state.wait_bootstrapped().await
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// Decide the initial state from the persisted token.
    ///
    /// Returns synchronously with the state already set. When the token was
    /// trusted optimistically, the returned handle is the background
    /// verification task. Must be called from within a tokio runtime.
    pub fn bootstrap(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.bootstrap_started.swap(true, Ordering::SeqCst) {
            warn!("Bootstrap already ran; ignoring");
            return None;
        }
        info!("Initializing auth state");

        let Some(stored) = self.store.load() else {
            debug!("No stored token");
            self.reset();
            self.state.mark_bootstrapped();
            return None;
        };

        let now = self.clock.now();
        let claims = match token::check(&stored, now.timestamp()) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(reason = %e, "Stored token rejected locally");
                self.reset();
                self.state.mark_bootstrapped();
                return None;
            }
        };

        info!(user_id = claims.id, "Stored token valid locally; verifying in background");
        self.state.set_state(
            AuthState::authenticated(claims.provisional_user(now), stored.clone()),
            SessionPhase::OptimisticallyAuthenticated,
        );
        self.state.mark_bootstrapped();

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            this.reconcile(stored).await;
        }))
    }

    async fn reconcile(&self, token: String) {
        match self.api.verify_token(&token).await {
            Ok(user) => {
                if self.phase() == SessionPhase::Unauthenticated {
                    warn!(
                        user_id = user.id,
                        "Token verified after the session was logged out; re-authenticating"
                    );
                }
                debug!(user_id = user.id, "Token confirmed by server");
                self.state.set_state(
                    AuthState::authenticated(user, token),
                    SessionPhase::ConfirmedAuthenticated,
                );
            }
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "Server rejected stored token; clearing session");
                self.reset();
            }
            Err(e) => {
                warn!(error = %e, "Could not verify stored token; clearing session");
                self.reset();
            }
        }
    }

    // =========================================================================
    // Expiry sweep
    // =========================================================================

    /// Log out if the held token has expired. Returns `true` when it did.
    pub fn sweep_expired(&self) -> bool {
        let Some(held) = self.state.token() else {
            return false;
        };
        if token::is_valid(&held, self.clock.unix_now()) {
            return false;
        }
        info!("Held token expired; logging out");
        self.logout();
        true
    }

    /// Run [`Self::sweep_expired`] now and then every `period`.
    ///
    /// The task stops on its own once the coordinator is dropped.
    pub fn spawn_expiry_sweep(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(this) => {
                        this.sweep_expired();
                    }
                    None => break,
                }
            }
            debug!("Expiry sweep stopped");
        })
    }

    // =========================================================================
    // Login / register / logout
    // =========================================================================

    pub async fn login(&self, request: &LoginRequest) -> Result<User, AuthError> {
        info!(email = %request.email, "Logging in");
        self.begin_auth_call();
        let result = self.api.login(request).await;
        self.finish_auth_call(result, "login")
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        info!(email = %request.email, "Registering");
        self.begin_auth_call();
        let result = self.api.register(request).await;
        self.finish_auth_call(result, "register")
    }

    fn begin_auth_call(&self) {
        self.state.set_loading_state(LoadingState::Loading);
        self.state
            .set_state(AuthState::loading(), SessionPhase::Unauthenticated);
    }

    fn finish_auth_call(
        &self,
        result: Result<AuthSession, AuthError>,
        operation: &'static str,
    ) -> Result<User, AuthError> {
        match result {
            Ok(AuthSession { token, user }) => {
                self.store.save(&token);
                self.state.set_state(
                    AuthState::authenticated(user.clone(), token),
                    SessionPhase::ConfirmedAuthenticated,
                );
                self.state.set_loading_state(LoadingState::Success);
                info!(operation, user_id = user.id, "Authentication succeeded");
                Ok(user)
            }
            Err(e) => {
                self.state.set_loading_state(LoadingState::Error);
                self.state
                    .set_state(AuthState::failed(e.user_message()), SessionPhase::Unauthenticated);
                error!(operation, error = %e, "Authentication failed");
                Err(e)
            }
        }
    }

    /// Drop the session locally. The server is not notified.
    pub fn logout(&self) {
        info!("Logging out");
        self.reset();
        self.state.set_loading_state(LoadingState::Idle);
    }

    /// Clear stored tokens and state without touching the loading state.
    pub fn clear_invalid_tokens(&self) {
        warn!("Forcing token cleanup");
        self.reset();
    }

    fn reset(&self) {
        self.store.clear();
        self.state
            .set_state(AuthState::unauthenticated(), SessionPhase::Unauthenticated);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::token::{encode_unsigned, Claims};

    const NOW: i64 = 1_700_000_000;

    type VerifyResult = Result<User, AuthError>;

    /// Scripted `AuthApi`. Verification either answers from a queue or
    /// waits on a oneshot the test resolves.
    #[derive(Default)]
    struct MockApi {
        auth_results: Mutex<VecDeque<Result<AuthSession, AuthError>>>,
        verify_results: Mutex<VecDeque<VerifyResult>>,
        verify_gate: Mutex<Option<oneshot::Receiver<VerifyResult>>>,
        verify_calls: Mutex<Vec<String>>,
    }

    impl MockApi {
        fn with_auth_result(result: Result<AuthSession, AuthError>) -> Self {
            let api = Self::default();
            api.auth_results.lock().unwrap().push_back(result);
            api
        }

        fn with_verify_result(result: VerifyResult) -> Self {
            let api = Self::default();
            api.verify_results.lock().unwrap().push_back(result);
            api
        }

        fn gated() -> (Self, oneshot::Sender<VerifyResult>) {
            let (tx, rx) = oneshot::channel();
            let api = Self::default();
            *api.verify_gate.lock().unwrap() = Some(rx);
            (api, tx)
        }

        fn verify_calls(&self) -> Vec<String> {
            self.verify_calls.lock().unwrap().clone()
        }

        fn next_auth(&self) -> Result<AuthSession, AuthError> {
            self.auth_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AuthError::InvalidResponse("unscripted".to_string())))
        }
    }

    #[async_trait]
    impl AuthApi for MockApi {
        async fn login(&self, _request: &LoginRequest) -> Result<AuthSession, AuthError> {
            self.next_auth()
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<AuthSession, AuthError> {
            self.next_auth()
        }

        async fn verify_token(&self, token: &str) -> Result<User, AuthError> {
            self.verify_calls.lock().unwrap().push(token.to_string());
            let gate = self.verify_gate.lock().unwrap().take();
            if let Some(rx) = gate {
                return rx
                    .await
                    .unwrap_or_else(|_| Err(AuthError::NetworkUnavailable("gate dropped".to_string())));
            }
            self.verify_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AuthError::InvalidResponse("unscripted".to_string())))
        }
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            email: "a@b.com".to_string(),
            name: name.to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    fn token_expiring_at(exp: i64) -> String {
        encode_unsigned(&Claims {
            id: 1,
            email: "a@b.com".to_string(),
            name: "A".to_string(),
            exp,
        })
    }

    fn rejected() -> AuthError {
        AuthError::RemoteRejected {
            status: 401,
            message: "Token expired or invalid".to_string(),
        }
    }

    fn setup(api: MockApi, stored: Option<&str>) -> (Arc<SessionCoordinator>, Arc<MockApi>, TokenStore, Arc<ManualClock>) {
        let api = Arc::new(api);
        let store = TokenStore::in_memory();
        if let Some(token) = stored {
            store.save(token);
        }
        let clock = Arc::new(ManualClock::new(NOW));
        let coordinator = SessionCoordinator::with_clock(api.clone(), store.clone(), clock.clone());
        (coordinator, api, store, clock)
    }

    // -------------------------------------------------------------------------
    // Bootstrap
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_bootstrap_without_token() {
        let (coordinator, api, _store, _clock) = setup(MockApi::default(), None);
        assert!(coordinator.snapshot().state.is_loading());

        let handle = coordinator.bootstrap();

        assert!(handle.is_none());
        let snapshot = coordinator.snapshot();
        assert!(!snapshot.state.is_authenticated());
        assert!(!snapshot.state.is_loading());
        assert_eq!(snapshot.phase, SessionPhase::Unauthenticated);
        assert!(coordinator.state().is_bootstrapped());
        assert!(api.verify_calls().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_with_expired_token() {
        let expired = token_expiring_at(NOW - 1);
        let (coordinator, api, store, _clock) = setup(MockApi::default(), Some(&expired));

        assert!(coordinator.bootstrap().is_none());

        assert!(!coordinator.is_authenticated());
        assert!(!coordinator.snapshot().state.is_loading());
        assert_eq!(store.load(), None);
        assert!(api.verify_calls().is_empty());
        assert!(coordinator.state().is_bootstrapped());
    }

    #[tokio::test]
    async fn test_bootstrap_with_malformed_token() {
        let (coordinator, api, store, _clock) = setup(MockApi::default(), Some("garbage"));

        assert!(coordinator.bootstrap().is_none());

        assert!(!coordinator.is_authenticated());
        assert_eq!(store.load(), None);
        assert!(api.verify_calls().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_trusts_valid_token_before_verification() {
        let stored = token_expiring_at(NOW + 600);
        let (api, gate) = MockApi::gated();
        let (coordinator, api, _store, _clock) = setup(api, Some(&stored));

        let handle = coordinator.bootstrap().expect("verification task");

        // Set synchronously, before any I/O resolved
        let snapshot = coordinator.snapshot();
        assert!(snapshot.state.is_authenticated());
        assert!(!snapshot.state.is_loading());
        assert_eq!(snapshot.phase, SessionPhase::OptimisticallyAuthenticated);
        assert_eq!(snapshot.state.token(), Some(stored.as_str()));
        let provisional = snapshot.state.user().expect("provisional user");
        assert_eq!(provisional.id, 1);
        assert_eq!(provisional.name, "A");
        assert!(provisional.created_at.is_some());
        assert!(coordinator.state().is_bootstrapped());

        gate.send(Ok(user(1, "Ana Server"))).unwrap();
        handle.await.unwrap();

        assert_eq!(api.verify_calls(), vec![stored.clone()]);
        assert_eq!(coordinator.phase(), SessionPhase::ConfirmedAuthenticated);
        assert_eq!(coordinator.current_user().map(|u| u.name), Some("Ana Server".to_string()));
        assert_eq!(coordinator.current_token(), Some(stored));
    }

    #[tokio::test]
    async fn test_bootstrap_verification_rejected() {
        let stored = token_expiring_at(NOW + 600);
        let (coordinator, _api, store, _clock) =
            setup(MockApi::with_verify_result(Err(rejected())), Some(&stored));
        let mut sub = coordinator.subscribe();

        let handle = coordinator.bootstrap().expect("verification task");
        let before: Vec<SessionPhase> = sub.drain().into_iter().map(|s| s.phase).collect();
        assert_eq!(
            before,
            vec![SessionPhase::Bootstrapping, SessionPhase::OptimisticallyAuthenticated]
        );

        handle.await.unwrap();

        let next = sub.try_recv().expect("broadcast after rejection");
        assert_eq!(next.state, AuthState::unauthenticated());
        assert_eq!(next.phase, SessionPhase::Unauthenticated);
        assert_eq!(store.load(), None);
        // Silent downgrade: no error surfaced
        assert_eq!(coordinator.snapshot().state.error(), None);
    }

    #[tokio::test]
    async fn test_bootstrap_network_failure_logs_out_without_retry() {
        let stored = token_expiring_at(NOW + 600);
        let (coordinator, api, store, _clock) = setup(
            MockApi::with_verify_result(Err(AuthError::NetworkUnavailable("down".to_string()))),
            Some(&stored),
        );

        coordinator.bootstrap().expect("verification task").await.unwrap();

        assert!(!coordinator.is_authenticated());
        assert_eq!(store.load(), None);
        assert_eq!(api.verify_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let (coordinator, _api, _store, _clock) = setup(MockApi::default(), None);
        assert!(coordinator.bootstrap().is_none());
        let mut sub = coordinator.subscribe();
        sub.drain();
        assert!(coordinator.bootstrap().is_none());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_late_verify_success_after_logout_reauthenticates() {
        let stored = token_expiring_at(NOW + 600);
        let (api, gate) = MockApi::gated();
        let (coordinator, _api, store, _clock) = setup(api, Some(&stored));

        let handle = coordinator.bootstrap().expect("verification task");
        coordinator.logout();
        assert!(!coordinator.is_authenticated());

        gate.send(Ok(user(1, "A"))).unwrap();
        handle.await.unwrap();

        // Known race: the late confirmation wins over the manual logout
        assert!(coordinator.is_authenticated());
        assert_eq!(coordinator.phase(), SessionPhase::ConfirmedAuthenticated);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_late_verify_rejection_after_logout_is_harmless() {
        let stored = token_expiring_at(NOW + 600);
        let (api, gate) = MockApi::gated();
        let (coordinator, _api, store, _clock) = setup(api, Some(&stored));

        let handle = coordinator.bootstrap().expect("verification task");
        coordinator.logout();

        gate.send(Err(rejected())).unwrap();
        handle.await.unwrap();

        assert_eq!(coordinator.snapshot().state, AuthState::unauthenticated());
        assert_eq!(store.load(), None);
    }

    // -------------------------------------------------------------------------
    // Login / register / logout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_success() {
        let session = AuthSession {
            token: "T".to_string(),
            user: user(1, "A"),
        };
        let (coordinator, _api, store, _clock) = setup(MockApi::with_auth_result(Ok(session)), None);
        coordinator.bootstrap();
        let mut states = coordinator.subscribe();
        let mut loading = coordinator.subscribe_loading();
        states.drain();
        loading.drain();

        let logged_in = coordinator
            .login(&LoginRequest::new("a@b.com", "x"))
            .await
            .expect("login");

        assert_eq!(logged_in.id, 1);
        let state = coordinator.snapshot().state;
        assert!(state.is_authenticated());
        assert_eq!(state.user().map(|u| u.id), Some(1));
        assert!(!state.is_loading());
        assert_eq!(store.load().as_deref(), Some("T"));
        assert_eq!(coordinator.loading_state(), LoadingState::Success);

        let seen = states.drain();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].state.is_loading());
        assert!(seen[1].state.is_authenticated());
        assert_eq!(loading.drain(), vec![LoadingState::Loading, LoadingState::Success]);
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_message() {
        let (coordinator, _api, store, _clock) = setup(
            MockApi::with_auth_result(Err(AuthError::RemoteRejected {
                status: 401,
                message: "Invalid credentials".to_string(),
            })),
            None,
        );
        coordinator.bootstrap();

        let err = coordinator
            .login(&LoginRequest::new("a@b.com", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::RemoteRejected { status: 401, .. }));
        let state = coordinator.snapshot().state;
        assert!(!state.is_authenticated());
        assert!(!state.is_loading());
        assert_eq!(state.error(), Some("Invalid credentials"));
        assert_eq!(coordinator.loading_state(), LoadingState::Error);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_register_success_persists_token() {
        let session = AuthSession {
            token: "R".to_string(),
            user: user(9, "New"),
        };
        let (coordinator, _api, store, _clock) = setup(MockApi::with_auth_result(Ok(session)), None);

        let request = RegisterRequest {
            name: "New".to_string(),
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
            confirm_password: Some("pw".to_string()),
        };
        let registered = coordinator.register(&request).await.expect("register");

        assert_eq!(registered.id, 9);
        assert_eq!(store.load().as_deref(), Some("R"));
        assert_eq!(coordinator.phase(), SessionPhase::ConfirmedAuthenticated);
    }

    #[tokio::test]
    async fn test_register_failure_publishes_error() {
        let (coordinator, _api, store, _clock) = setup(
            MockApi::with_auth_result(Err(AuthError::RequestFailed {
                status: 409,
                message: "Email already registered".to_string(),
            })),
            None,
        );
        coordinator.bootstrap();
        let mut loading = coordinator.subscribe_loading();

        let request = RegisterRequest {
            name: "New".to_string(),
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
            confirm_password: Some("pw".to_string()),
        };
        let err = coordinator.register(&request).await.unwrap_err();

        assert!(matches!(err, AuthError::RequestFailed { status: 409, .. }));
        let snapshot = coordinator.snapshot();
        assert!(!snapshot.state.is_authenticated());
        assert_eq!(snapshot.state.error(), Some("Email already registered"));
        assert_eq!(snapshot.phase, SessionPhase::Unauthenticated);
        assert_eq!(store.load(), None);
        assert_eq!(
            loading.drain(),
            vec![LoadingState::Idle, LoadingState::Loading, LoadingState::Error]
        );
    }

    #[tokio::test]
    async fn test_login_replaces_previous_token() {
        let session = AuthSession {
            token: "NEW".to_string(),
            user: user(1, "A"),
        };
        let (coordinator, _api, store, _clock) =
            setup(MockApi::with_auth_result(Ok(session)), Some("OLD"));
        coordinator.login(&LoginRequest::new("a@b.com", "x")).await.unwrap();
        assert_eq!(store.load().as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn test_logout_resets_everything() {
        let session = AuthSession {
            token: "T".to_string(),
            user: user(1, "A"),
        };
        let (coordinator, _api, store, _clock) = setup(MockApi::with_auth_result(Ok(session)), None);
        coordinator.login(&LoginRequest::new("a@b.com", "x")).await.unwrap();

        coordinator.logout();

        let state = coordinator.snapshot().state;
        assert!(!state.is_authenticated());
        assert_eq!(state.user(), None);
        assert_eq!(state.token(), None);
        assert_eq!(store.load(), None);
        assert_eq!(coordinator.loading_state(), LoadingState::Idle);
    }

    #[tokio::test]
    async fn test_clear_invalid_tokens_keeps_loading_state() {
        let (coordinator, _api, store, _clock) =
            setup(MockApi::with_auth_result(Err(rejected())), Some("T"));
        let _ = coordinator.login(&LoginRequest::new("a@b.com", "x")).await;

        coordinator.clear_invalid_tokens();

        assert_eq!(store.load(), None);
        assert_eq!(coordinator.loading_state(), LoadingState::Error);
    }

    // -------------------------------------------------------------------------
    // Expiry sweep
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sweep_logs_out_expired_token_while_verification_pending() {
        let stored = token_expiring_at(NOW + 60);
        let (api, _gate) = MockApi::gated();
        let (coordinator, _api, store, clock) = setup(api, Some(&stored));
        let _pending = coordinator.bootstrap().expect("verification task");
        assert!(!coordinator.sweep_expired());

        let mut sub = coordinator.subscribe();
        sub.drain();
        clock.advance(120);

        assert!(coordinator.sweep_expired());
        let next = sub.try_recv().expect("broadcast after sweep");
        assert_eq!(next.state, AuthState::unauthenticated());
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_sweep_without_token_is_noop() {
        let (coordinator, _api, _store, _clock) = setup(MockApi::default(), None);
        coordinator.bootstrap();
        assert!(!coordinator.sweep_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_fires_on_interval() {
        let session = AuthSession {
            token: token_expiring_at(NOW + 60),
            user: user(1, "A"),
        };
        let (coordinator, _api, _store, clock) = setup(MockApi::with_auth_result(Ok(session)), None);
        coordinator.login(&LoginRequest::new("a@b.com", "x")).await.unwrap();

        let start = tokio::time::Instant::now();
        let sweep = coordinator.spawn_expiry_sweep(DEFAULT_EXPIRY_CHECK_INTERVAL);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(coordinator.is_authenticated());

        let mut sub = coordinator.subscribe();
        sub.drain();
        clock.advance(120);

        let next = sub.recv().await.expect("logout broadcast");
        assert_eq!(next.state, AuthState::unauthenticated());
        assert!(start.elapsed() >= DEFAULT_EXPIRY_CHECK_INTERVAL);

        sweep.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_stops_when_coordinator_dropped() {
        let (coordinator, _api, _store, _clock) = setup(MockApi::default(), None);
        let sweep = coordinator.spawn_expiry_sweep(Duration::from_secs(1));
        drop(coordinator);
        tokio::time::timeout(Duration::from_secs(5), sweep)
            .await
            .expect("sweep task should end")
            .unwrap();
    }
}
