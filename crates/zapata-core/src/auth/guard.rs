//! Read-only access checks for protected and guest-only screens.

use std::sync::Arc;

use tracing::debug;

use super::coordinator::SessionCoordinator;
use super::state::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only for signed-in users; denied users go to the login screen
    RequireAuth,
    /// Only for signed-out users (login, register); signed-in users go home
    GuestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny,
    /// Bootstrap or an auth call is still deciding; ask again later
    Pending,
}

/// Gate consulted before entering a screen.
#[derive(Clone)]
pub struct AccessGate {
    session: Arc<SessionCoordinator>,
}

impl AccessGate {
    pub fn new(session: Arc<SessionCoordinator>) -> Self {
        Self { session }
    }

    /// Decide from the current snapshot without waiting.
    pub fn check(&self, access: Access) -> GateDecision {
        let bootstrapped = self.session.state().is_bootstrapped();
        decide(access, bootstrapped, &self.session.snapshot())
    }

    /// Wait for bootstrap, then decide. Never returns `Pending`;
    /// `RequireAuth` waits out an in-flight login or register as well.
    pub async fn resolve(&self, access: Access) -> GateDecision {
        self.session.wait_bootstrapped().await;
        let mut updates = self.session.subscribe();
        loop {
            // The state holder lives inside the coordinator this gate keeps
            // alive, so the subscription cannot end while we wait on it.
            let Some(snapshot) = updates.recv().await else {
                return GateDecision::Deny;
            };
            let decision = decide(access, true, &snapshot);
            if decision != GateDecision::Pending {
                debug!(?access, ?decision, "Access resolved");
                return decision;
            }
        }
    }
}

fn decide(access: Access, bootstrapped: bool, snapshot: &SessionSnapshot) -> GateDecision {
    if !bootstrapped {
        return GateDecision::Pending;
    }
    let state = &snapshot.state;
    match access {
        Access::RequireAuth if state.is_authenticated() => GateDecision::Allow,
        Access::RequireAuth if state.is_loading() => GateDecision::Pending,
        Access::RequireAuth => GateDecision::Deny,
        Access::GuestOnly if state.is_authenticated() => GateDecision::Deny,
        Access::GuestOnly => GateDecision::Allow,
    }
}
