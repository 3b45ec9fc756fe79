//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `token`: bearer token claims decoding and expiry checks
//! - `TokenStore`: best-effort token persistence over a key-value backend
//! - `StateHolder`: the broadcast `AuthState` record
//! - `SessionCoordinator`: bootstrap, expiry sweep, login/register/logout
//! - `AccessGate`: read-only checks for protected and guest-only screens
//!
//! Tokens are trusted at face value locally; the server has the final say
//! through `/verify-token`.

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod guard;
pub mod state;
pub mod store;
pub mod token;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::ManualClock;
pub use coordinator::{SessionCoordinator, DEFAULT_EXPIRY_CHECK_INTERVAL};
pub use error::AuthError;
pub use guard::{Access, AccessGate, GateDecision};
pub use state::{AuthState, LoadingState, SessionPhase, SessionSnapshot, StateHolder, Subscription};
pub use store::{FileStorage, KeyValueStorage, KeyringStorage, MemoryStorage, TokenStore};
pub use token::Claims;
