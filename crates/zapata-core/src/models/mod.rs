//! Data models shared by the session coordinator and the API client.
//!
//! - `User`, `LoginRequest`, `RegisterRequest`: account types
//! - `Footing`, `CalculationRequest`, `CalculationResponse`: calculation
//!   endpoint types, with the rebar table used by the tie-beam form

pub mod calculation;
pub mod user;

pub use calculation::{
    rebar, BarSelections, BarSlot, CalculationParams, CalculationRequest, CalculationResponse,
    Footing, Rebar, REBARS,
};
pub use user::{LoginRequest, RegisterRequest, User};
