//! Shared types for the marketplace core.
//!
//! Holds the identifiers and time source that every other crate in the
//! workspace agrees on: session tokens, user roles, and the [`Clock`]
//! abstraction used to make expiry logic testable.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{Role, SessionToken};
