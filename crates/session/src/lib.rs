//! Login session management.
//!
//! This crate provides the process-wide session table that every
//! authenticated request goes through:
//! 1. `create_session` on login, refusing a second session for the same user
//! 2. `touch` on every request, sliding the expiry window forward
//! 3. `destroy` on logout
//! 4. `sweep` to drop idle sessions, triggered before logins and by a
//!    background [`SessionSweeper`]

pub mod config;
pub mod error;
pub mod session;
pub mod sweeper;
pub mod table;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use session::Session;
pub use sweeper::{SessionSweeper, SweeperHandle};
pub use table::SessionTable;
