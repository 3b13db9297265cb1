//! Postgres access for the `sessions` and `active_sessions` tables.

pub mod active_session;
pub mod session;
pub mod transaction;
