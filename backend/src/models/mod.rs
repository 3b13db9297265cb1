//! Data models shared across storage backends and API handlers.

pub mod active_session;
pub mod session;
pub mod user;
