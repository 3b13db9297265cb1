pub mod id;

pub use id::{IdError, SessionId, UserId};
