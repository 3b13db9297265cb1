pub mod authority;
pub mod credentials;
pub mod session_store;
pub mod sweeper;

pub use authority::{MemorySessionAuthority, PgSessionAuthority, SessionAuthorityTrait};
pub use credentials::{CredentialVerifierTrait, StaticCredentialVerifier};
pub use session_store::{MemorySessionStore, PgSessionStore, SessionStoreTrait};
pub use sweeper::{spawn_session_sweeper, sweep_once, SweepReport};
