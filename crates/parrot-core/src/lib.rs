//! parrot core - Shared types and session coordination
//!
//! This crate provides the pieces every hook invocation needs regardless
//! of which assistant sent it:
//! - `session` - the session identifier newtype
//! - `text` - speech normalization and fingerprinting
//! - `store` - file-backed markers for at-most-once initialization and
//!   speech de-duplication across independent processes
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod session;
pub mod store;
pub mod text;

// Re-exports for convenience
pub use error::{CoreError, CoreResult};
pub use session::SessionId;
pub use store::{SessionStore, SweepReport, DEFAULT_RETENTION};
pub use text::{fingerprint, normalize_for_speech};
