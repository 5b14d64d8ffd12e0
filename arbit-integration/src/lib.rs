//! Transport plumbing shared by every venue adapter: the `SocketError`/[`Unrecoverable`]
//! vocabulary, unbounded mpsc [`channel`] wrappers, the priority [`rate_limit`] token bucket,
//! and the signed/unsigned REST request machinery under [`protocol`].
//!
//! Nothing in this crate knows about a specific venue; `arbit-data`'s adapters are thin
//! parameterisations of the generic types defined here.

pub mod channel;
pub mod error;
pub mod protocol;
pub mod rate_limit;

pub use error::{SocketError, Unrecoverable};
