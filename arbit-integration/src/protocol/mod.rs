//! Wire protocol plumbing: HTTP REST request construction/signing and response parsing.
//!
//! A WebSocket reconnect-loop abstraction lives in `arbit-data` instead of here, since it is
//! coupled to the partial-book cache it feeds — unlike REST signing, which is genuinely
//! venue-agnostic infrastructure.

pub mod http;
