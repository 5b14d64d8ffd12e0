//! Per-venue [`adapter::ExchangeAdapter`] implementations, the venue policy/profile table, the
//! reconnecting partial-order-book cache, and environment-backed credential loading.

pub mod adapter;
pub mod books;
pub mod creds;

pub use adapter::{AdapterError, BalanceKind, ExchangeAdapter, OrderRequest, OrderResponse, OrderStatus};
pub use books::{Level, OrderBook};
pub use creds::creds_from_env;
