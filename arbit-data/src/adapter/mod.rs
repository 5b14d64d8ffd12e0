use arbit_instrument::{Currency, Market, MarketMetadata, OrderType, Side, Ticker};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// The generic REST/signing implementation shared by every venue, parameterised by a small
/// [`VenueProfile`] value (§9 "policy, not branches"). Grounded directly on
/// `original_source/binance_api.py`'s request/signing/response flow.
pub mod generic;

/// Per-venue REST endpoint layout and fee defaults.
pub mod profile;

/// Thin per-venue wrapper structs (`BinanceAdapter`, `BitgetAdapter`, ...) around
/// [`generic::GenericSpotAdapter`], each pre-configured with its [`VenueProfile`].
pub mod venues;

/// Deterministic in-memory adapter backing the Swapper/Dispatcher test suites.
pub mod mock;

pub use profile::VenueProfile;

/// Errors an [`ExchangeAdapter`] call may fail with. The core retries the specific hop once on
/// `InsufficientFunds` with a size reduction of ≥20bps (§4.1 Failure semantics); every other
/// variant is surfaced to the caller as-is.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(#[from] arbit_integration::SocketError),

    #[error("insufficient funds for this order")]
    InsufficientFunds,

    #[error("market {0} is not active or not known to this venue")]
    UnknownMarket(Market),

    #[error("order {0} not found")]
    UnknownOrder(String),

    #[error("precision or limit violation: {0}")]
    Precision(#[from] arbit_instrument::PrecisionError),

    #[error("venue rejected the request: {0}")]
    Rejected(String),
}

/// Which balance figure [`ExchangeAdapter::fetch_balance`] should return.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BalanceKind {
    /// Available for new orders.
    Free,
    /// Free + locked in open orders.
    Total,
}

/// Lifecycle state of a submitted order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OrderStatus {
    Open,
    Filled,
    Canceled,
    Rejected,
}

/// A fee charged against a specific currency, aggregated from either a venue's unified `fees`
/// list or its legacy single-`fee` shape (`original_source::swapper._sum_fees`).
#[derive(Debug, Clone, PartialEq)]
pub struct Fee {
    pub currency: Currency,
    pub cost: Decimal,
}

/// Parameters for [`ExchangeAdapter::create_order`].
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub market: Market,
    pub order_type: OrderType,
    pub side: Side,
    /// Base-currency amount, unless `quote_cost` is set (§4.1 venue quirks table: Binance,
    /// Bitget market buys use a quote-currency cost instead).
    pub amount: Option<Decimal>,
    pub quote_cost: Option<Decimal>,
    pub price: Option<Decimal>,
    /// `None` defers to the venue's own default (`VenuePolicy::default_order_type` territory);
    /// only meaningful for `OrderType::Limit` requests such as the Swapper's mirrored last leg.
    pub time_in_force: Option<arbit_instrument::TimeInForce>,
}

/// The result of creating or re-fetching an order.
#[derive(Debug, Clone)]
pub struct OrderResponse {
    pub id: String,
    pub status: OrderStatus,
    pub filled: Decimal,
    pub average: Option<Decimal>,
    pub fees: Vec<Fee>,
}

/// Normalized, opaque per-venue capability surface (§4.1). Every concrete adapter —
/// [`binance::BinanceAdapter`], the [`generic::GenericSpotAdapter`] instantiations for the
/// remaining nine venues, and [`mock::MockAdapter`] — implements this one trait, so the
/// detection/execution pipeline never branches on [`arbit_instrument::ExchangeId`] directly.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn exchange_id(&self) -> arbit_instrument::ExchangeId;

    async fn load_markets(&self) -> Result<HashMap<Market, MarketMetadata>, AdapterError>;

    /// Batch ticker fetch. A venue that doesn't support batching should still return a
    /// best-effort map rather than erroring the whole call (§4.1: "unsupported venues are
    /// excluded with a single INFO log, never propagated as error" is the caller's
    /// responsibility across multiple adapters; within one adapter, a partial fetch failure
    /// for an individual market is simply omitted from the returned map).
    async fn fetch_tickers(&self) -> Result<HashMap<Market, Ticker>, AdapterError>;

    async fn fetch_ticker(&self, market: &Market) -> Result<Ticker, AdapterError>;

    async fn fetch_order_book(
        &self,
        market: &Market,
        depth: usize,
    ) -> Result<crate::books::OrderBook, AdapterError>;

    async fn fetch_balance(&self, kind: BalanceKind) -> Result<HashMap<Currency, Decimal>, AdapterError>;

    async fn create_order(&self, request: OrderRequest) -> Result<OrderResponse, AdapterError>;

    async fn fetch_order(&self, id: &str, market: &Market) -> Result<OrderResponse, AdapterError>;

    async fn cancel_order(&self, id: &str, market: &Market) -> Result<(), AdapterError>;
}
