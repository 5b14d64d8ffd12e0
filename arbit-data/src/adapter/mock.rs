use super::{AdapterError, BalanceKind, ExchangeAdapter, Fee, OrderRequest, OrderResponse, OrderStatus};
use crate::books::OrderBook;
use arbit_instrument::{Currency, ExchangeId, Market, MarketMetadata, OrderType, Ticker};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicBool, Ordering};

/// Deterministic, in-memory [`ExchangeAdapter`] driving every Swapper/Dispatcher/detector test
/// in this engine: markets, tickers and balances are seeded directly rather than fetched, and
/// [`MockAdapter::create_order`] fills instantly at the requested price with zero fees unless
/// `fail_next_order` has been armed, mirroring `original_source`'s test harness pattern of a
/// scriptable exchange double rather than a record/replay fixture. Limit orders fill instantly
/// too, unless [`MockAdapter::hold_limit_orders_open`] is set, which leaves them `Open` so a
/// test can drive the Swapper's mirror re-emit/force-close ladder.
pub struct MockAdapter {
    exchange_id: ExchangeId,
    markets: HashMap<Market, MarketMetadata>,
    tickers: RwLock<HashMap<Market, Ticker>>,
    books: RwLock<HashMap<Market, OrderBook>>,
    balances: RwLock<HashMap<Currency, Decimal>>,
    orders: RwLock<HashMap<String, OrderResponse>>,
    resting_fills: RwLock<HashMap<String, (Decimal, Decimal)>>,
    next_order_id: AtomicU64,
    fail_next_order: RwLock<Option<AdapterErrorKind>>,
    hold_limit_orders_open: AtomicBool,
}

/// A deliberately small, cloneable stand-in for [`AdapterError`] (which wraps non-`Clone`
/// transport errors) so tests can arm a specific failure and assert on it.
#[derive(Debug, Clone, Copy)]
pub enum AdapterErrorKind {
    InsufficientFunds,
    Rejected,
}

impl MockAdapter {
    pub fn new(exchange_id: ExchangeId) -> Self {
        Self {
            exchange_id,
            markets: HashMap::new(),
            tickers: RwLock::new(HashMap::new()),
            books: RwLock::new(HashMap::new()),
            balances: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
            resting_fills: RwLock::new(HashMap::new()),
            next_order_id: AtomicU64::new(1),
            fail_next_order: RwLock::new(None),
            hold_limit_orders_open: AtomicBool::new(false),
        }
    }

    pub fn with_market(mut self, market: Market, metadata: MarketMetadata) -> Self {
        self.markets.insert(market, metadata);
        self
    }

    pub fn seed_ticker(&self, market: Market, ticker: Ticker) {
        self.tickers.write().insert(market, ticker);
    }

    pub fn seed_order_book(&self, market: Market, book: OrderBook) {
        self.books.write().insert(market, book);
    }

    pub fn seed_balance(&self, currency: Currency, amount: Decimal) {
        self.balances.write().insert(currency, amount);
    }

    /// Arm the next [`ExchangeAdapter::create_order`] call to fail with `kind` instead of filling.
    pub fn fail_next_order(&self, kind: AdapterErrorKind) {
        *self.fail_next_order.write() = Some(kind);
    }

    /// From now on, `Limit` orders placed through this adapter come back `Open` instead of
    /// filling instantly; `Market` orders are unaffected. Lets a test drive the Swapper's mirror
    /// re-emit/force-close ladder against an order that's still resting.
    pub fn hold_limit_orders_open(&self) {
        self.hold_limit_orders_open.store(true, Ordering::SeqCst);
    }

    /// Marks a still-open order `Filled` at the price/amount it was placed with, as if it had
    /// just traded.
    pub fn fill_resting_order(&self, id: &str) {
        if let Some((amount, price)) = self.resting_fills.write().remove(id) {
            if let Some(order) = self.orders.write().get_mut(id) {
                order.status = OrderStatus::Filled;
                order.filled = amount;
                order.average = Some(price);
            }
        }
    }
}

#[async_trait]
impl ExchangeAdapter for MockAdapter {
    fn exchange_id(&self) -> ExchangeId {
        self.exchange_id
    }

    async fn load_markets(&self) -> Result<HashMap<Market, MarketMetadata>, AdapterError> {
        Ok(self.markets.clone())
    }

    async fn fetch_tickers(&self) -> Result<HashMap<Market, Ticker>, AdapterError> {
        Ok(self.tickers.read().clone())
    }

    async fn fetch_ticker(&self, market: &Market) -> Result<Ticker, AdapterError> {
        self.tickers
            .read()
            .get(market)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownMarket(market.clone()))
    }

    async fn fetch_order_book(&self, market: &Market, _depth: usize) -> Result<OrderBook, AdapterError> {
        self.books
            .read()
            .get(market)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownMarket(market.clone()))
    }

    async fn fetch_balance(&self, _kind: BalanceKind) -> Result<HashMap<Currency, Decimal>, AdapterError> {
        Ok(self.balances.read().clone())
    }

    async fn create_order(&self, request: OrderRequest) -> Result<OrderResponse, AdapterError> {
        if !self.markets.contains_key(&request.market) {
            return Err(AdapterError::UnknownMarket(request.market));
        }

        if let Some(kind) = self.fail_next_order.write().take() {
            return Err(match kind {
                AdapterErrorKind::InsufficientFunds => AdapterError::InsufficientFunds,
                AdapterErrorKind::Rejected => AdapterError::Rejected("mock adapter armed failure".into()),
            });
        }

        let ticker = self.tickers.read().get(&request.market).cloned();
        let fill_price = request
            .price
            .or_else(|| ticker.as_ref().map(|t| t.mid()))
            .unwrap_or(dec!(0));

        let amount = request
            .amount
            .or_else(|| request.quote_cost.map(|cost| cost / fill_price))
            .unwrap_or(dec!(0));

        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst).to_string();
        let rests_open =
            request.order_type == OrderType::Limit && self.hold_limit_orders_open.load(Ordering::SeqCst);

        let response = if rests_open {
            self.resting_fills.write().insert(id.clone(), (amount, fill_price));
            OrderResponse {
                id: id.clone(),
                status: OrderStatus::Open,
                filled: Decimal::ZERO,
                average: None,
                fees: Vec::new(),
            }
        } else {
            OrderResponse {
                id: id.clone(),
                status: OrderStatus::Filled,
                filled: amount,
                average: Some(fill_price),
                fees: vec![Fee {
                    currency: request.market.quote,
                    cost: dec!(0),
                }],
            }
        };

        self.orders.write().insert(id, response.clone());
        Ok(response)
    }

    async fn fetch_order(&self, id: &str, _market: &Market) -> Result<OrderResponse, AdapterError> {
        self.orders
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownOrder(id.to_string()))
    }

    async fn cancel_order(&self, id: &str, _market: &Market) -> Result<(), AdapterError> {
        self.resting_fills.write().remove(id);
        self.orders
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AdapterError::UnknownOrder(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_instrument::{OrderType, Side};

    fn market() -> Market {
        Market::new("BTC", "USDT")
    }

    fn adapter() -> MockAdapter {
        MockAdapter::new(ExchangeId::Mock).with_market(
            market(),
            MarketMetadata {
                active: true,
                min_amount: dec!(0.0001),
                min_cost: dec!(10),
                amount_precision: 6,
                price_precision: 2,
            },
        )
    }

    #[tokio::test]
    async fn create_order_fills_at_requested_price() {
        let adapter = adapter();
        let response = adapter
            .create_order(OrderRequest {
                market: market(),
                order_type: OrderType::Limit,
                side: Side::Buy,
                amount: Some(dec!(1)),
                quote_cost: None,
                price: Some(dec!(100)),
                time_in_force: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, OrderStatus::Filled);
        assert_eq!(response.filled, dec!(1));
        assert_eq!(response.average, Some(dec!(100)));
    }

    #[tokio::test]
    async fn armed_failure_is_returned_once() {
        let adapter = adapter();
        adapter.fail_next_order(AdapterErrorKind::InsufficientFunds);

        let request = OrderRequest {
            market: market(),
            order_type: OrderType::Market,
            side: Side::Buy,
            amount: Some(dec!(1)),
            quote_cost: None,
            price: None,
            time_in_force: None,
        };

        assert!(matches!(
            adapter.create_order(request.clone()).await,
            Err(AdapterError::InsufficientFunds)
        ));
        assert!(adapter.create_order(request).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_market_is_rejected() {
        let adapter = MockAdapter::new(ExchangeId::Mock);
        let result = adapter
            .create_order(OrderRequest {
                market: market(),
                order_type: OrderType::Market,
                side: Side::Buy,
                amount: Some(dec!(1)),
                quote_cost: None,
                price: None,
                time_in_force: None,
            })
            .await;
        assert!(matches!(result, Err(AdapterError::UnknownMarket(_))));
    }
}
