use super::generic::GenericSpotAdapter;
use super::{profile, AdapterError, BalanceKind, ExchangeAdapter, OrderRequest, OrderResponse};
use crate::books::OrderBook;
use arbit_instrument::{Currency, ExchangeId, Market, MarketMetadata, Ticker};
use arbit_integration::protocol::http::private::Credentials;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Declares a thin per-venue newtype wrapping [`GenericSpotAdapter`], pre-bound to that venue's
/// [`profile::VenueProfile`]. Every method simply forwards to the shared implementation; the
/// wrapper exists so the rest of the engine (and its logs) deal with concretely-named adapters
/// — `BinanceAdapter`, `KrakenAdapter`, ... — rather than a bag of `GenericSpotAdapter`s picked
/// out by an `ExchangeId` field, per §9's "policy, not branches" (the ten wrappers *are* the
/// policy; none of them branch).
macro_rules! venue_adapter {
    ($name:ident, $exchange_id:expr, $doc:literal) => {
        #[doc = $doc]
        pub struct $name(GenericSpotAdapter);

        impl $name {
            pub fn new(credentials: Option<Credentials>) -> Self {
                Self(GenericSpotAdapter::new(profile::profile($exchange_id), credentials))
            }
        }

        #[async_trait]
        impl ExchangeAdapter for $name {
            fn exchange_id(&self) -> ExchangeId {
                self.0.exchange_id()
            }

            async fn load_markets(&self) -> Result<HashMap<Market, MarketMetadata>, AdapterError> {
                self.0.load_markets().await
            }

            async fn fetch_tickers(&self) -> Result<HashMap<Market, Ticker>, AdapterError> {
                self.0.fetch_tickers().await
            }

            async fn fetch_ticker(&self, market: &Market) -> Result<Ticker, AdapterError> {
                self.0.fetch_ticker(market).await
            }

            async fn fetch_order_book(&self, market: &Market, depth: usize) -> Result<OrderBook, AdapterError> {
                self.0.fetch_order_book(market, depth).await
            }

            async fn fetch_balance(&self, kind: BalanceKind) -> Result<HashMap<Currency, Decimal>, AdapterError> {
                self.0.fetch_balance(kind).await
            }

            async fn create_order(&self, request: OrderRequest) -> Result<OrderResponse, AdapterError> {
                self.0.create_order(request).await
            }

            async fn fetch_order(&self, id: &str, market: &Market) -> Result<OrderResponse, AdapterError> {
                self.0.fetch_order(id, market).await
            }

            async fn cancel_order(&self, id: &str, market: &Market) -> Result<(), AdapterError> {
                self.0.cancel_order(id, market).await
            }
        }
    };
}

venue_adapter!(
    BinanceAdapter,
    ExchangeId::Binance,
    "The reference venue adapter, grounded directly on `original_source/binance_api.py`'s \
     request/signing/response shapes — every other wrapper in this module reuses the same \
     [`GenericSpotAdapter`] this one does."
);
venue_adapter!(BitgetAdapter, ExchangeId::Bitget, "Bitget spot adapter.");
venue_adapter!(BybitAdapter, ExchangeId::Bybit, "Bybit spot adapter.");
venue_adapter!(CoinbaseAdapter, ExchangeId::Coinbase, "Coinbase spot adapter.");
venue_adapter!(GateioAdapter, ExchangeId::Gateio, "Gate.io spot adapter.");
venue_adapter!(HyperliquidAdapter, ExchangeId::Hyperliquid, "Hyperliquid spot adapter.");
venue_adapter!(KrakenAdapter, ExchangeId::Kraken, "Kraken spot adapter.");
venue_adapter!(KucoinAdapter, ExchangeId::Kucoin, "Kucoin spot adapter.");
venue_adapter!(MexcAdapter, ExchangeId::Mexc, "MEXC spot adapter.");
venue_adapter!(OkxAdapter, ExchangeId::Okx, "OKX spot adapter.");

/// Construct the concrete adapter for `id`, or `None` for [`ExchangeId::Mock`] (use
/// [`super::mock::MockAdapter`] directly instead).
pub fn build(id: ExchangeId, credentials: Option<Credentials>) -> Option<Box<dyn ExchangeAdapter>> {
    Some(match id {
        ExchangeId::Binance => Box::new(BinanceAdapter::new(credentials)),
        ExchangeId::Bitget => Box::new(BitgetAdapter::new(credentials)),
        ExchangeId::Bybit => Box::new(BybitAdapter::new(credentials)),
        ExchangeId::Coinbase => Box::new(CoinbaseAdapter::new(credentials)),
        ExchangeId::Gateio => Box::new(GateioAdapter::new(credentials)),
        ExchangeId::Hyperliquid => Box::new(HyperliquidAdapter::new(credentials)),
        ExchangeId::Kraken => Box::new(KrakenAdapter::new(credentials)),
        ExchangeId::Kucoin => Box::new(KucoinAdapter::new(credentials)),
        ExchangeId::Mexc => Box::new(MexcAdapter::new(credentials)),
        ExchangeId::Okx => Box::new(OkxAdapter::new(credentials)),
        ExchangeId::Mock => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_covers_every_real_venue_except_mock() {
        for id in [
            ExchangeId::Binance,
            ExchangeId::Bitget,
            ExchangeId::Bybit,
            ExchangeId::Coinbase,
            ExchangeId::Gateio,
            ExchangeId::Hyperliquid,
            ExchangeId::Kraken,
            ExchangeId::Kucoin,
            ExchangeId::Mexc,
            ExchangeId::Okx,
        ] {
            let adapter = build(id, None).expect("every real venue builds an adapter");
            assert_eq!(adapter.exchange_id(), id);
        }
        assert!(build(ExchangeId::Mock, None).is_none());
    }
}
