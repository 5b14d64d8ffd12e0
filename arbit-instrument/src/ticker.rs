use crate::market::Market;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single venue's latest quote for a [`Market`], as reported by a REST ticker/book-ticker
/// endpoint or derived from a WebSocket partial book.
///
/// `quote_volume` is `Option` because several venues (per `original_source`'s
/// `get_quote_volume`) only expose 24h quote-currency volume nested inside a venue-specific
/// `info` blob rather than a top-level `quoteVolume`/`qvol`/`volumeQuote` field; adapters that
/// can't find it populate `None` rather than guessing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticker {
    pub market: Market,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub quote_volume: Option<Decimal>,
}

impl Ticker {
    /// Mid price, used only for loss-guard and reporting math — never for the rate graph's
    /// edge weights, which are built from `bid`/`ask` directly.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mid_averages_bid_and_ask() {
        let ticker = Ticker {
            market: Market::new("BTC", "USDT"),
            bid: dec!(100),
            ask: dec!(102),
            last: dec!(101),
            quote_volume: None,
        };
        assert_eq!(ticker.mid(), dec!(101));
    }
}
