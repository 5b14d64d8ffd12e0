use crate::currency::Currency;
use crate::error::PrecisionError;
use derive_more::Display;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

/// A tradable pair on a venue, e.g. `BTC/USDT`. Two markets with the same base/quote but on
/// different venues are distinct graph edges, not distinct [`Market`] values — the venue lives
/// alongside the market in the rate graph's edge key, not inside this type.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{base}/{quote}")]
pub struct Market {
    pub base: Currency,
    pub quote: Currency,
}

impl Market {
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// The inverse market, `quote/base`. Used when the detector needs to walk a rate graph edge
    /// backwards (selling base for quote vs. buying base with quote).
    pub fn inverted(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

/// Exchange-reported trading rules for a [`Market`], refreshed periodically from each venue's
/// market-metadata endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MarketMetadata {
    pub active: bool,
    pub min_amount: Decimal,
    pub min_cost: Decimal,
    pub amount_precision: u32,
    pub price_precision: u32,
}

impl MarketMetadata {
    /// Round `amount` down to the market's amount precision and verify it still clears
    /// `min_amount`.
    pub fn round_amount(&self, amount: Decimal) -> Result<Decimal, PrecisionError> {
        let rounded = amount.round_dp_with_strategy(self.amount_precision, RoundingStrategy::ToZero);
        if rounded < self.min_amount {
            return Err(PrecisionError::BelowMinAmount {
                amount: rounded,
                min_amount: self.min_amount,
            });
        }
        Ok(rounded)
    }

    /// Round `price` to the market's price precision (nearest, half-up — prices are not
    /// truncated, only amounts are, so a rounded limit price never accidentally improves on the
    /// quote that produced it).
    pub fn round_price(&self, price: Decimal) -> Decimal {
        price.round_dp_with_strategy(self.price_precision, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Verify `amount * price` clears the venue's minimum notional.
    pub fn check_min_cost(&self, amount: Decimal, price: Decimal) -> Result<(), PrecisionError> {
        let cost = amount * price;
        if cost < self.min_cost {
            return Err(PrecisionError::BelowMinCost {
                cost,
                min_cost: self.min_cost,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn metadata() -> MarketMetadata {
        MarketMetadata {
            active: true,
            min_amount: dec!(0.001),
            min_cost: dec!(10),
            amount_precision: 3,
            price_precision: 2,
        }
    }

    #[test]
    fn display_renders_base_slash_quote() {
        let market = Market::new("btc", "usdt");
        assert_eq!(market.to_string(), "BTC/USDT");
    }

    #[test]
    fn inverted_swaps_base_and_quote() {
        let market = Market::new("BTC", "USDT");
        assert_eq!(market.inverted(), Market::new("USDT", "BTC"));
    }

    #[test]
    fn round_amount_truncates_and_enforces_minimum() {
        let md = metadata();
        assert_eq!(md.round_amount(dec!(1.23456)).unwrap(), dec!(1.234));
        assert!(md.round_amount(dec!(0.0001)).is_err());
    }

    #[test]
    fn check_min_cost_rejects_dust_notional() {
        let md = metadata();
        assert!(md.check_min_cost(dec!(0.001), dec!(1)).is_err());
        assert!(md.check_min_cost(dec!(1), dec!(20)).is_ok());
    }
}
