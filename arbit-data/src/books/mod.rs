use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use tracing::debug;

/// Per-symbol reconnecting WS cache of the top-of-book depth snapshot, grounded on a single
/// venue's partial-book stream (§4.6).
pub mod cache;

/// A local L2 order book snapshot, keyed by sequence number.
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct OrderBook {
    pub sequence: u64,
    pub time_engine: Option<DateTime<Utc>>,
    bids: OrderBookSide<Bids>,
    asks: OrderBookSide<Asks>,
}

impl OrderBook {
    /// Construct a new sorted [`OrderBook`].
    ///
    /// Note that the passed bid and asks levels do not need to be pre-sorted.
    pub fn new<IterBids, IterAsks, L>(
        sequence: u64,
        time_engine: Option<DateTime<Utc>>,
        bids: IterBids,
        asks: IterAsks,
    ) -> Self
    where
        IterBids: IntoIterator<Item = L>,
        IterAsks: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        Self {
            sequence,
            time_engine,
            bids: OrderBookSide::bids(bids),
            asks: OrderBookSide::asks(asks),
        }
    }

    /// Generate a sorted [`OrderBook`] snapshot with a maximum depth.
    pub fn snapshot(&self, depth: usize) -> Self {
        Self {
            sequence: self.sequence,
            time_engine: self.time_engine,
            bids: OrderBookSide::bids(self.bids.levels.iter().take(depth).copied()),
            asks: OrderBookSide::asks(self.asks.levels.iter().take(depth).copied()),
        }
    }

    /// Replace this book's levels wholesale with a fresh partial-book snapshot (the only kind
    /// of update Binance's `depth20` stream and this engine's other venues' REST polling ever
    /// produce — there is no diff/merge path, matching `original_source`'s
    /// `BinanceL2PartialBook`).
    pub fn replace<IterBids, IterAsks, L>(
        &mut self,
        sequence: u64,
        time_engine: Option<DateTime<Utc>>,
        bids: IterBids,
        asks: IterAsks,
    ) where
        IterBids: IntoIterator<Item = L>,
        IterAsks: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        *self = Self::new(sequence, time_engine, bids, asks);
    }

    /// Update the local [`OrderBook`] by upserting the levels in an [`OrderBookSide`].
    pub fn upsert_bids(&mut self, update: OrderBookSide<Bids>) {
        self.bids.upsert(update.levels)
    }

    /// Update the local [`OrderBook`] by upserting the levels in an [`OrderBookSide`].
    pub fn upsert_asks(&mut self, update: OrderBookSide<Asks>) {
        self.asks.upsert(update.levels)
    }

    /// Return a reference to this [`OrderBook`]s bids.
    pub fn bids(&self) -> &OrderBookSide<Bids> {
        &self.bids
    }

    /// Return a reference to this [`OrderBook`]s asks.
    pub fn asks(&self) -> &OrderBookSide<Asks> {
        &self.asks
    }

    /// Calculate the mid-price by taking the average of the best bid and ask prices.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.bids.levels.first(), self.asks.levels.first()) {
            (Some(best_bid), Some(best_ask)) => Some(mid_price(best_bid.price, best_ask.price)),
            (Some(best_bid), None) => Some(best_bid.price),
            (None, Some(best_ask)) => Some(best_ask.price),
            (None, None) => None,
        }
    }

    /// Calculate the volume weighted mid-price (micro-price), weighing the best bid and ask
    /// prices with their associated amount.
    pub fn volume_weighted_mid_price(&self) -> Option<Decimal> {
        match (self.bids.levels.first(), self.asks.levels.first()) {
            (Some(best_bid), Some(best_ask)) => {
                Some(volume_weighted_mid_price(*best_bid, *best_ask))
            }
            (Some(best_bid), None) => Some(best_bid.price),
            (None, Some(best_ask)) => Some(best_ask.price),
            (None, None) => None,
        }
    }

    /// Walk this book from the top consuming `amount` of base currency, returning the
    /// volume-weighted average execution price and the amount left unfilled if the book's
    /// depth ran out first. Used by the Depth Revalidator (§4.6) to recompute net% net of
    /// walked slippage instead of assuming top-of-book fills the whole size.
    pub fn walk<S>(&self, side: &OrderBookSide<S>, amount: Decimal) -> (Decimal, Decimal)
    where
        S: std::fmt::Display + std::fmt::Debug,
    {
        let mut remaining = amount;
        let mut notional = Decimal::ZERO;
        for level in side.levels() {
            if remaining <= Decimal::ZERO {
                break;
            }
            let filled = remaining.min(level.amount);
            notional += filled * level.price;
            remaining -= filled;
        }
        let filled_amount = amount - remaining;
        if filled_amount.is_zero() {
            (Decimal::ZERO, remaining)
        } else {
            (notional / filled_amount, remaining)
        }
    }
}

/// Levels for one side of the [`OrderBook`].
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct OrderBookSide<Side> {
    #[serde(skip_serializing)]
    pub side: Side,
    levels: Vec<Level>,
}

/// Unit type to tag an [`OrderBookSide`] as the bid Side (ie/ buyers) of an [`OrderBook`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Display)]
pub struct Bids;

/// Unit type to tag an [`OrderBookSide`] as the ask Side (ie/ sellers) of an [`OrderBook`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Display)]
pub struct Asks;

impl Serialize for Bids {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("bids")
    }
}

impl Serialize for Asks {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("asks")
    }
}

impl OrderBookSide<Bids> {
    /// Construct a new [`OrderBookSide<Bids>`] from the provided [`Level`]s.
    pub fn bids<Iter, L>(levels: Iter) -> Self
    where
        Iter: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        let mut levels = levels.into_iter().map(L::into).collect::<Vec<_>>();
        levels.sort_unstable_by(|a, b| a.price.cmp(&b.price).reverse());

        Self { side: Bids, levels }
    }

    /// Upsert bid [`Level`]s into this [`OrderBookSide<Bids>`].
    pub fn upsert<Iter, L>(&mut self, levels: Iter)
    where
        Iter: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        levels.into_iter().for_each(|upsert| {
            let upsert = upsert.into();
            self.upsert_single(upsert, |existing| {
                existing.price.cmp(&upsert.price).reverse()
            })
        })
    }
}

impl OrderBookSide<Asks> {
    /// Construct a new [`OrderBookSide<Asks>`] from the provided [`Level`]s.
    pub fn asks<Iter, L>(levels: Iter) -> Self
    where
        Iter: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        let mut levels = levels.into_iter().map(L::into).collect::<Vec<_>>();
        levels.sort_unstable_by(|a, b| a.price.cmp(&b.price));

        Self { side: Asks, levels }
    }

    /// Upsert ask [`Level`]s into this [`OrderBookSide<Asks>`].
    pub fn upsert<Iter, L>(&mut self, levels: Iter)
    where
        Iter: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        levels.into_iter().for_each(|upsert| {
            let upsert = upsert.into();
            self.upsert_single(upsert, |existing| existing.price.cmp(&upsert.price))
        })
    }
}

impl<Side> OrderBookSide<Side>
where
    Side: std::fmt::Display + std::fmt::Debug,
{
    /// Return a reference to the [`OrderBookSide`] levels.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Upsert a single [`Level`] into this [`OrderBookSide`].
    ///
    /// ### Upsert Scenarios
    /// 1. Level exists & new amount is 0 => remove the level.
    /// 2. Level exists & new amount is > 0 => replace the level.
    /// 3. Level does not exist & new amount is 0 => log & continue.
    /// 4. Level does not exist & new amount is > 0 => insert the new level.
    pub fn upsert_single<FnOrd>(&mut self, new_level: Level, fn_ord: FnOrd)
    where
        FnOrd: Fn(&Level) -> Ordering,
    {
        match (self.levels.binary_search_by(fn_ord), new_level.amount) {
            (Ok(index), new_amount) => {
                if new_amount.is_zero() {
                    let _removed = self.levels.remove(index);
                } else {
                    self.levels[index].amount = new_amount;
                }
            }
            (Err(index), new_amount) => {
                if new_amount.is_zero() {
                    debug!(
                        ?new_level,
                        side = %self.side,
                        "received upsert Level with zero amount (to remove) that was not found"
                    );
                } else {
                    self.levels.insert(index, new_level);
                }
            }
        }
    }
}

impl Default for OrderBookSide<Bids> {
    fn default() -> Self {
        Self {
            side: Bids,
            levels: vec![],
        }
    }
}

impl Default for OrderBookSide<Asks> {
    fn default() -> Self {
        Self {
            side: Asks,
            levels: vec![],
        }
    }
}

/// A single price/amount level of an [`OrderBook`].
#[derive(Debug, Copy, Clone, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize)]
pub struct Level {
    pub price: Decimal,
    pub amount: Decimal,
}

impl<T> From<(T, T)> for Level
where
    T: Into<Decimal>,
{
    fn from((price, amount): (T, T)) -> Self {
        Self::new(price, amount)
    }
}

impl Eq for Level {}

impl Level {
    pub fn new<T>(price: T, amount: T) -> Self
    where
        T: Into<Decimal>,
    {
        Self {
            price: price.into(),
            amount: amount.into(),
        }
    }
}

/// Average the best bid and ask prices.
pub fn mid_price(best_bid_price: Decimal, best_ask_price: Decimal) -> Decimal {
    (best_bid_price + best_ask_price) / Decimal::TWO
}

/// Volume weighted mid-price (micro-price), weighing the best bid/ask with their amount.
pub fn volume_weighted_mid_price(best_bid: Level, best_ask: Level) -> Decimal {
    ((best_bid.price * best_ask.amount) + (best_ask.price * best_bid.amount))
        / (best_bid.amount + best_ask.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn upsert_replaces_removes_and_inserts() {
        let mut bids = OrderBookSide::bids([(dec!(100), dec!(1)), (dec!(99), dec!(2))]);
        bids.upsert([(dec!(100), dec!(0))]);
        assert_eq!(bids.levels().len(), 1);
        assert_eq!(bids.levels()[0].price, dec!(99));

        bids.upsert([(dec!(101), dec!(5))]);
        assert_eq!(bids.levels()[0].price, dec!(101), "best bid is now 101");
    }

    #[test]
    fn walk_consumes_levels_in_order() {
        let book = OrderBook::new(
            1,
            None,
            [(dec!(100), dec!(1)), (dec!(99), dec!(1))],
            [(dec!(101), dec!(1)), (dec!(102), dec!(1))],
        );
        let (avg_price, unfilled) = book.walk(book.asks(), dec!(1.5));
        assert_eq!(unfilled, dec!(0));
        // 1 unit @101 + 0.5 @102 = 151.5 / 1.5 = 101
        assert_eq!(avg_price, dec!(101));
    }

    #[test]
    fn walk_reports_unfilled_amount_past_book_depth() {
        let book = OrderBook::new(1, None, [(dec!(100), dec!(1))], [(dec!(101), dec!(1))]);
        let (_, unfilled) = book.walk(book.asks(), dec!(5));
        assert_eq!(unfilled, dec!(4));
    }
}
