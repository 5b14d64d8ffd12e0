use crate::config::{SwapMode, SwapperConfig};
use crate::fees::{merge_fees, sum_fees};
use crate::mirror::{self, MirrorBelowMinimum};
use crate::plan::{FeeTotals, HopFill, SwapHop, SwapPlan, SwapResult, SwapStatus};
use arbit_data::adapter::{AdapterError, BalanceKind, OrderRequest, OrderResponse, OrderStatus};
use arbit_data::ExchangeAdapter;
use arbit_instrument::{Currency, Market, MarketMetadata, OrderType, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Minimum insufficient-funds retry shrink, grounded on `original_source::swapper.py`'s
/// hard-coded 20bps floor (the configured mirror tolerance can widen it, never narrow it).
const MIN_RETRY_REDUCTION_BPS: Decimal = dec!(20);

#[derive(Debug, Error)]
pub enum SwapperError {
    #[error("swap plan has no hops")]
    EmptyPlan,

    #[error("hop {base}/{quote} is not a known market on this venue")]
    UnknownHopMarket { base: Currency, quote: Currency },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    MirrorBelowMinimum(#[from] MirrorBelowMinimum),

    #[error(transparent)]
    Precision(#[from] arbit_instrument::PrecisionError),
}

/// Executes one venue's leg of a detected cycle, grounded on `original_source::Swapper`. A
/// single instance is built per venue (it owns that venue's [`ExchangeAdapter`] and
/// [`SwapperConfig`]) and reused across every [`SwapPlan`] the detector hands it for that venue.
pub struct Swapper {
    adapter: Arc<dyn ExchangeAdapter>,
    config: SwapperConfig,
}

impl Swapper {
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, config: SwapperConfig) -> Self {
        Self { adapter, config }
    }

    pub async fn run(&self, plan: SwapPlan) -> Result<SwapResult, SwapperError> {
        if plan.hops.is_empty() {
            return Err(SwapperError::EmptyPlan);
        }

        match self.config.mode {
            SwapMode::Test => self.run_test(plan).await,
            SwapMode::Real => self.run_real(plan).await,
        }
    }

    /// Ticker-simulated dry run, grounded on `original_source::Swapper.mode == "test"`: no
    /// orders are placed, each hop's output is derived from the venue's current top-of-book
    /// quote so the detector/dispatcher pipeline can be exercised end to end without capital.
    async fn run_test(&self, plan: SwapPlan) -> Result<SwapResult, SwapperError> {
        let markets = self.adapter.load_markets().await?;
        let start_amount = self.resolve_start_amount(&plan).await?;

        let mut amount = start_amount;
        let mut fills = Vec::with_capacity(plan.hops.len());

        for hop in &plan.hops {
            let (market, side) = resolve_hop_market(&markets, hop).ok_or_else(|| SwapperError::UnknownHopMarket {
                base: hop.base.clone(),
                quote: hop.quote.clone(),
            })?;
            let ticker = self.adapter.fetch_ticker(&market).await?;
            let price = match side {
                Side::Sell => ticker.bid,
                Side::Buy => ticker.ask,
            };

            let floor = self
                .config
                .test_min_amounts
                .get(hop.base.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);
            let effective_amount = amount.max(floor);

            let amount_out = match side {
                Side::Sell => effective_amount * price,
                Side::Buy => effective_amount / price,
            };

            fills.push(HopFill {
                base: hop.base.clone(),
                quote: hop.quote.clone(),
                amount_in: effective_amount,
                amount_out,
                order_id: None,
                fees: FeeTotals::new(),
                mirror_last_leg: false,
            });
            amount = amount_out;
        }

        let delta = amount - start_amount;
        let status = classify_round_trip(plan.is_round_trip(), delta);

        Ok(SwapResult {
            ok: !matches!(status, SwapStatus::Failed),
            status,
            amount_in: start_amount,
            amount_out: amount,
            delta,
            fills,
            mark_to_market_delta: None,
        })
    }

    /// Order-placing run, grounded on `original_source::Swapper.mode != "test"`. Every hop but
    /// the last executes immediately; the last hop of a round trip is mirrored as a resting
    /// limit order when `roundtrip_mirror_last_leg` is set (§4.7), otherwise it executes the
    /// same way as any other hop.
    async fn run_real(&self, plan: SwapPlan) -> Result<SwapResult, SwapperError> {
        let markets = self.adapter.load_markets().await?;
        let start_amount = self.resolve_start_amount(&plan).await?;

        let last_index = plan.hops.len() - 1;
        let mirror_last_leg = self.config.roundtrip_mirror_last_leg && plan.is_round_trip() && plan.hops.len() > 1;

        let mut amount = start_amount;
        let mut fills = Vec::with_capacity(plan.hops.len());

        for (index, hop) in plan.hops.iter().enumerate() {
            if mirror_last_leg && index == last_index {
                break;
            }
            let fill = self.execute_hop(&markets, hop, amount).await?;
            amount = fill.amount_out;
            fills.push(fill);
        }

        if !mirror_last_leg {
            let delta = amount - start_amount;
            let status = classify_round_trip(plan.is_round_trip(), delta);
            return Ok(SwapResult {
                ok: !matches!(status, SwapStatus::Failed),
                status,
                amount_in: start_amount,
                amount_out: amount,
                delta,
                fills,
                mark_to_market_delta: None,
            });
        }

        self.run_mirrored_last_leg(plan, markets, start_amount, amount, fills).await
    }

    /// Places the mirrored limit order for the round trip's last hop and drives the TTL
    /// re-emit/relax/force-close ladder, grounded on `original_source::swapper.py`'s
    /// `_mirror_last_leg` loop.
    async fn run_mirrored_last_leg(
        &self,
        plan: SwapPlan,
        markets: HashMap<Market, MarketMetadata>,
        start_amount: Decimal,
        amount_into_last_hop: Decimal,
        mut fills: Vec<HopFill>,
    ) -> Result<SwapResult, SwapperError> {
        let last_hop = plan.hops.last().expect("mirror path only reached for non-empty plans");
        let first_fill = fills.first().ok_or(SwapperError::EmptyPlan)?;
        // `invert` stays false: `resolve_hop_market` always returns the canonical Market for a
        // pair, so a 2-hop round trip's first and last legs resolve to the same Market object
        // rather than two independently oriented ones (see DESIGN.md).
        let first_effective_price = first_fill.amount_out / first_fill.amount_in.max(Decimal::new(1, 18));

        let (last_market, last_side) = resolve_hop_market(&markets, last_hop).ok_or_else(|| SwapperError::UnknownHopMarket {
            base: last_hop.base.clone(),
            quote: last_hop.quote.clone(),
        })?;
        let metadata = *markets.get(&last_market).expect("resolved from this map");

        let entry = mirror::entry_price(first_effective_price, false);
        let entry = mirror::offset_price(entry, last_side, self.config.roundtrip_mirror_price_offset_bps);

        let free_balances = self.adapter.fetch_balance(BalanceKind::Free).await?;
        let free_last_base = free_balances
            .get(&last_hop.base)
            .copied()
            .unwrap_or(amount_into_last_hop);

        let target = mirror::mirror_target(
            last_side,
            amount_into_last_hop,
            free_last_base,
            self.config.roundtrip_mirror_amount_tolerance_bps,
        );
        let mirror_amount = match target {
            mirror::MirrorTarget::SellAmount(a) => mirror::enforce_minimums(a, entry, &metadata)?,
            mirror::MirrorTarget::BuyCost(cost) => mirror::enforce_minimums(cost / entry, entry, &metadata)?,
        };

        let mut protective_bound = metadata.round_price(entry);
        let mut order_id = self
            .place_mirror_order(&last_market, last_side, mirror_amount, protective_bound)
            .await?;

        let mut filled_fill: Option<HopFill> = None;
        let mut attempt: u32 = 0;
        let mut elapsed_sec: u64 = 0;
        let mut timed_out = false;

        // Grounded on `original_source::swapper.py`'s reemit loop guard: the whole ladder (both
        // the re-emit/relax walk and the force-close path below) only runs when both a TTL and a
        // max-attempt count are configured. Left at their zero defaults, the mirror order is
        // simply left resting.
        let reemit_enabled = self.config.mirror_reemit_ttl_sec > 0 && self.config.mirror_reemit_max > 0;

        if reemit_enabled {
            let ttl = self.config.mirror_reemit_ttl_sec;

            while attempt < self.config.mirror_reemit_max {
                sleep(Duration::from_secs(ttl)).await;
                elapsed_sec += ttl;

                // Force-close is gated on elapsed wall-clock time against
                // `mirror_close_timeout_sec`, checked on every tick — not on exhausting
                // `mirror_reemit_max` attempts, which is a separate, independent bound.
                if self.config.mirror_close_timeout_sec > 0 && elapsed_sec >= self.config.mirror_close_timeout_sec {
                    timed_out = true;
                    break;
                }

                let order = self.adapter.fetch_order(&order_id, &last_market).await?;
                if matches!(order.status, OrderStatus::Filled) {
                    filled_fill = Some(mirror_hop_fill(last_hop, last_side, &order));
                    break;
                }

                let ticker = self.adapter.fetch_ticker(&last_market).await?;
                let relax = mirror::relax_used_bps(
                    elapsed_sec,
                    attempt,
                    self.config.mirror_relax_after_sec,
                    self.config.mirror_relax_bps_per_ttl,
                    self.config.mirror_relax_max_bps,
                );

                if let Some(candidate) = mirror::candidate_reemit_price(
                    last_side,
                    ticker.mid(),
                    ticker.bid,
                    ticker.ask,
                    entry,
                    protective_bound,
                    self.config.mirror_reemit_safety_bps,
                    relax,
                ) {
                    let candidate = metadata.round_price(candidate);
                    if mirror::is_meaningful_repriced(candidate, protective_bound) {
                        if let Err(err) = self.adapter.cancel_order(&order_id, &last_market).await {
                            warn!(?err, "mirror re-emit: cancel of stale order failed, proceeding anyway");
                        }
                        order_id = self
                            .place_mirror_order(&last_market, last_side, mirror_amount, candidate)
                            .await?;
                        protective_bound = candidate;
                    }
                }

                attempt += 1;
            }
        }

        let (final_fill, status, mark_to_market_delta) = match filled_fill {
            Some(fill) => {
                let delta = fill.amount_out - start_amount;
                let status = if delta < Decimal::ZERO { SwapStatus::Failed } else { SwapStatus::Ok };
                (fill, status, None)
            }
            None if timed_out => {
                let ticker = self.adapter.fetch_ticker(&last_market).await?;
                let mid = ticker.mid();
                let blocked =
                    mirror::force_close_loss_guard_blocks(last_side, mid, entry, self.config.roundtrip_allow_max_loss_bps);

                if blocked {
                    if let Err(err) = self.adapter.cancel_order(&order_id, &last_market).await {
                        debug!(?err, "mirror pending: cancel of unfilled order failed");
                    }
                    let held_value = mirror_amount * mid;
                    let fill = HopFill {
                        base: last_hop.base.clone(),
                        quote: last_hop.quote.clone(),
                        amount_in: amount_into_last_hop,
                        amount_out: Decimal::ZERO,
                        order_id: Some(order_id),
                        fees: FeeTotals::new(),
                        mirror_last_leg: true,
                    };
                    (fill, SwapStatus::MirrorPending, Some(held_value - amount_into_last_hop))
                } else {
                    if let Err(err) = self.adapter.cancel_order(&order_id, &last_market).await {
                        debug!(?err, "force-close: cancel of unfilled mirror order failed");
                    }
                    let closing = self.execute_hop(&markets, last_hop, mirror_amount).await?;
                    let delta = closing.amount_out - start_amount;
                    let status = if delta < Decimal::ZERO { SwapStatus::Failed } else { SwapStatus::Ok };
                    (closing, status, None)
                }
            }
            None => {
                // Ladder disabled, or exhausted its attempts without ever reaching the
                // force-close timeout: the order is left resting exactly as `original_source`
                // leaves it, with no cancel and no market order. `amount_out: ZERO` falls
                // through the dust-threshold check below into `MirrorPending` the same way a
                // genuinely tiny fill would.
                let fill = HopFill {
                    base: last_hop.base.clone(),
                    quote: last_hop.quote.clone(),
                    amount_in: amount_into_last_hop,
                    amount_out: Decimal::ZERO,
                    order_id: Some(order_id),
                    fees: FeeTotals::new(),
                    mirror_last_leg: true,
                };
                (fill, SwapStatus::MirrorPending, None)
            }
        };

        // A last-leg fill that realized 5% or less of what went into it is dust, not a real
        // close — classify it as pending rather than a completed (and possibly "failed") swap,
        // grounded on `original_source::swapper.py`'s `pending_threshold_units` check.
        let dust_threshold = amount_into_last_hop * dec!(0.05);
        let status = if !matches!(status, SwapStatus::MirrorPending) && final_fill.amount_out <= dust_threshold {
            SwapStatus::MirrorPending
        } else {
            status
        };

        let ok = matches!(status, SwapStatus::Ok | SwapStatus::MirrorPending);
        let amount_out = final_fill.amount_out;
        let delta = if matches!(status, SwapStatus::MirrorPending) {
            Decimal::ZERO
        } else {
            amount_out - start_amount
        };

        fills.push(final_fill);

        Ok(SwapResult {
            ok,
            status,
            amount_in: start_amount,
            amount_out,
            delta,
            fills,
            mark_to_market_delta,
        })
    }

    /// Executes a single non-mirrored hop: resolves the traded market/side, sizes and rounds the
    /// order, places it (retrying once on `InsufficientFunds` per the 20bps floor), optionally
    /// waits out `settle_sleep_ms`, and optionally re-reads the fill via `confirm_fill`.
    async fn execute_hop(
        &self,
        markets: &HashMap<Market, MarketMetadata>,
        hop: &SwapHop,
        amount_in: Decimal,
    ) -> Result<HopFill, SwapperError> {
        let (market, side) = resolve_hop_market(markets, hop).ok_or_else(|| SwapperError::UnknownHopMarket {
            base: hop.base.clone(),
            quote: hop.quote.clone(),
        })?;
        let metadata = *markets.get(&market).expect("resolved from this map");
        let policy = self.adapter.exchange_id().policy();

        let (amount, quote_cost) = match side {
            Side::Sell => (Some(metadata.round_amount(amount_in)?), None),
            Side::Buy if policy.buy_market_uses_quote_cost && self.config.order_type == OrderType::Market => {
                if amount_in < metadata.min_cost {
                    return Err(arbit_instrument::PrecisionError::BelowMinCost {
                        cost: amount_in,
                        min_cost: metadata.min_cost,
                    }
                    .into());
                }
                (None, Some(amount_in))
            }
            Side::Buy => {
                let ticker = self.adapter.fetch_ticker(&market).await?;
                let base_amount = metadata.round_amount(amount_in / ticker.ask)?;
                (Some(base_amount), None)
            }
        };

        let request = OrderRequest {
            market: market.clone(),
            order_type: self.config.order_type,
            side,
            amount,
            quote_cost,
            price: None,
            time_in_force: None,
        };

        let response = match self.adapter.create_order(request.clone()).await {
            Ok(response) => response,
            Err(AdapterError::InsufficientFunds) => {
                let shrink_bps = self.config.roundtrip_mirror_amount_tolerance_bps.max(MIN_RETRY_REDUCTION_BPS);
                let shrink = Decimal::ONE - shrink_bps / Decimal::from(10_000);
                let retried = OrderRequest {
                    amount: request.amount.map(|a| a * shrink),
                    quote_cost: request.quote_cost.map(|c| c * shrink),
                    ..request
                };
                self.adapter.create_order(retried).await?
            }
            Err(err) => return Err(err.into()),
        };

        if self.config.settle_sleep_ms > 0 {
            sleep(Duration::from_millis(self.config.settle_sleep_ms)).await;
        }

        let mut filled = response.filled;
        let mut average = response.average.unwrap_or_default();
        let mut fees = sum_fees(&response.fees);
        let order_id = response.id.clone();

        if self.config.confirm_fill {
            if let Ok(confirmed) = self.adapter.fetch_order(&order_id, &market).await {
                filled = confirmed.filled;
                average = confirmed.average.unwrap_or(average);
                merge_fees(&mut fees, &sum_fees(&confirmed.fees));
            }
        }

        let (amount_in_ccy, amount_out_ccy) = match side {
            Side::Sell => (filled, filled * average),
            Side::Buy => (filled * average, filled),
        };

        Ok(HopFill {
            base: hop.base.clone(),
            quote: hop.quote.clone(),
            amount_in: amount_in_ccy,
            amount_out: amount_out_ccy,
            order_id: Some(order_id),
            fees,
            mirror_last_leg: false,
        })
    }

    async fn place_mirror_order(
        &self,
        market: &Market,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> Result<String, SwapperError> {
        let request = OrderRequest {
            market: market.clone(),
            order_type: OrderType::Limit,
            side,
            amount: Some(amount),
            quote_cost: None,
            price: Some(price),
            time_in_force: Some(self.config.time_in_force),
        };
        let response = self.adapter.create_order(request).await?;
        Ok(response.id)
    }

    /// Resolves the first hop's tradable amount: an explicit `SwapPlan::amount` wins outright,
    /// otherwise falls back to auto-sizing (`crate::sizing`) capped by the free wallet balance,
    /// and finally to the plain free balance when auto-sizing is disabled, grounded on
    /// `original_source::Swapper._resolve_first_hop_amount`.
    async fn resolve_start_amount(&self, plan: &SwapPlan) -> Result<Decimal, SwapperError> {
        if plan.amount > Decimal::ZERO {
            return Ok(plan.amount);
        }

        let start = plan.start_currency().cloned().unwrap_or_else(|| Currency::new("USDT"));
        let balances = self.adapter.fetch_balance(BalanceKind::Free).await?;
        let free = balances.get(&start).copied().unwrap_or(Decimal::ZERO);

        let exchange = self.adapter.exchange_id().to_string();
        let symbol = plan
            .hops
            .first()
            .map(|hop| format!("{}/{}", hop.quote, hop.base))
            .unwrap_or_default();

        let Some(usd_cap) = crate::sizing::compute_auto_cap_usd(&self.config.sizing, &exchange, &symbol) else {
            return Ok(free);
        };

        let stable = matches!(start.as_str(), "USDT" | "USDC" | "BUSD" | "USD");
        let est_price = if stable {
            Decimal::ONE
        } else {
            let market = Market::new(start.clone(), Currency::new("USDT"));
            match self.adapter.fetch_ticker(&market).await {
                Ok(ticker) => ticker.mid(),
                Err(_) => return Ok(free),
            }
        };

        match crate::sizing::usd_cap_to_source_units(usd_cap, est_price) {
            Some(capped) => Ok(capped.min(free)),
            None => Ok(free),
        }
    }
}

/// Determines which [`Market`]/[`Side`] pair trades a hop's (base held, quote wanted)
/// direction, grounded on `original_source`'s ccxt market-orientation lookup: a venue only
/// lists one of the two orientations, so the held currency is either the quote of the listed
/// market (a buy) or its base (a sell).
fn resolve_hop_market(markets: &HashMap<Market, MarketMetadata>, hop: &SwapHop) -> Option<(Market, Side)> {
    let direct = Market::new(hop.base.clone(), hop.quote.clone());
    if markets.contains_key(&direct) {
        return Some((direct, Side::Sell));
    }

    let inverted = Market::new(hop.quote.clone(), hop.base.clone());
    if markets.contains_key(&inverted) {
        return Some((inverted, Side::Buy));
    }

    None
}

fn mirror_hop_fill(hop: &SwapHop, side: Side, response: &OrderResponse) -> HopFill {
    let average = response.average.unwrap_or_default();
    let (amount_in, amount_out) = match side {
        Side::Sell => (response.filled, response.filled * average),
        Side::Buy => (response.filled * average, response.filled),
    };

    HopFill {
        base: hop.base.clone(),
        quote: hop.quote.clone(),
        amount_in,
        amount_out,
        order_id: Some(response.id.clone()),
        fees: sum_fees(&response.fees),
        mirror_last_leg: true,
    }
}

/// The unconditional round-trip guardrail (§4.7): a round trip that lands with `delta < 0`
/// is always `Failed`, regardless of how individual hops reported their own status.
fn classify_round_trip(is_round_trip: bool, delta: Decimal) -> SwapStatus {
    if is_round_trip && delta < Decimal::ZERO {
        SwapStatus::Failed
    } else {
        SwapStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_data::adapter::mock::MockAdapter;
    use arbit_instrument::{ExchangeId, Ticker};

    fn metadata() -> MarketMetadata {
        MarketMetadata {
            active: true,
            min_amount: dec!(0.0001),
            min_cost: dec!(1),
            amount_precision: 6,
            price_precision: 2,
        }
    }

    fn seeded_adapter() -> MockAdapter {
        let adapter = MockAdapter::new(ExchangeId::Mock)
            .with_market(Market::new("BTC", "USDT"), metadata())
            .with_market(Market::new("ETH", "BTC"), metadata())
            .with_market(Market::new("ETH", "USDT"), metadata());

        adapter.seed_ticker(
            Market::new("BTC", "USDT"),
            Ticker {
                market: Market::new("BTC", "USDT"),
                bid: dec!(100),
                ask: dec!(100.1),
                last: dec!(100),
                quote_volume: None,
            },
        );
        adapter.seed_ticker(
            Market::new("ETH", "BTC"),
            Ticker {
                market: Market::new("ETH", "BTC"),
                bid: dec!(0.05),
                ask: dec!(0.0501),
                last: dec!(0.05),
                quote_volume: None,
            },
        );
        adapter.seed_ticker(
            Market::new("ETH", "USDT"),
            Ticker {
                market: Market::new("ETH", "USDT"),
                bid: dec!(5),
                ask: dec!(5.01),
                last: dec!(5),
                quote_volume: None,
            },
        );
        adapter.seed_balance(Currency::new("USDT"), dec!(1000));
        adapter
    }

    fn round_trip_plan() -> SwapPlan {
        SwapPlan {
            exchange: ExchangeId::Mock,
            hops: vec![
                SwapHop::new("USDT", "BTC"),
                SwapHop::new("BTC", "ETH"),
                SwapHop::new("ETH", "USDT"),
            ],
            amount: dec!(100),
        }
    }

    /// A plain two-hop round trip (same market both ways), the shape the mirror path's entry
    /// price derivation assumes.
    fn two_hop_round_trip_plan() -> SwapPlan {
        SwapPlan {
            exchange: ExchangeId::Mock,
            hops: vec![SwapHop::new("USDT", "BTC"), SwapHop::new("BTC", "USDT")],
            amount: dec!(100),
        }
    }

    #[tokio::test]
    async fn test_mode_simulates_every_hop_without_placing_orders() {
        let adapter = seeded_adapter();
        let swapper = Swapper::new(Arc::new(adapter), SwapperConfig::default());

        let result = swapper.run(round_trip_plan()).await.unwrap();
        assert_eq!(result.fills.len(), 3);
        assert!(result.fills.iter().all(|fill| fill.order_id.is_none()));
        assert_eq!(result.amount_in, dec!(100));
    }

    #[tokio::test]
    async fn real_mode_without_mirror_places_an_order_per_hop() {
        let adapter = seeded_adapter();
        let swapper = Swapper::new(
            Arc::new(adapter),
            SwapperConfig {
                mode: SwapMode::Real,
                ..SwapperConfig::default()
            },
        );

        let result = swapper.run(round_trip_plan()).await.unwrap();
        assert_eq!(result.fills.len(), 3);
        assert!(result.fills.iter().all(|fill| fill.order_id.is_some()));
    }

    #[tokio::test]
    async fn empty_plan_is_rejected() {
        let adapter = seeded_adapter();
        let swapper = Swapper::new(Arc::new(adapter), SwapperConfig::default());
        let plan = SwapPlan {
            exchange: ExchangeId::Mock,
            hops: Vec::new(),
            amount: Decimal::ZERO,
        };
        assert!(matches!(swapper.run(plan).await, Err(SwapperError::EmptyPlan)));
    }

    #[tokio::test]
    async fn unknown_hop_market_is_rejected() {
        let adapter = seeded_adapter();
        let swapper = Swapper::new(Arc::new(adapter), SwapperConfig::default());
        let plan = SwapPlan {
            exchange: ExchangeId::Mock,
            hops: vec![SwapHop::new("XXX", "YYY")],
            amount: dec!(10),
        };
        assert!(matches!(
            swapper.run(plan).await,
            Err(SwapperError::UnknownHopMarket { .. })
        ));
    }

    fn mirror_config(overrides: impl FnOnce(SwapperConfig) -> SwapperConfig) -> SwapperConfig {
        overrides(SwapperConfig {
            mode: SwapMode::Real,
            roundtrip_mirror_last_leg: true,
            ..SwapperConfig::default()
        })
    }

    #[tokio::test]
    async fn mirror_ladder_disabled_by_default_leaves_the_order_resting() {
        let adapter = seeded_adapter();
        adapter.hold_limit_orders_open();
        let adapter = Arc::new(adapter);

        let swapper = Swapper::new(adapter.clone(), mirror_config(|c| c));
        let result = swapper.run(two_hop_round_trip_plan()).await.unwrap();

        assert_eq!(result.status, SwapStatus::MirrorPending);
        assert!(result.ok);

        let mirror_fill = result.fills.last().expect("mirror fill present");
        let order_id = mirror_fill.order_id.as_ref().expect("mirror order was placed");
        let order = adapter
            .fetch_order(order_id, &Market::new("BTC", "USDT"))
            .await
            .expect("mirror order was never canceled");
        assert_eq!(
            order.status,
            OrderStatus::Open,
            "a disabled reemit ladder must never force-close the resting mirror order"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_reemit_attempts_without_reaching_the_timeout_still_leaves_it_resting() {
        let adapter = seeded_adapter();
        adapter.hold_limit_orders_open();
        let adapter = Arc::new(adapter);

        let swapper = Swapper::new(
            adapter,
            mirror_config(|c| SwapperConfig {
                mirror_reemit_ttl_sec: 1,
                mirror_reemit_max: 2,
                mirror_close_timeout_sec: 100,
                ..c
            }),
        );
        let result = swapper.run(two_hop_round_trip_plan()).await.unwrap();

        assert_eq!(
            result.status,
            SwapStatus::MirrorPending,
            "running out of reemit attempts is not the same as reaching mirror_close_timeout_sec"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_the_close_timeout_force_closes_with_the_loss_guard_disabled() {
        let adapter = seeded_adapter();
        adapter.hold_limit_orders_open();
        let adapter = Arc::new(adapter);

        let swapper = Swapper::new(
            adapter,
            mirror_config(|c| SwapperConfig {
                mirror_reemit_ttl_sec: 1,
                mirror_reemit_max: 5,
                mirror_close_timeout_sec: 1,
                roundtrip_allow_max_loss_bps: Decimal::ZERO,
                ..c
            }),
        );
        let result = swapper.run(two_hop_round_trip_plan()).await.unwrap();

        assert_ne!(
            result.status,
            SwapStatus::MirrorPending,
            "with the loss guard off, a timed-out mirror order must be force-closed via a market order"
        );
        assert_eq!(result.fills.len(), 2);
    }
}
