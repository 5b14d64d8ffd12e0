use arbit_execution::{SwapHop, SwapPlan, SwapResult, Swapper};
use arbit_instrument::{Currency, ExchangeId};
use arbit_risk::PauseGate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// One venue's slice of [`Dispatcher`] configuration (the `per_exchange_concurrency` /
/// `min_amounts` / `emergency_on_negative` keys of spec §6).
#[derive(Debug, Clone)]
pub struct DispatcherVenueConfig {
    pub per_venue_concurrency: usize,
    pub min_amount: Decimal,
    pub emergency_on_negative: bool,
}

/// Per-venue dispatch gate and worker, grounded on `original_source/dispatcher.py`'s
/// `RadarDispatcher`: one instance owns a venue's [`Swapper`], its non-blocking
/// per-venue concurrency [`Semaphore`], and its [`PauseGate`] entry.
pub struct VenueDispatcher {
    exchange: ExchangeId,
    swapper: Swapper,
    pause: Arc<PauseGate>,
    config: DispatcherVenueConfig,
    slots: Semaphore,
}

/// Why a candidate cycle never reached the [`Swapper`], grounded on
/// `original_source/dispatcher.py`'s early-return skip paths — every one of these is a routine
/// skip the dispatcher logs at `debug` and moves on from, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchSkip {
    VenuePaused,
    NoFreeWorkerSlot,
    BelowMinAmount,
}

/// Why [`VenueDispatcher::dispatch`] didn't return a [`SwapResult`]: either it never reached the
/// [`Swapper`] ([`DispatchSkip`]) or the [`Swapper`] itself failed outright. Spec §7: the
/// dispatcher absorbs both and moves on to the next cycle rather than propagating.
#[derive(Debug, thiserror::Error)]
pub enum DispatchFailure {
    #[error("dispatch skipped: {0:?}")]
    Skipped(DispatchSkip),
    #[error(transparent)]
    SwapFailed(#[from] arbit_execution::SwapperError),
}

impl VenueDispatcher {
    pub fn new(exchange: ExchangeId, swapper: Swapper, pause: Arc<PauseGate>, config: DispatcherVenueConfig) -> Self {
        let slots = Semaphore::new(config.per_venue_concurrency.max(1));
        Self {
            exchange,
            swapper,
            pause,
            config,
            slots,
        }
    }

    /// Dispatch a single detected cycle (spec §4.8): skip if the venue is paused, skip if no
    /// worker slot is free right now (this never blocks — a busy venue just misses this
    /// iteration's opportunity), read the anchor's free balance and skip below `min_amount`,
    /// then hand the sized plan to the venue's [`Swapper`] and feed the outcome back to the
    /// [`PauseGate`].
    pub async fn dispatch(&self, hops: Vec<SwapHop>, anchor_balance: Decimal) -> Result<SwapResult, DispatchFailure> {
        if self.pause.is_paused(self.exchange) {
            debug!(exchange = %self.exchange, "venue paused, skipping this cycle");
            return Err(DispatchFailure::Skipped(DispatchSkip::VenuePaused));
        }

        let Ok(permit) = self.slots.try_acquire() else {
            debug!(exchange = %self.exchange, "no free worker slot for this venue this iteration");
            return Err(DispatchFailure::Skipped(DispatchSkip::NoFreeWorkerSlot));
        };

        if anchor_balance < self.config.min_amount {
            debug!(exchange = %self.exchange, %anchor_balance, min_amount = %self.config.min_amount, "anchor balance below min_amount, skipping");
            return Err(DispatchFailure::Skipped(DispatchSkip::BelowMinAmount));
        }

        let plan = SwapPlan {
            exchange: self.exchange,
            hops,
            amount: anchor_balance,
        };

        let result = self.swapper.run(plan).await;
        drop(permit);

        match result {
            Ok(outcome) => {
                self.pause
                    .observe_swap_outcome(self.exchange, self.config.emergency_on_negative, outcome.ok, outcome.delta);
                if self.pause.is_paused(self.exchange) {
                    warn!(exchange = %self.exchange, delta = %outcome.delta, "venue paused after an emergency-negative outcome");
                }
                Ok(outcome)
            }
            Err(error) => {
                info!(exchange = %self.exchange, %error, "swap plan failed");
                Err(DispatchFailure::from(error))
            }
        }
    }
}

/// Global worker-pool bound across every venue (spec §4.8's `max_workers`), distinct from each
/// [`VenueDispatcher`]'s own non-blocking per-venue gate: this one genuinely blocks a caller
/// until a slot opens, bounding total in-flight swaps regardless of how they're spread across
/// venues.
pub struct WorkerPool {
    slots: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    pub async fn acquire(&self) -> tokio::sync::OwnedSemaphorePermit {
        self.slots
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore is never closed")
    }
}

/// Routes a detected cycle to the owning venue's [`VenueDispatcher`], grounded on
/// `original_source/dispatcher.py`'s top-level loop dispatching by exchange id rather than
/// maintaining one dispatcher per cycle.
pub struct Dispatcher {
    venues: HashMap<ExchangeId, VenueDispatcher>,
    pool: WorkerPool,
}

impl Dispatcher {
    pub fn new(venues: HashMap<ExchangeId, VenueDispatcher>, max_workers: usize) -> Self {
        Self {
            venues,
            pool: WorkerPool::new(max_workers),
        }
    }

    pub async fn dispatch(&self, exchange: ExchangeId, hops: Vec<SwapHop>, anchor_balance: Decimal) -> Option<Result<SwapResult, DispatchFailure>> {
        let venue = self.venues.get(&exchange)?;
        let _global_permit = self.pool.acquire().await;
        Some(venue.dispatch(hops, anchor_balance).await)
    }
}

pub fn swap_hop(base: impl Into<Currency>, quote: impl Into<Currency>) -> SwapHop {
    SwapHop::new(base, quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_data::adapter::mock::MockAdapter;
    use arbit_execution::{SizingConfig, SwapMode, SwapperConfig};
    use arbit_instrument::{Market, MarketMetadata, Ticker};
    use rust_decimal_macros::dec;

    fn metadata() -> MarketMetadata {
        MarketMetadata {
            active: true,
            min_amount: Decimal::ZERO,
            min_cost: Decimal::ZERO,
            amount_precision: 8,
            price_precision: 8,
        }
    }

    fn make_dispatcher(min_amount: Decimal, concurrency: usize) -> VenueDispatcher {
        let market = Market::new("BTC", "USDT");
        let adapter = MockAdapter::new(ExchangeId::Mock).with_market(market.clone(), metadata());
        adapter.seed_ticker(
            market.clone(),
            Ticker {
                market,
                bid: dec!(100),
                ask: dec!(101),
                last: dec!(100.5),
                quote_volume: Some(dec!(1_000_000)),
            },
        );
        let swapper = Swapper::new(Arc::new(adapter), SwapperConfig {
            mode: SwapMode::Test,
            sizing: SizingConfig::default(),
            ..SwapperConfig::default()
        });
        let pause = Arc::new(PauseGate::new());
        VenueDispatcher::new(
            ExchangeId::Mock,
            swapper,
            pause,
            DispatcherVenueConfig {
                per_venue_concurrency: concurrency,
                min_amount,
                emergency_on_negative: true,
            },
        )
    }

    #[tokio::test]
    async fn balance_below_min_amount_is_skipped() {
        let dispatcher = make_dispatcher(dec!(10), 1);
        let result = dispatcher.dispatch(vec![swap_hop("USDT", "BTC")], dec!(1)).await;
        assert!(matches!(result.unwrap_err(), DispatchFailure::Skipped(DispatchSkip::BelowMinAmount)));
    }

    #[tokio::test]
    async fn paused_venue_is_skipped_before_touching_balance() {
        let dispatcher = make_dispatcher(dec!(10), 1);
        dispatcher.pause.pause(ExchangeId::Mock);
        let result = dispatcher.dispatch(vec![swap_hop("USDT", "BTC")], dec!(1000)).await;
        assert!(matches!(result.unwrap_err(), DispatchFailure::Skipped(DispatchSkip::VenuePaused)));
    }

    #[tokio::test]
    async fn a_sized_plan_is_handed_to_the_swapper() {
        let dispatcher = make_dispatcher(dec!(10), 1);
        let result = dispatcher.dispatch(vec![swap_hop("USDT", "BTC")], dec!(1000)).await;
        assert!(result.is_ok());
    }
}
