use crate::config::{EngineConfig, RunMode};
use crate::cycle::{detect_bf_cycles, detect_triangular, BfConfig, Cycle, TriConfig, TriOpportunity};
use crate::depth::{revalidate, DepthRevalidatorConfig};
use crate::dispatcher::{Dispatcher, DispatcherVenueConfig, VenueDispatcher};
use crate::graph::{build_rate_graph, GraphBuilderConfig};
use crate::report::{format_path, BfRow, ReportSink, TriRow};
use arbit_data::adapter::{AdapterError, BalanceKind};
use arbit_data::books::cache::PartialBookCache;
use arbit_data::ExchangeAdapter;
use arbit_execution::{SwapHop, Swapper};
use arbit_instrument::{Currency, ExchangeId};
use arbit_risk::{PauseGate, PersistenceTracker};
use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine builder is missing required component: {0}")]
    BuilderIncomplete(&'static str),
}

/// Remote control surface for a running [`Engine`], grounded on the teacher's `Command` enum:
/// a venue-level pause lever plus a graceful shutdown, both actionable without tearing the
/// engine down and rebuilding it.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Pause(ExchangeId),
    Resume(ExchangeId),
    Terminate,
}

/// One venue's runtime handles: its adapter and the partial-depth cache the depth revalidator
/// reads from when `use_ws` is set.
struct VenueContext {
    adapter: Arc<dyn ExchangeAdapter>,
    book_cache: PartialBookCache,
}

/// Lego components for constructing an [`Engine`], mirroring the teacher's `TraderLego`
/// constructor-argument bundle.
pub struct EngineLego {
    pub config: EngineConfig,
    pub adapters: HashMap<ExchangeId, Arc<dyn ExchangeAdapter>>,
    pub report: Arc<dyn ReportSink>,
    pub command_rx: mpsc::Receiver<EngineCommand>,
}

/// Top-level iteration-loop orchestrator (spec §4/§7): builds each venue's rate graph from its
/// current tickers, runs the configured detector, optionally revalidates the winning cycle
/// against live depth, tracks persistence, emits report rows, and hands profitable cycles to the
/// [`Dispatcher`]. Grounded on the teacher's `Trader::run` event loop, collapsed to a single
/// venue-fanned-out iteration since this engine has no market-data/strategy/portfolio split to
/// preserve.
pub struct Engine {
    config: EngineConfig,
    venues: HashMap<ExchangeId, VenueContext>,
    dispatcher: Dispatcher,
    pause: Arc<PauseGate>,
    persistence: Arc<PersistenceTracker>,
    report: Arc<dyn ReportSink>,
    command_rx: mpsc::Receiver<EngineCommand>,
    iteration: u64,
}

impl Engine {
    pub fn new(lego: EngineLego) -> Result<Self, EngineError> {
        if lego.adapters.is_empty() {
            return Err(EngineError::BuilderIncomplete("adapters"));
        }

        let pause = Arc::new(PauseGate::new());
        let mut venues = HashMap::with_capacity(lego.adapters.len());
        let mut venue_dispatchers = HashMap::with_capacity(lego.adapters.len());

        for (exchange, adapter) in lego.adapters {
            let swapper = Swapper::new(adapter.clone(), lego.config.swapper.clone());
            let venue_dispatcher = VenueDispatcher::new(
                exchange,
                swapper,
                pause.clone(),
                DispatcherVenueConfig {
                    per_venue_concurrency: lego.config.dispatcher.per_exchange_concurrency,
                    min_amount: lego.config.dispatcher.min_amount_for(exchange),
                    emergency_on_negative: lego.config.dispatcher.emergency_on_negative,
                },
            );
            venue_dispatchers.insert(exchange, venue_dispatcher);
            venues.insert(
                exchange,
                VenueContext {
                    adapter,
                    book_cache: PartialBookCache::new(),
                },
            );
        }

        let dispatcher = Dispatcher::new(venue_dispatchers, lego.config.dispatcher.max_workers);

        Ok(Self {
            config: lego.config,
            venues,
            dispatcher,
            pause,
            persistence: Arc::new(PersistenceTracker::new()),
            report: lego.report,
            command_rx: lego.command_rx,
            iteration: 0,
        })
    }

    /// Run the iteration loop until an [`EngineCommand::Terminate`] is received, or the remote
    /// command channel is dropped (treated the same as a graceful terminate request).
    pub async fn run(mut self) {
        'running: loop {
            while let Some(command) = self.receive_remote_command() {
                match command {
                    EngineCommand::Terminate => break 'running,
                    EngineCommand::Pause(venue) => self.pause.pause(venue),
                    EngineCommand::Resume(venue) => self.pause.resume(venue),
                }
            }

            self.iteration += 1;
            let deadline = Duration::from_secs(self.config.iter_timeout_sec.max(1));
            if tokio::time::timeout(deadline, self.run_iteration()).await.is_err() {
                warn!(iteration = self.iteration, "iteration exceeded iter_timeout_sec, moving on");
            }
        }
    }

    fn receive_remote_command(&mut self) -> Option<EngineCommand> {
        match self.command_rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("engine command channel dropped, synthesising a Terminate");
                Some(EngineCommand::Terminate)
            }
        }
    }

    /// Fan out one detection/dispatch pass across every configured venue concurrently; a single
    /// venue's failure (adapter error, empty universe) is logged and never aborts the others.
    async fn run_iteration(&self) {
        let tasks = self.venues.iter().map(|(exchange, ctx)| async move {
            if let Err(error) = self.run_venue_iteration(*exchange, ctx).await {
                warn!(%exchange, %error, "iteration failed for venue");
            }
        });
        join_all(tasks).await;
    }

    async fn run_venue_iteration(&self, exchange: ExchangeId, ctx: &VenueContext) -> Result<(), AdapterError> {
        match self.config.mode {
            RunMode::Bf => self.run_bf(exchange, ctx).await,
            RunMode::Tri => self.run_tri(exchange, ctx).await,
            RunMode::Balance => self.run_balance(exchange, ctx).await,
            RunMode::Health => self.run_health(exchange, ctx).await,
        }
    }

    async fn run_bf(&self, exchange: ExchangeId, ctx: &VenueContext) -> Result<(), AdapterError> {
        let tickers = ctx.adapter.fetch_tickers().await?;

        let graph_config = GraphBuilderConfig {
            anchors: self.config.bf_allowed_quotes.clone(),
            fee: self.config.bf.fee,
            require_topofbook: self.config.bf.require_topofbook,
            min_quote_vol: self.config.bf.min_quote_vol,
            currencies_limit: self.config.bf.currencies_limit,
            require_dual_quote: self.config.bf.require_dual_quote,
            rank_by_liquidity: self.config.bf.rank_by_liquidity,
        };
        let graph = match build_rate_graph(exchange, &tickers, &graph_config) {
            Ok(graph) => graph,
            Err(error) => {
                debug!(%exchange, %error, "no bf universe this iteration");
                return Ok(());
            }
        };

        let bf_config = BfConfig {
            min_hops: self.config.bf.min_hops,
            max_hops: self.config.bf.max_hops,
            min_net_pct: self.config.bf.min_net,
            min_net_per_hop_pct: self.config.bf.min_net_per_hop,
            require_quote: self.config.bf.require_quote,
            anchor_priority: self.config.bf_allowed_quotes.clone(),
            blacklist: Default::default(),
            top: self.config.bf.top,
        };

        for cycle in detect_bf_cycles(&graph, &bf_config) {
            self.handle_bf_cycle(exchange, ctx, cycle).await;
        }

        Ok(())
    }

    async fn handle_bf_cycle(&self, exchange: ExchangeId, ctx: &VenueContext, cycle: Cycle) {
        let hops = cycle_hops(&cycle.path);
        let path_label = closed_path_label(&cycle.path);
        let inv = self.anchor_balance(ctx, &cycle.path[0]).await;

        let mut net_pct = cycle.net_pct;
        let mut net_pct_raw = None;
        let mut slippage_bps = None;
        let mut fee_bps_total = None;

        if self.config.bf.revalidate_depth {
            let markets = match ctx.adapter.load_markets().await {
                Ok(markets) => markets,
                Err(error) => {
                    warn!(%exchange, %error, "failed to load markets for depth revalidation");
                    return;
                }
            };
            let depth_config = DepthRevalidatorConfig {
                depth_levels: self.config.bf.depth_levels,
                use_ws: self.config.bf.use_ws,
                max_book_age_ms: self.config.bf.max_book_age_ms,
                fee: self.config.bf.fee,
                min_net_pct: self.config.bf.min_net,
                min_net_per_hop_pct: self.config.bf.min_net_per_hop,
                latency_penalty_bps: self.config.bf.latency_penalty_bps,
            };
            match revalidate(&*ctx.adapter, &ctx.book_cache, &markets, &hops, inv, &depth_config).await {
                Ok(Some(revalidation)) => {
                    net_pct_raw = Some(cycle.net_pct);
                    net_pct = revalidation.net_pct;
                    let total_slippage: Decimal = revalidation.hops.iter().map(|hop| hop.slippage_bps).sum();
                    slippage_bps = Some(total_slippage);
                    fee_bps_total = Some(self.config.bf.fee * Decimal::from(10_000) * Decimal::from(hops.len() as u64));
                }
                Ok(None) => {
                    debug!(%exchange, path = %path_label, "cycle rejected by depth revalidation");
                    return;
                }
                Err(error) => {
                    warn!(%exchange, %error, "depth revalidation error");
                    return;
                }
            }
        }

        let est_after = inv * (Decimal::ONE + net_pct / Decimal::from(100));
        let key = (exchange, path_label.clone());
        self.persistence.observe(key, Utc::now(), self.iteration);

        if let Err(error) = self.report.emit_bf_row(&BfRow {
            exchange,
            path: path_label,
            net_pct,
            inv,
            est_after,
            hops: cycle.hops,
            iteration: self.iteration,
            ts: Utc::now(),
            net_pct_raw,
            slippage_bps,
            fee_bps_total,
            used_ws: self.config.bf.revalidate_depth.then_some(self.config.bf.use_ws),
        }) {
            warn!(%exchange, %error, "failed to emit bf report row");
        }

        self.dispatch(exchange, hops, inv).await;
    }

    async fn run_tri(&self, exchange: ExchangeId, ctx: &VenueContext) -> Result<(), AdapterError> {
        let tickers = ctx.adapter.fetch_tickers().await?;

        let tri_config = TriConfig {
            anchor: self.config.quote.clone(),
            fee: self.config.tri.fee,
            require_topofbook: self.config.tri.require_topofbook,
            min_quote_vol: self.config.tri.min_quote_vol,
            currencies_limit: self.config.tri.currencies_limit,
            fee_bps_per_hop: self.config.tri.fee_bps_per_hop,
            latency_penalty_bps: self.config.tri.latency_penalty_bps,
            min_net_bps: self.config.tri.min_net_bps,
            blacklist: Default::default(),
        };

        for opportunity in detect_triangular(&tickers, &tri_config) {
            self.handle_tri_opportunity(exchange, ctx, opportunity).await;
        }

        Ok(())
    }

    async fn handle_tri_opportunity(&self, exchange: ExchangeId, ctx: &VenueContext, opportunity: TriOpportunity) {
        let path = vec![opportunity.anchor.clone(), opportunity.x.clone(), opportunity.y.clone()];
        let hops = cycle_hops(&path);
        let path_label = closed_path_label(&path);
        let inv = self.anchor_balance(ctx, &opportunity.anchor).await;
        let net_pct = opportunity.net_bps / Decimal::from(100);
        let est_after = inv * (Decimal::ONE + net_pct / Decimal::from(100));

        if let Err(error) = self.report.emit_tri_row(&TriRow {
            exchange,
            path: path_label,
            r1: opportunity.r1,
            r2: opportunity.r2,
            r3: opportunity.r3,
            net_pct,
            inv,
            est_after,
            iteration: self.iteration,
            ts: Utc::now(),
        }) {
            warn!(%exchange, %error, "failed to emit tri report row");
        }

        self.dispatch(exchange, hops, inv).await;
    }

    /// `mode: balance` (spec §6): a connectivity/funding check with no detection pass, grounded
    /// on `original_source`'s `--mode balance` CLI switch that only ever printed wallet state.
    async fn run_balance(&self, exchange: ExchangeId, ctx: &VenueContext) -> Result<(), AdapterError> {
        let balances = ctx.adapter.fetch_balance(BalanceKind::Free).await?;
        let quote_balance = balances.get(&self.config.quote).copied().unwrap_or(Decimal::ZERO);
        info!(%exchange, quote = %self.config.quote, balance = %quote_balance, "balance check");
        Ok(())
    }

    /// `mode: health` (spec §6): confirm the venue still answers market-data requests without
    /// running any detector, risking no dispatch.
    async fn run_health(&self, exchange: ExchangeId, ctx: &VenueContext) -> Result<(), AdapterError> {
        let tickers = ctx.adapter.fetch_tickers().await?;
        info!(%exchange, ticker_count = tickers.len(), "health check");
        Ok(())
    }

    /// Read the venue's current free balance of `currency`, the amount [`VenueDispatcher::dispatch`]
    /// sizes the plan against. A fetch failure is treated as zero funds available rather than
    /// aborting the cycle — the dispatcher's `min_amount` gate then naturally skips it.
    async fn anchor_balance(&self, ctx: &VenueContext, currency: &Currency) -> Decimal {
        match ctx.adapter.fetch_balance(BalanceKind::Free).await {
            Ok(balances) => balances.get(currency).copied().unwrap_or(Decimal::ZERO),
            Err(error) => {
                warn!(%error, %currency, "failed to read free balance");
                Decimal::ZERO
            }
        }
    }

    async fn dispatch(&self, exchange: ExchangeId, hops: Vec<SwapHop>, anchor_balance: Decimal) {
        match self.dispatcher.dispatch(exchange, hops, anchor_balance).await {
            Some(Ok(outcome)) => {
                info!(%exchange, ok = outcome.ok, delta = %outcome.delta, "dispatched swap plan");
            }
            Some(Err(error)) => {
                debug!(%exchange, %error, "swap plan not executed");
            }
            None => {
                debug!(%exchange, "no dispatcher registered for this venue");
            }
        }
    }
}

/// Render a closed cycle path (`path[0]` repeated at the end) the way every report row expects
/// it, e.g. `USDT->BTC->ETH->USDT`.
fn closed_path_label(path: &[Currency]) -> String {
    let mut rendered: Vec<Currency> = path.to_vec();
    if let Some(first) = path.first() {
        rendered.push(first.clone());
    }
    format_path(rendered)
}

/// Turn a closed currency path into consecutive [`SwapHop`]s, wrapping the last currency back to
/// the first so the resulting [`arbit_execution::SwapPlan`] is a round trip.
fn cycle_hops(path: &[Currency]) -> Vec<SwapHop> {
    path.iter()
        .enumerate()
        .map(|(index, currency)| {
            let next = &path[(index + 1) % path.len()];
            SwapHop::new(currency.clone(), next.clone())
        })
        .collect()
}
