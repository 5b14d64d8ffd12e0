use arbit_data::adapter::mock::MockAdapter;
use arbit_data::{ExchangeAdapter, OrderStatus};
use arbit_execution::{SwapHop, SwapMode, SwapPlan, SwapStatus, Swapper, SwapperConfig};
use arbit_instrument::{Currency, ExchangeId, Market, MarketMetadata, Ticker};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

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
    let adapter = MockAdapter::new(ExchangeId::Mock).with_market(Market::new("BTC", "USDT"), metadata());
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
    adapter.seed_balance(Currency::new("USDT"), dec!(1000));
    adapter
}

fn two_hop_round_trip_plan() -> SwapPlan {
    SwapPlan {
        exchange: ExchangeId::Mock,
        hops: vec![SwapHop::new("USDT", "BTC"), SwapHop::new("BTC", "USDT")],
        amount: dec!(100),
    }
}

fn mirror_config(overrides: impl FnOnce(SwapperConfig) -> SwapperConfig) -> SwapperConfig {
    overrides(SwapperConfig {
        mode: SwapMode::Real,
        roundtrip_mirror_last_leg: true,
        ..SwapperConfig::default()
    })
}

/// With the reemit ladder left at its shipped defaults (`mirror_reemit_max: 0`), a mirror
/// order that hasn't filled must be left resting rather than force-closed.
#[tokio::test]
async fn mirror_ladder_disabled_by_default_leaves_the_order_resting() {
    let adapter = seeded_adapter();
    adapter.hold_limit_orders_open();
    let adapter = Arc::new(adapter);

    let swapper = Swapper::new(adapter.clone(), mirror_config(|c| c));
    let result = swapper.run(two_hop_round_trip_plan()).await.unwrap();

    assert_eq!(result.status, SwapStatus::MirrorPending);

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

/// Exhausting every re-emit attempt without ever reaching `mirror_close_timeout_sec` is not
/// the same as timing out: the order stays resting either way.
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

    assert_eq!(result.status, SwapStatus::MirrorPending);
}

/// Once elapsed time actually clears `mirror_close_timeout_sec`, and the loss guard is off,
/// the mirror order gets force-closed via a market order.
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
