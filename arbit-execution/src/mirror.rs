use arbit_instrument::{MarketMetadata, Side};
use rust_decimal::Decimal;

/// Normalize the first hop's realized unit price to last-hop quote-per-base terms, grounded on
/// `original_source::swapper.py`'s `first_hop_unit_price_q_per_b` derivation: `invert` is true
/// when the first hop's (base, quote) pair is the last hop's (quote, base) — i.e. the two hops
/// trade the same pair in opposite orientation.
pub fn entry_price(first_hop_effective_price: Decimal, invert: bool) -> Decimal {
    if invert {
        Decimal::ONE / first_hop_effective_price
    } else {
        first_hop_effective_price
    }
}

/// Apply `price_offset_bps` to the entry price, grounded on `original_source`'s
/// `roundtrip_mirror_price_offset_bps` application: buys look for a discount, sells for a
/// premium, so the mirror crosses the spread a little less aggressively than top-of-book entry.
pub fn offset_price(entry: Decimal, side: Side, offset_bps: Decimal) -> Decimal {
    let offset = offset_bps / Decimal::from(10_000);
    match side {
        Side::Buy => entry * (Decimal::ONE - offset),
        Side::Sell => entry * (Decimal::ONE + offset),
    }
}

/// Target amount/cost for the mirrored last-leg order, grounded on `original_source`'s
/// sell/buy amount derivation.
pub enum MirrorTarget {
    /// Sell `amount` units of the last hop's base currency.
    SellAmount(Decimal),
    /// Spend `cost` units of the last hop's quote currency, to be converted to a base quantity
    /// via `cost / price` once the limit price is known.
    BuyCost(Decimal),
}

/// Derive the mirror target from the first hop's realized output and the current free balance,
/// grounded on `original_source`'s shortfall-tolerance handling: a sell-side shortfall within
/// `amount_tolerance_bps` of the first hop's output is absorbed by trading the smaller free
/// balance instead of failing outright.
pub fn mirror_target(
    side: Side,
    first_hop_out_amount: Decimal,
    current_free_balance: Decimal,
    amount_tolerance_bps: Decimal,
) -> MirrorTarget {
    match side {
        Side::Sell => {
            let tolerance = first_hop_out_amount * amount_tolerance_bps / Decimal::from(10_000);
            let shortfall = first_hop_out_amount - current_free_balance;
            let amount = if shortfall > Decimal::ZERO && shortfall <= tolerance {
                current_free_balance
            } else {
                first_hop_out_amount
            };
            MirrorTarget::SellAmount(amount)
        }
        Side::Buy => MirrorTarget::BuyCost(first_hop_out_amount),
    }
}

/// Whether `target` clears `metadata`'s minimum amount/cost requirements, bumping up to the
/// minimum when the wallet can cover it — grounded on `original_source`'s
/// `mirror_below_min_*` failure path.
pub fn enforce_minimums(amount: Decimal, price: Decimal, metadata: &MarketMetadata) -> Result<Decimal, MirrorBelowMinimum> {
    let mut amount = amount;
    if amount < metadata.min_amount {
        return Err(MirrorBelowMinimum::Amount {
            amount,
            min_amount: metadata.min_amount,
        });
    }

    let cost = amount * price;
    if cost < metadata.min_cost {
        let bumped = metadata.min_cost / price;
        if bumped < metadata.min_amount {
            return Err(MirrorBelowMinimum::Cost {
                cost,
                min_cost: metadata.min_cost,
            });
        }
        amount = bumped;
    }

    Ok(amount)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MirrorBelowMinimum {
    #[error("mirror amount {amount} is below venue minimum {min_amount}")]
    Amount { amount: Decimal, min_amount: Decimal },
    #[error("mirror notional {cost} is below venue minimum cost {min_cost} and cannot be bumped")]
    Cost { cost: Decimal, min_cost: Decimal },
}

/// Relaxation allowance at a given re-emit attempt, grounded on `original_source`'s
/// `relax_used_bps` formula: `steps = attempt_index + 1` (1-based), applied once
/// `elapsed_sec >= relax_after_sec`.
pub fn relax_used_bps(
    elapsed_sec: u64,
    attempt_index: u32,
    relax_after_sec: u64,
    relax_bps_per_ttl: Decimal,
    relax_max_bps: Decimal,
) -> Decimal {
    if relax_bps_per_ttl <= Decimal::ZERO || elapsed_sec < relax_after_sec {
        return Decimal::ZERO;
    }
    let steps = Decimal::from(attempt_index + 1);
    (steps * relax_bps_per_ttl).min(relax_max_bps)
}

/// Candidate re-emit price for one TTL tick, grounded on `original_source`'s favorable/relaxed
/// branch structure. `None` means "don't re-emit this tick" (no favorable move and no relax
/// room yet). `bid`/`ask` are the current top-of-book quotes, used as the relaxed-mode repost
/// level to maximize maker odds.
pub fn candidate_reemit_price(
    side: Side,
    mid: Decimal,
    bid: Decimal,
    ask: Decimal,
    entry: Decimal,
    protective_bound: Decimal,
    safety_bps: Decimal,
    relax_used_bps: Decimal,
) -> Option<Decimal> {
    let safety = safety_bps / Decimal::from(10_000);

    match side {
        Side::Buy => {
            if mid < entry {
                let candidate = mid * (Decimal::ONE - safety);
                Some(protective_bound.min(candidate))
            } else if relax_used_bps > Decimal::ZERO {
                let ceiling = entry * (Decimal::ONE + relax_used_bps / Decimal::from(10_000));
                let target = if bid > Decimal::ZERO { bid } else { mid };
                Some(ceiling.min(protective_bound.max(target)))
            } else {
                None
            }
        }
        Side::Sell => {
            if mid > entry {
                let candidate = mid * (Decimal::ONE + safety);
                Some(protective_bound.max(candidate))
            } else if relax_used_bps > Decimal::ZERO {
                let floor = entry * (Decimal::ONE - relax_used_bps / Decimal::from(10_000));
                let target = if ask > Decimal::ZERO { ask } else { mid };
                Some(floor.max(protective_bound.min(target)))
            } else {
                None
            }
        }
    }
}

/// Whether a candidate price differs meaningfully from the current protective bound, grounded
/// on `original_source`'s negligible-change epsilon (`abs(bound) * 1e-6 + 1e-10`).
pub fn is_meaningful_repriced(candidate: Decimal, protective_bound: Decimal) -> bool {
    let epsilon = protective_bound.abs() * Decimal::new(1, 6) + Decimal::new(1, 10);
    (candidate - protective_bound).abs() > epsilon
}

/// Force-close loss guard, grounded on `original_source`'s `roundtrip_allow_max_loss_bps` check:
/// `true` means the force-close market order should be skipped because the market has already
/// moved beyond the allowed loss in the adverse direction.
pub fn force_close_loss_guard_blocks(side: Side, mid: Decimal, entry: Decimal, allow_max_loss_bps: Decimal) -> bool {
    if allow_max_loss_bps <= Decimal::ZERO {
        return false;
    }
    let loss_fraction = allow_max_loss_bps / Decimal::from(10_000);
    match side {
        Side::Buy => mid > entry * (Decimal::ONE + loss_fraction),
        Side::Sell => mid < entry * (Decimal::ONE - loss_fraction),
    }
}
