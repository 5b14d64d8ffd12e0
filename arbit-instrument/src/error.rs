use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while rounding an amount or price to a market's exchange-reported precision,
/// or while checking it against the venue's minimum tradable size.
#[derive(Debug, Clone, Error)]
pub enum PrecisionError {
    #[error("amount {amount} is below the venue minimum amount {min_amount}")]
    BelowMinAmount { amount: Decimal, min_amount: Decimal },

    #[error("notional {cost} is below the venue minimum cost {min_cost}")]
    BelowMinCost { cost: Decimal, min_cost: Decimal },

    #[error("precision {precision} exceeds the supported range")]
    InvalidPrecision { precision: u32 },
}
