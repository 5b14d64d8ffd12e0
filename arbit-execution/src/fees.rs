use crate::plan::FeeTotals;
use arbit_data::adapter::Fee;

/// Aggregate a venue's fee list into per-currency totals, grounded on
/// `original_source::_sum_fees`: the Python prefers the unified `fees` list and only falls back
/// to a legacy single `fee` dict when the list is absent. The adapter layer already normalizes
/// both shapes into one `Vec<Fee>` (see `arbit_data::adapter::OrderResponse::fees`), so here we
/// just sum by currency.
pub fn sum_fees(fees: &[Fee]) -> FeeTotals {
    let mut totals = FeeTotals::new();
    for fee in fees {
        *totals.entry(fee.currency.clone()).or_insert_with(|| rust_decimal::Decimal::ZERO) += fee.cost;
    }
    totals
}

/// Merge `addition` into `totals` in place, used when a confirmed fill re-read supersedes the
/// create-order response's fee figures.
pub fn merge_fees(totals: &mut FeeTotals, addition: &FeeTotals) {
    for (currency, cost) in addition {
        *totals.entry(currency.clone()).or_insert_with(|| rust_decimal::Decimal::ZERO) += *cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_instrument::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn sums_fees_charged_in_the_same_currency() {
        let fees = vec![
            Fee {
                currency: Currency::new("USDT"),
                cost: dec!(0.5),
            },
            Fee {
                currency: Currency::new("USDT"),
                cost: dec!(0.25),
            },
            Fee {
                currency: Currency::new("BTC"),
                cost: dec!(0.0001),
            },
        ];

        let totals = sum_fees(&fees);
        assert_eq!(totals.get(&Currency::new("USDT")), Some(&dec!(0.75)));
        assert_eq!(totals.get(&Currency::new("BTC")), Some(&dec!(0.0001)));
    }
}
