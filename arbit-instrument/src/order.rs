use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Whether an order rests on the book or crosses the spread immediately.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

/// Which side of a market an order acts on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Order lifetime policy for the mirrored limit order the Swapper places on the last leg.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    #[default]
    Gtc,
    Ioc,
    Fok,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite().opposite(), Side::Sell);
    }

    #[test]
    fn time_in_force_defaults_to_gtc() {
        assert_eq!(TimeInForce::default(), TimeInForce::Gtc);
    }
}
