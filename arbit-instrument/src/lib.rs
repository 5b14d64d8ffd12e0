//! Core data structures shared by every Arbit crate: [`Currency`], [`Market`], [`MarketMetadata`]
//! and the per-venue [`ExchangeId`]/[`VenuePolicy`] pair used to encode exchange quirks as data
//! rather than call-site branches.

/// Defines the [`ExchangeId`] identifier and the [`VenuePolicy`] capability table.
pub mod exchange;

/// Defines [`Currency`], the graph node key used throughout detection and execution.
pub mod currency;

/// Defines [`Market`] (a.k.a. Symbol) and its exchange-reported [`MarketMetadata`].
pub mod market;

/// Defines [`OrderType`], [`Side`] and [`TimeInForce`].
pub mod order;

/// Defines [`PrecisionError`].
pub mod error;

/// Defines [`Ticker`], a venue's latest quote for a [`Market`].
pub mod ticker;

pub use currency::Currency;
pub use error::PrecisionError;
pub use exchange::{ExchangeId, VenuePolicy};
pub use market::{Market, MarketMetadata};
pub use order::{OrderType, Side, TimeInForce};
pub use ticker::Ticker;
