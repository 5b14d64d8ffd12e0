pub mod config;
pub mod fees;
pub mod mirror;
pub mod plan;
pub mod sizing;
pub mod swapper;

pub use config::{SizingConfig, SizingOverride, SwapMode, SwapperConfig};
pub use plan::{FeeTotals, HopFill, SwapHop, SwapPlan, SwapResult, SwapStatus};
pub use swapper::{Swapper, SwapperError};
