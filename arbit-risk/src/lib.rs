pub mod pause;
pub mod persistence;

pub use pause::PauseGate;
pub use persistence::{PersistenceKey, PersistenceRecord, PersistenceTracker};
