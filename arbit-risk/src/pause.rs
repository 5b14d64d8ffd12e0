use arbit_instrument::ExchangeId;
use dashmap::DashSet;

/// Per-venue emergency pause lever for `arbit-engine::dispatcher`, grounded on
/// `original_source/dispatcher.py`'s pause map. The original keeps a placeholder resume
/// timestamp per venue; its own comment (`# basic lever (no timed resume in v1)`) marks that as
/// unused, so this carries only the boolean the Python actually acts on rather than inventing a
/// timed-resume feature nothing calls.
#[derive(Debug, Default)]
pub struct PauseGate {
    paused: DashSet<ExchangeId>,
}

impl PauseGate {
    pub fn new() -> Self {
        Self { paused: DashSet::new() }
    }

    pub fn is_paused(&self, venue: ExchangeId) -> bool {
        self.paused.contains(&venue)
    }

    pub fn pause(&self, venue: ExchangeId) {
        self.paused.insert(venue);
    }

    pub fn resume(&self, venue: ExchangeId) {
        self.paused.remove(&venue);
    }

    /// Dispatcher step 5 (spec §4.8): a swap that reports `ok=true` but a negative `delta` is an
    /// "emergency" outcome distinct from an outright execution error — it arms the venue pause
    /// without the caller needing to know the pause policy itself.
    pub fn observe_swap_outcome(&self, venue: ExchangeId, emergency_on_negative: bool, ok: bool, delta: rust_decimal::Decimal) {
        if emergency_on_negative && ok && delta < rust_decimal::Decimal::ZERO {
            self.pause(venue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unpaused_venue_starts_clear() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused(ExchangeId::Binance));
    }

    #[test]
    fn pause_then_resume_round_trips() {
        let gate = PauseGate::new();
        gate.pause(ExchangeId::Binance);
        assert!(gate.is_paused(ExchangeId::Binance));
        gate.resume(ExchangeId::Binance);
        assert!(!gate.is_paused(ExchangeId::Binance));
    }

    #[test]
    fn negative_delta_with_ok_true_arms_the_pause() {
        let gate = PauseGate::new();
        gate.observe_swap_outcome(ExchangeId::Binance, true, true, dec!(-0.2));
        assert!(gate.is_paused(ExchangeId::Binance));
    }

    #[test]
    fn negative_delta_is_ignored_when_emergency_policy_is_off() {
        let gate = PauseGate::new();
        gate.observe_swap_outcome(ExchangeId::Binance, false, true, dec!(-0.2));
        assert!(!gate.is_paused(ExchangeId::Binance));
    }

    #[test]
    fn a_failed_swap_does_not_arm_the_pause_via_this_path() {
        // ok=false swaps are already surfaced as errors/Failed status; the emergency pause is
        // specifically for an apparently-successful swap that still lost money.
        let gate = PauseGate::new();
        gate.observe_swap_outcome(ExchangeId::Binance, true, false, dec!(-0.2));
        assert!(!gate.is_paused(ExchangeId::Binance));
    }
}
