// Next-round confirmation gate.
//
// When a round ends, the server shows every seat the outcome and then waits
// for clients to acknowledge it with `next` before dealing again. The gate
// remembers *which* transition is waiting (`NextTransition`) rather than a
// callback, and records acknowledgments per seat. Once `required` distinct
// seats have acknowledged, `trigger_if_awaited` hands the transition back to
// the caller exactly once and the gate closes. Every later acknowledgment,
// until the next `await_confirm`, is a no-op.
//
// State sits behind a `Mutex` so the gate can be shared by reference. The
// server only touches it from its event loop, but the check-and-clear must
// stay atomic regardless of caller.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mahjong_protocol::{SEAT_COUNT, SeatIndex};

/// What happens once the table has acknowledged a round outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextTransition {
    /// Deal the next round.
    AdvanceRound,
    /// The game is over; compute and publish the final result.
    ComputeResult,
}

#[derive(Debug, Default)]
struct GateState {
    pending: Option<NextTransition>,
    acknowledged: BTreeSet<SeatIndex>,
}

#[derive(Debug)]
pub struct ConfirmationGate {
    state: Mutex<GateState>,
    required: usize,
}

impl ConfirmationGate {
    /// `required` is clamped to 1..=4.
    pub fn new(required: usize) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            required: required.clamp(1, SEAT_COUNT),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the gate for `transition`, discarding any earlier acknowledgments.
    pub fn await_confirm(&self, transition: NextTransition) {
        let mut state = self.lock();
        state.pending = Some(transition);
        state.acknowledged.clear();
    }

    /// Record `seat`'s acknowledgment. Returns the transition if this
    /// acknowledgment completed the quorum; `None` if the gate is closed or
    /// still waiting on other seats.
    pub fn trigger_if_awaited(&self, seat: SeatIndex) -> Option<NextTransition> {
        let mut state = self.lock();
        state.pending?;
        state.acknowledged.insert(seat);
        if state.acknowledged.len() < self.required {
            return None;
        }
        state.acknowledged.clear();
        state.pending.take()
    }

    pub fn is_awaiting(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn pending(&self) -> Option<NextTransition> {
        self.lock().pending
    }

    /// Close the gate without running anything (a new game was started).
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.pending = None;
        state.acknowledged.clear();
    }

    pub fn required(&self) -> usize {
        self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_gate_ignores_confirmations() {
        let gate = ConfirmationGate::new(1);
        assert_eq!(gate.trigger_if_awaited(SeatIndex(0)), None);
        assert!(!gate.is_awaiting());
    }

    #[test]
    fn fires_once_per_await() {
        let gate = ConfirmationGate::new(1);
        gate.await_confirm(NextTransition::AdvanceRound);
        assert_eq!(
            gate.trigger_if_awaited(SeatIndex(2)),
            Some(NextTransition::AdvanceRound)
        );
        assert_eq!(gate.trigger_if_awaited(SeatIndex(2)), None);
        assert_eq!(gate.trigger_if_awaited(SeatIndex(3)), None);
        assert!(!gate.is_awaiting());
    }

    #[test]
    fn quorum_counts_distinct_seats() {
        let gate = ConfirmationGate::new(3);
        gate.await_confirm(NextTransition::ComputeResult);
        assert_eq!(gate.trigger_if_awaited(SeatIndex(0)), None);
        assert_eq!(gate.trigger_if_awaited(SeatIndex(0)), None);
        assert_eq!(gate.trigger_if_awaited(SeatIndex(1)), None);
        assert_eq!(
            gate.trigger_if_awaited(SeatIndex(3)),
            Some(NextTransition::ComputeResult)
        );
        assert_eq!(gate.trigger_if_awaited(SeatIndex(2)), None);
    }

    #[test]
    fn reopening_forgets_old_acknowledgments() {
        let gate = ConfirmationGate::new(2);
        gate.await_confirm(NextTransition::AdvanceRound);
        gate.trigger_if_awaited(SeatIndex(0));
        gate.await_confirm(NextTransition::ComputeResult);
        assert_eq!(gate.trigger_if_awaited(SeatIndex(1)), None);
        assert_eq!(gate.pending(), Some(NextTransition::ComputeResult));
    }

    #[test]
    fn cancel_closes_the_gate() {
        let gate = ConfirmationGate::new(1);
        gate.await_confirm(NextTransition::AdvanceRound);
        gate.cancel();
        assert_eq!(gate.trigger_if_awaited(SeatIndex(0)), None);
    }

    #[test]
    fn required_is_clamped() {
        assert_eq!(ConfirmationGate::new(0).required(), 1);
        assert_eq!(ConfirmationGate::new(9).required(), SEAT_COUNT);
    }

    #[test]
    fn concurrent_confirmations_fire_exactly_once() {
        let gate = std::sync::Arc::new(ConfirmationGate::new(1));
        gate.await_confirm(NextTransition::AdvanceRound);
        let handles: Vec<_> = SeatIndex::ALL
            .into_iter()
            .map(|seat| {
                let gate = std::sync::Arc::clone(&gate);
                std::thread::spawn(move || gate.trigger_if_awaited(seat).is_some())
            })
            .collect();
        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();
        assert_eq!(fired, 1);
    }
}
