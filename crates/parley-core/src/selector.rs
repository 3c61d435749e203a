//! Variation selection
//!
//! Picks the next variation of a communication under one of the four
//! [`ChoiceMethod`] policies. A variation is eligible when its condition
//! evaluates true against the current variables.

use crate::communication::{ChoiceMethod, CommunicationDef, MAX_VARIATION_COUNT};
use crate::rng::SelectionRng;
use crate::variables::Variables;

/// Check if the variation exists and its condition holds
pub fn is_eligible(comm: &CommunicationDef, index: usize, vars: &Variables) -> bool {
    comm.variations
        .get(index)
        .is_some_and(|v| v.condition.as_ref().map_or(true, |c| c.eval(vars)))
}

/// Choose a variation index with the given policy
///
/// `index` is only consulted by [`ChoiceMethod::Match`]. The Sequence
/// policy may yield an index past the last variation; that is reported as
/// no choice.
pub fn choose_variation(
    comm: &CommunicationDef,
    method: ChoiceMethod,
    index: usize,
    vars: &Variables,
    rng: &mut SelectionRng,
) -> Option<usize> {
    let count = comm.variations.len();
    if count == 0 {
        return None;
    }

    match method {
        ChoiceMethod::Random => {
            let pool: Vec<usize> = (0..count).filter(|&i| is_eligible(comm, i, vars)).collect();
            rng.pick(&pool).copied()
        }
        ChoiceMethod::RandomSequence => {
            let pool: Vec<usize> = (0..count)
                .filter(|&i| !comm.history.is_played(i) && is_eligible(comm, i, vars))
                .collect();
            rng.pick(&pool).copied()
        }
        ChoiceMethod::Sequence => {
            // Resume just after the highest played bit
            let played = comm.history.played;
            let mut next = if played == 0 {
                0
            } else {
                (u32::BITS - played.leading_zeros()) as usize
            };
            while next < count && !is_eligible(comm, next, vars) {
                next += 1;
            }
            (next < count).then_some(next)
        }
        ChoiceMethod::Match => {
            if is_eligible(comm, index, vars) {
                Some(index)
            } else {
                let wrapped = index % count;
                is_eligible(comm, wrapped, vars).then_some(wrapped)
            }
        }
    }
}

/// Record a successful pick in the communication's history
///
/// Once every variation has been played the history restarts holding only
/// the variation just played.
pub fn update_history(comm: &mut CommunicationDef, chosen: usize) {
    let count = comm.variations.len().min(MAX_VARIATION_COUNT);
    if chosen >= count {
        return;
    }

    comm.history.played |= 1 << chosen;

    if count > 1 {
        let full = if count == MAX_VARIATION_COUNT {
            u32::MAX
        } else {
            (1u32 << count) - 1
        };
        if comm.history.played & full == full {
            comm.history.played = 1 << chosen;
        }
    }
}

/// Choose, clearing the communication's history and retrying once when
/// nothing is eligible
///
/// History is left for the caller to update once the pick is actually
/// played.
pub fn choose_with_fallback(
    comm: &mut CommunicationDef,
    method: ChoiceMethod,
    index: usize,
    vars: &Variables,
    rng: &mut SelectionRng,
) -> Option<usize> {
    if let Some(chosen) = choose_variation(comm, method, index, vars, rng) {
        return Some(chosen);
    }
    comm.history.clear();
    choose_variation(comm, method, index, vars, rng)
}

/// Choose with fallback and record the pick
pub fn select(
    comm: &mut CommunicationDef,
    method: ChoiceMethod,
    index: usize,
    vars: &Variables,
    rng: &mut SelectionRng,
) -> Option<usize> {
    let chosen = choose_with_fallback(comm, method, index, vars, rng)?;
    update_history(comm, chosen);
    Some(chosen)
}
