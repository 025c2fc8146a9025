//! Alert policies gating notification dispatch.
//!
//! Two independent strategies, selected by configuration:
//!
//! - **on_state**: reactive. A dry reading always alerts; a wet reading only
//!   produces a status alert during configured schedule hours.
//! - **elapsed**: a polling watermark. An alert fires once more than a
//!   threshold of hours has passed since the last evaluation that moved the
//!   watermark, with hour-of-day wraparound at midnight.

use std::str::FromStr;

use crate::models::{AlertDecision, AlertPayload, AlertReason};

// ---

/// Which policy gates notifications. Parsed from `ALERT_STRATEGY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStrategy {
    OnState,
    Elapsed,
}

impl FromStr for AlertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s {
            "on_state" => Ok(Self::OnState),
            "elapsed" => Ok(Self::Elapsed),
            other => Err(format!(
                "unknown alert strategy '{other}' (expected 'on_state' or 'elapsed')"
            )),
        }
    }
}

/// Watermark state for the elapsed-hour policy: the hour of day (0-23) at
/// which the policy last advanced. Passed into and returned from each
/// evaluation rather than held in process-wide storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub last_notified_hour: u32,
}

impl ClockState {
    pub fn starting_at(hour: u32) -> Self {
        Self {
            last_notified_hour: hour % 24,
        }
    }
}

// ---

/// Strategy A: state-triggered with scheduled wet-state windows.
///
/// Dry always alerts. Wet alerts only when the current hour is in the
/// schedule set; otherwise the cycle is suppressed. Stateless across calls.
pub fn evaluate_on_state(
    payload: AlertPayload,
    current_hour: u32,
    schedule_hours: &[u32],
) -> AlertDecision {
    // ---
    let (should_send, reason) = if payload.is_dry {
        (true, AlertReason::DryState)
    } else if schedule_hours.contains(&current_hour) {
        (true, AlertReason::ScheduledWindow)
    } else {
        (false, AlertReason::Suppressed)
    };

    AlertDecision {
        should_send,
        reason,
        payload,
    }
}

/// Strategy B: elapsed-hour threshold with midnight wraparound.
///
/// `diff` is a modular hour-of-day distance, not a duration: evaluations
/// more than 24 hours apart alias to the same small diff, an accepted
/// limitation of tracking only the hour with no day counter.
///
/// The watermark advances on every hour change, including sub-threshold
/// diffs and regardless of whether delivery later succeeds. That mirrors
/// the source behavior literally; a failed send therefore stays suppressed
/// until the next threshold gap.
pub fn evaluate_elapsed(
    state: ClockState,
    payload: AlertPayload,
    current_hour: u32,
    threshold: u32,
) -> (ClockState, AlertDecision) {
    // ---
    if current_hour == state.last_notified_hour {
        let decision = AlertDecision {
            should_send: false,
            reason: AlertReason::Suppressed,
            payload,
        };
        return (state, decision);
    }

    let mut diff = current_hour as i64 - state.last_notified_hour as i64;
    if diff < 0 {
        diff += 24;
    }

    let should_send = diff > threshold as i64;
    let decision = AlertDecision {
        should_send,
        reason: if should_send {
            AlertReason::ScheduledWindow
        } else {
            AlertReason::Suppressed
        },
        payload,
    };

    (ClockState::starting_at(current_hour), decision)
}
