//! Timed pulse sequences sent to the radio transmitter module.

use core::time::Duration;

use crate::ValveCommand;

/// How long before the end of the holdoff window the pulse is released.
///
/// The transmitter stays quiescent for the holdoff after latching a command,
/// so the pulse is held for slightly less than that.
pub const HOLDOFF_MARGIN: Duration = Duration::from_secs(1);

pub const DEFAULT_HOLDOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_REST: Duration = Duration::from_secs(5);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Drive both lines to the pattern of the given command.
    Drive(ValveCommand),
    /// Keep the lines as they are. Never interrupted.
    Hold(Duration),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    /// How long a command pattern stays asserted.
    pub pulse: Duration,
    /// Idle time between test-loop phases.
    pub rest: Duration,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimingError {
    /// The holdoff does not exceed [`HOLDOFF_MARGIN`].
    HoldoffTooShort(Duration),
}

impl core::fmt::Display for TimingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TimingError::HoldoffTooShort(holdoff) => write!(
                f,
                "holdoff of {} ms leaves no time to assert the pulse (must exceed {} ms)",
                holdoff.as_millis(),
                HOLDOFF_MARGIN.as_millis(),
            ),
        }
    }
}

impl core::error::Error for TimingError {}

impl Timing {
    pub fn from_holdoff(holdoff: Duration, rest: Duration) -> Result<Self, TimingError> {
        match holdoff.checked_sub(HOLDOFF_MARGIN) {
            Some(pulse) if !pulse.is_zero() => Ok(Self { pulse, rest }),
            _ => Err(TimingError::HoldoffTooShort(holdoff)),
        }
    }

    /// Nominal duration of one pass over [`TEST_CYCLE`].
    pub fn cycle(&self) -> Duration {
        TEST_CYCLE.iter().map(|phase| phase.duration(self)).sum()
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            pulse: DEFAULT_HOLDOFF - HOLDOFF_MARGIN,
            rest: DEFAULT_REST,
        }
    }
}

impl ValveCommand {
    /// Assert this command for `timing.pulse`, then go back to rest.
    pub const fn pulse(self, timing: &Timing) -> [Step; 3] {
        [
            Step::Drive(self),
            Step::Hold(timing.pulse),
            Step::Drive(ValveCommand::Reset),
        ]
    }
}

/// One phase of the diagnostic test loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Announce the rest position, then idle.
    Rest,
    /// Send a command pulse.
    Pulse(ValveCommand),
    /// Idle without announcing.
    Settle,
}

impl Phase {
    pub fn duration(&self, timing: &Timing) -> Duration {
        match self {
            Phase::Rest | Phase::Settle => timing.rest,
            Phase::Pulse(_) => timing.pulse,
        }
    }
}

pub const TEST_CYCLE: [Phase; 5] = [
    Phase::Rest,
    Phase::Pulse(ValveCommand::Open),
    Phase::Settle,
    Phase::Pulse(ValveCommand::Close),
    Phase::Settle,
];
