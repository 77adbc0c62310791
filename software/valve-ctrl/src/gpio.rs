use std::{convert::Infallible, path::Path};

use anyhow::{Context, Result};
use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use log::{debug, info};

use crate::pin::PinName;

/// Request `pin` from the GPIO character device as an output, driven low.
///
/// The kernel grants a line to one requester at a time, so a second
/// controller on the same lines fails here with a busy error.
pub fn request_output(chip: &Path, pin: PinName) -> Result<gpiocdev_embedded_hal::OutputPin> {
    let line = gpiocdev_embedded_hal::OutputPin::new(chip, pin.offset(), PinState::Low)
        .with_context(|| format!("failed to request {pin} as an output on {}", chip.display()))?;

    debug!("requested {pin} (offset {}) on {}", pin.offset(), chip.display());

    Ok(line)
}

/// Stand-in for a GPIO line that only logs what it would have driven.
pub struct SimulatedPin {
    name: PinName,
    state: PinState,
}

impl SimulatedPin {
    pub fn new(name: PinName) -> Self {
        info!("simulating {name}");
        Self {
            name,
            state: PinState::Low,
        }
    }

    fn set(&mut self, state: PinState) {
        if state != self.state {
            debug!("{} (simulated): {:?} -> {:?}", self.name, self.state, state);
        }
        self.state = state;
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(PinState::High);
        Ok(())
    }
}
