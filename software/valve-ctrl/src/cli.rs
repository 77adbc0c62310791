use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use shared::sequence::{Timing, TimingError};
use thiserror::Error;

use crate::pin::PinName;

/// Command a hydraulic valve through the radio transmitter attached to the board.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// `open`, `close`, or `test` to alternate both every few seconds
    #[arg(allow_hyphen_values = true)]
    pub mode: Option<String>,

    /// Anything after the mode is ignored
    #[arg(hide = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,

    /// GPIO character device the radio module is wired to
    #[arg(long, env = "LIME2_GPIO_CHIP", default_value = "/dev/gpiochip0")]
    pub chip: PathBuf,

    /// First radio module line (port name like `PC22`, or a line offset)
    #[arg(long, env = "LIME2_RADIO_PIN_A", default_value = "PC22")]
    pub pin_a: PinName,

    /// Second radio module line
    #[arg(long, env = "LIME2_RADIO_PIN_B", default_value = "PC23")]
    pub pin_b: PinName,

    /// How long the transmitter stays quiescent after latching a command, in ms
    #[arg(long, env = "LIME2_HOLDOFF_MS", default_value_t = 5_000)]
    pub holdoff_ms: u64,

    /// Pause between test loop phases, in ms
    #[arg(long, env = "LIME2_REST_MS", default_value_t = 5_000)]
    pub rest_ms: u64,

    /// Log pin changes instead of touching the hardware
    #[arg(long)]
    pub simulate: bool,

    /// Run with realtime scheduling so the pulse is not stretched by other load
    #[arg(long)]
    pub realtime: bool,
}

impl Cli {
    pub fn timing(&self) -> Result<Timing, TimingError> {
        Timing::from_holdoff(
            Duration::from_millis(self.holdoff_ms),
            Duration::from_millis(self.rest_ms),
        )
    }

    pub fn mode(&self) -> Result<Mode, WrongMode> {
        self.mode.as_deref().unwrap_or_default().parse()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Open,
    Close,
    Test,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Wrong mode provided: {0}")]
pub struct WrongMode(pub String);

impl FromStr for Mode {
    type Err = WrongMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Mode::Open),
            "close" => Ok(Mode::Close),
            "test" => Ok(Mode::Test),
            other => Err(WrongMode(other.to_string())),
        }
    }
}
