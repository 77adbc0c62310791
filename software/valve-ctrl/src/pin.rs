use std::{fmt, str::FromStr};

use thiserror::Error;

/// Lines per port on Allwinner SoCs, as numbered by the sunxi pinctrl driver.
const LINES_PER_BANK: u32 = 32;

/// A GPIO line identified the way the board documentation names it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinName {
    /// Allwinner port naming, e.g. `PC22`.
    Port { bank: char, index: u32 },
    /// Raw line offset on the GPIO chip.
    Offset(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinNameError {
    #[error("empty pin name")]
    Empty,
    #[error("`{0}` is not a port name like `PC22` or a line offset")]
    Malformed(String),
    #[error("pin index {index} of `{name}` is out of range for a 32-line port")]
    IndexOutOfRange { name: String, index: u32 },
}

impl PinName {
    /// Line offset on the GPIO character device.
    pub fn offset(&self) -> u32 {
        match *self {
            PinName::Port { bank, index } => (bank as u32 - 'A' as u32) * LINES_PER_BANK + index,
            PinName::Offset(offset) => offset,
        }
    }
}

impl FromStr for PinName {
    type Err = PinNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PinNameError::Empty);
        }

        if let Ok(offset) = s.parse::<u32>() {
            return Ok(PinName::Offset(offset));
        }

        let malformed = || PinNameError::Malformed(s.to_string());

        let mut chars = s.chars();
        if !matches!(chars.next(), Some('P' | 'p')) {
            return Err(malformed());
        }
        let bank = chars
            .next()
            .filter(char::is_ascii_alphabetic)
            .ok_or_else(malformed)?
            .to_ascii_uppercase();
        let index: u32 = chars.as_str().parse().map_err(|_| malformed())?;

        if index >= LINES_PER_BANK {
            return Err(PinNameError::IndexOutOfRange {
                name: s.to_string(),
                index,
            });
        }

        Ok(PinName::Port { bank, index })
    }
}

impl fmt::Display for PinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinName::Port { bank, index } => write!(f, "P{bank}{index}"),
            PinName::Offset(offset) => write!(f, "line {offset}"),
        }
    }
}
