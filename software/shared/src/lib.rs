#![cfg_attr(not(test), no_std)] // Disable the standard library when not testing.

mod valve;
pub mod sequence;

pub use valve::{Level, PinLevels, ValveCommand};
