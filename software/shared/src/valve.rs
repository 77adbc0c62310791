/// Logic level of a single radio-module line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Levels of the (A, B) line pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinLevels {
    pub a: Level,
    pub b: Level,
}

impl PinLevels {
    pub const fn new(a: Level, b: Level) -> Self {
        Self { a, b }
    }
}

/// A command understood by the radio transmitter module.
///
/// The remote valve's position is never read back, so these are
/// fire-and-forget patterns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValveCommand {
    /// The remote valve should open.
    Open,
    /// The remote valve should close.
    Close,
    /// Both lines low; the transmitter is idle.
    Reset,
}

impl ValveCommand {
    pub const fn levels(self) -> PinLevels {
        match self {
            ValveCommand::Open => PinLevels::new(Level::High, Level::Low),
            ValveCommand::Close => PinLevels::new(Level::Low, Level::High),
            ValveCommand::Reset => PinLevels::new(Level::Low, Level::Low),
        }
    }
}

impl From<PinLevels> for Option<ValveCommand> {
    fn from(levels: PinLevels) -> Self {
        match (levels.a, levels.b) {
            (Level::High, Level::Low) => Some(ValveCommand::Open),
            (Level::Low, Level::High) => Some(ValveCommand::Close),
            (Level::Low, Level::Low) => Some(ValveCommand::Reset),
            (Level::High, Level::High) => None,
        }
    }
}
