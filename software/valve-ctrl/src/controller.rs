use std::{fmt, thread};

use embedded_hal::digital::{Error as _, ErrorKind, OutputPin};
use log::{debug, info, warn};
use shared::{
    sequence::{Phase, Step, Timing, TEST_CYCLE},
    Level, PinLevels, ValveCommand,
};
use thiserror::Error;

use crate::shutdown::Shutdown;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Line {
    A,
    B,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::A => f.write_str("A"),
            Line::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to drive radio line {line} {level:?}: {detail}")]
pub struct DriveError {
    pub line: Line,
    pub level: Level,
    pub kind: ErrorKind,
    detail: String,
}

/// Sends commands to the radio transmitter by pulsing its two input lines.
///
/// Owns both lines for its whole lifetime. They are driven to rest when the
/// controller is created and again when it is dropped.
pub struct ValveController<P: OutputPin> {
    a: P,
    b: P,
    timing: Timing,
}

impl<P: OutputPin> ValveController<P> {
    pub fn new(a: P, b: P, timing: Timing) -> Result<Self, DriveError> {
        let mut this = Self { a, b, timing };

        this.drive(ValveCommand::Reset)?;
        debug!("radio lines at rest, pulse {:?}, rest {:?}", timing.pulse, timing.rest);

        Ok(this)
    }

    pub fn drive(&mut self, cmd: ValveCommand) -> Result<(), DriveError> {
        let PinLevels { a, b } = cmd.levels();
        debug!("{:?}: A={:?} B={:?}", cmd, a, b);

        set_level(&mut self.a, Line::A, a)?;
        set_level(&mut self.b, Line::B, b)?;

        Ok(())
    }

    pub fn execute(&mut self, steps: &[Step]) -> Result<(), DriveError> {
        for step in steps {
            match *step {
                Step::Drive(cmd) => self.drive(cmd)?,
                Step::Hold(period) => thread::sleep(period),
            }
        }

        Ok(())
    }

    pub fn open(&mut self) -> Result<(), DriveError> {
        self.pulse(ValveCommand::Open)
    }

    pub fn close(&mut self) -> Result<(), DriveError> {
        self.pulse(ValveCommand::Close)
    }

    fn pulse(&mut self, cmd: ValveCommand) -> Result<(), DriveError> {
        self.execute(&cmd.pulse(&self.timing))?;

        // Only reported once the lines are back at rest.
        match cmd {
            ValveCommand::Open => println!("Valve open"),
            ValveCommand::Close => println!("Valve closed"),
            ValveCommand::Reset => {}
        }

        Ok(())
    }

    /// Alternate open and close pulses until `shutdown` fires.
    ///
    /// Shutdown is only observed while resting; a pulse in progress always
    /// completes and returns the lines to rest first.
    pub fn test_loop(&mut self, shutdown: &Shutdown) -> Result<(), DriveError> {
        info!("entering test loop, one cycle every {:?}", self.timing.cycle());

        loop {
            for phase in TEST_CYCLE {
                match phase {
                    Phase::Rest => {
                        println!("REST POSITION");
                        if shutdown.wait(self.timing.rest) {
                            return Ok(());
                        }
                    }
                    Phase::Settle => {
                        if shutdown.wait(self.timing.rest) {
                            return Ok(());
                        }
                    }
                    Phase::Pulse(cmd) => {
                        match cmd {
                            ValveCommand::Open => println!("VALVE OPEN!"),
                            ValveCommand::Close => println!("VALVE CLOSE!"),
                            ValveCommand::Reset => {}
                        }
                        self.pulse(cmd)?;
                    }
                }
            }
        }
    }
}

impl<P: OutputPin> Drop for ValveController<P> {
    fn drop(&mut self) {
        if let Err(e) = self.drive(ValveCommand::Reset) {
            warn!("failed to return radio lines to rest: {e}");
        }
    }
}

fn set_level<P: OutputPin>(pin: &mut P, line: Line, level: Level) -> Result<(), DriveError> {
    let res = match level {
        Level::Low => pin.set_low(),
        Level::High => pin.set_high(),
    };

    res.map_err(|e| DriveError {
        line,
        level,
        kind: e.kind(),
        detail: format!("{e:?}"),
    })
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        convert::Infallible,
        rc::Rc,
        time::{Duration, Instant},
    };

    use embedded_hal::digital::ErrorType;

    use super::*;
    use crate::shutdown;

    type Timeline = Rc<RefCell<Vec<(Line, Level)>>>;

    struct RecordingPin {
        line: Line,
        timeline: Timeline,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.timeline.borrow_mut().push((self.line, Level::Low));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.timeline.borrow_mut().push((self.line, Level::High));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Unavailable;

    impl embedded_hal::digital::Error for Unavailable {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// Accepts `remaining` writes, then fails every one after.
    struct FlakyPin {
        remaining: usize,
    }

    impl ErrorType for FlakyPin {
        type Error = Unavailable;
    }

    impl OutputPin for FlakyPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.set_high()
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if self.remaining == 0 {
                return Err(Unavailable);
            }
            self.remaining -= 1;
            Ok(())
        }
    }

    fn fast() -> Timing {
        Timing {
            pulse: Duration::from_millis(20),
            rest: Duration::from_millis(5),
        }
    }

    fn controller(timing: Timing) -> (ValveController<RecordingPin>, Timeline) {
        let timeline = Timeline::default();
        let a = RecordingPin {
            line: Line::A,
            timeline: timeline.clone(),
        };
        let b = RecordingPin {
            line: Line::B,
            timeline: timeline.clone(),
        };
        (ValveController::new(a, b, timing).unwrap(), timeline)
    }

    /// Collapse the per-line writes into the commands they spell out.
    fn commands(timeline: &Timeline) -> Vec<ValveCommand> {
        timeline
            .borrow()
            .chunks(2)
            .map(|pair| {
                assert_eq!((pair[0].0, pair[1].0), (Line::A, Line::B));
                Option::<ValveCommand>::from(PinLevels::new(pair[0].1, pair[1].1))
                    .expect("both lines were high")
            })
            .collect()
    }

    #[test]
    fn initialize_drives_rest() {
        let (_controller, timeline) = controller(fast());
        assert_eq!(commands(&timeline), [ValveCommand::Reset]);
    }

    #[test]
    fn open_pulses_then_rests() {
        let (mut controller, timeline) = controller(fast());

        let start = Instant::now();
        controller.open().unwrap();
        let elapsed = start.elapsed();

        assert_eq!(
            commands(&timeline),
            [ValveCommand::Reset, ValveCommand::Open, ValveCommand::Reset],
        );
        assert_eq!(timeline.borrow()[2], (Line::A, Level::High));
        assert_eq!(timeline.borrow()[3], (Line::B, Level::Low));
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn close_swaps_levels() {
        let (mut controller, timeline) = controller(fast());
        controller.close().unwrap();

        assert_eq!(
            commands(&timeline),
            [ValveCommand::Reset, ValveCommand::Close, ValveCommand::Reset],
        );
        assert_eq!(timeline.borrow()[2], (Line::A, Level::Low));
        assert_eq!(timeline.borrow()[3], (Line::B, Level::High));
    }

    #[test]
    fn repeated_open_is_identical() {
        let (mut controller, timeline) = controller(fast());
        controller.open().unwrap();
        let first = timeline.borrow().clone();
        controller.open().unwrap();

        let all = timeline.borrow();
        assert_eq!(all.len(), first.len() + 4);
        assert_eq!(&all[first.len()..], &first[2..]);
    }

    #[test]
    fn drop_returns_lines_to_rest() {
        let (mut controller, timeline) = controller(fast());
        controller.drive(ValveCommand::Open).unwrap();
        drop(controller);

        assert_eq!(
            commands(&timeline),
            [ValveCommand::Reset, ValveCommand::Open, ValveCommand::Reset],
        );
    }

    #[test]
    fn test_loop_stops_at_rest_when_signalled() {
        let (mut controller, timeline) = controller(fast());
        let (trigger, shutdown) = shutdown::channel();
        trigger.fire();

        controller.test_loop(&shutdown).unwrap();

        assert_eq!(commands(&timeline), [ValveCommand::Reset]);
    }

    #[test]
    fn test_loop_alternates_until_signalled() {
        let (mut controller, timeline) = controller(fast());
        let (trigger, shutdown) = shutdown::channel();

        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            trigger.fire();
        });
        controller.test_loop(&shutdown).unwrap();
        stopper.join().unwrap();

        let cmds = commands(&timeline);
        assert!(cmds.len() >= 5, "expected at least one full cycle, got {cmds:?}");
        assert_eq!(
            cmds[..5],
            [
                ValveCommand::Reset,
                ValveCommand::Open,
                ValveCommand::Reset,
                ValveCommand::Close,
                ValveCommand::Reset,
            ],
        );
        assert_eq!(cmds.last(), Some(&ValveCommand::Reset));
    }

    type Stamps = Rc<RefCell<Vec<(Line, Level, Instant)>>>;

    struct StampingPin {
        line: Line,
        stamps: Stamps,
    }

    impl ErrorType for StampingPin {
        type Error = Infallible;
    }

    impl OutputPin for StampingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.stamps.borrow_mut().push((self.line, Level::Low, Instant::now()));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.stamps.borrow_mut().push((self.line, Level::High, Instant::now()));
            Ok(())
        }
    }

    #[test]
    fn test_loop_cycle_matches_timing() {
        let timing = Timing {
            pulse: Duration::from_millis(30),
            rest: Duration::from_millis(20),
        };
        let stamps = Stamps::default();
        let mut controller = ValveController::new(
            StampingPin {
                line: Line::A,
                stamps: stamps.clone(),
            },
            StampingPin {
                line: Line::B,
                stamps: stamps.clone(),
            },
            timing,
        )
        .unwrap();
        let (trigger, shutdown) = shutdown::channel();

        let start = Instant::now();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(350));
            trigger.fire();
        });
        controller.test_loop(&shutdown).unwrap();
        stopper.join().unwrap();

        let stamps = stamps.borrow();
        let a_writes: Vec<_> = stamps
            .iter()
            .filter(|(line, ..)| *line == Line::A)
            .map(|(_, level, at)| (*level, *at))
            .collect();

        // Line A goes high only for an open, and the next write on it is the reset.
        let opens: Vec<_> = a_writes
            .windows(2)
            .filter(|w| w[0].0 == Level::High)
            .map(|w| (w[0].1, w[1].1))
            .collect();
        assert!(opens.len() >= 2, "expected two open pulses, got {}", opens.len());

        assert!(opens[0].0 - start >= timing.rest);
        for (asserted, released) in &opens {
            assert!(*released - *asserted >= timing.pulse);
        }

        let slack = Duration::from_millis(150);
        for pair in opens.windows(2) {
            let period = pair[1].0 - pair[0].0;
            assert!(period >= timing.cycle(), "cycle took {period:?}");
            assert!(period < timing.cycle() + slack, "cycle took {period:?}");
        }
    }

    #[test]
    fn driver_failure_is_reported() {
        let mut controller = ValveController::new(
            FlakyPin { remaining: 1 },
            FlakyPin { remaining: usize::MAX },
            fast(),
        )
        .unwrap();

        let err = controller.open().unwrap_err();
        assert_eq!(err.line, Line::A);
        assert_eq!(err.level, Level::High);
        assert_eq!(err.kind, ErrorKind::Other);
        assert!(err.to_string().contains("radio line A High"));
    }

    #[test]
    fn failed_release_is_reported() {
        // A: one write to initialize, one to assert, then the release fails.
        let mut controller = ValveController::new(
            FlakyPin { remaining: 2 },
            FlakyPin { remaining: usize::MAX },
            fast(),
        )
        .unwrap();

        let err = controller.open().unwrap_err();
        assert_eq!(err.line, Line::A);
        assert_eq!(err.level, Level::Low);
    }

    #[test]
    fn initialize_failure_is_fatal() {
        let res = ValveController::new(FlakyPin { remaining: 0 }, FlakyPin { remaining: 0 }, fast());
        assert!(res.is_err());
    }
}
