mod cli;
mod controller;
mod gpio;
mod pin;
mod shutdown;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};
use thread_priority::{RealtimeThreadSchedulePolicy, ThreadPriority, ThreadSchedulePolicy};

use crate::{
    cli::{Cli, Mode},
    controller::ValveController,
    gpio::SimulatedPin,
    shutdown::Shutdown,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mode = match cli.mode() {
        Ok(mode) => mode,
        Err(e) => {
            println!("{e}");
            process::exit(1);
        }
    };
    if !cli.extra.is_empty() {
        debug!("ignoring arguments after the mode: {:?}", cli.extra);
    }
    let timing = cli.timing().context("invalid pulse timing")?;

    if cli.realtime {
        set_realtime_priority();
    }

    let shutdown = Shutdown::install()?;

    if cli.simulate {
        let controller = ValveController::new(
            SimulatedPin::new(cli.pin_a),
            SimulatedPin::new(cli.pin_b),
            timing,
        )?;
        run(controller, mode, &shutdown)
    } else {
        let a = gpio::request_output(&cli.chip, cli.pin_a)?;
        let b = gpio::request_output(&cli.chip, cli.pin_b)?;
        let controller = ValveController::new(a, b, timing)
            .context("failed to initialize radio lines")?;
        run(controller, mode, &shutdown)
    }
}

fn run<P: OutputPin>(mut controller: ValveController<P>, mode: Mode, shutdown: &Shutdown) -> Result<()> {
    match mode {
        Mode::Open => controller.open().context("failed to send open command")?,
        Mode::Close => controller.close().context("failed to send close command")?,
        Mode::Test => {
            controller.test_loop(shutdown).context("test loop failed")?;
            info!("test loop stopped");
        }
    }

    if shutdown.requested() {
        info!("shutdown requested during pulse, lines are back at rest");
    }

    Ok(())
}

/// Keep the pulse from being stretched by other load on the board.
fn set_realtime_priority() {
    let res = thread_priority::set_thread_priority_and_policy(
        thread_priority::thread_native_id(),
        ThreadPriority::Max,
        ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
    );

    match res {
        Ok(()) => info!("running with realtime scheduling"),
        Err(e) => warn!("could not switch to realtime scheduling: {e:?}"),
    }
}
