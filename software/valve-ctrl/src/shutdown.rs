use std::{thread, time::Duration};

use anyhow::{Context, Result};
use flume::{Receiver, RecvTimeoutError, Sender};
use log::info;

/// Requests a shutdown. Cloneable, so any number of sources can share it.
#[derive(Clone)]
pub struct Trigger {
    tx: Sender<()>,
}

impl Trigger {
    pub fn fire(&self) {
        // A pending request is enough; extra ones are dropped.
        let _ = self.tx.try_send(());
    }
}

/// Cancellation token checked between test-loop phases.
pub struct Shutdown {
    rx: Receiver<()>,
}

pub fn channel() -> (Trigger, Shutdown) {
    let (tx, rx) = flume::bounded(1);
    (Trigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// Fire on SIGINT or SIGTERM.
    ///
    /// The handler only records the request, so a pulse that is being held
    /// when the signal arrives still runs to completion.
    pub fn install() -> Result<Self> {
        let (trigger, shutdown) = channel();

        ctrlc::set_handler(move || {
            info!("shutdown requested");
            trigger.fire();
        })
        .context("failed to install signal handler")?;

        Ok(shutdown)
    }

    /// Block for up to `period`. Returns `true` if shutdown was requested.
    pub fn wait(&self, period: Duration) -> bool {
        match self.rx.recv_timeout(period) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                // Nothing can request a shutdown any more.
                thread::sleep(period);
                false
            }
        }
    }

    pub fn requested(&self) -> bool {
        !self.rx.is_empty()
    }
}
