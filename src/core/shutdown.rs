//! # OS termination signals.
//!
//! Provides [`ShutdownSignals`], a reusable listener for the two conventional
//! termination requests, and [`wait_for_shutdown_signal`] for one-shot use.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal) → [`ShutdownSignal::Interrupt`]
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes) → [`ShutdownSignal::Terminate`]
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`] → [`ShutdownSignal::Interrupt`]
//!
//! Signals only trigger the runtime's regular `stop()`; there is no separate code path.

use tokio::sync::mpsc;

/// Kind of termination request observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Terminate => "terminate",
        }
    }
}

/// Registered termination signal listeners.
///
/// Registration happens once in [`ShutdownSignals::new`]; every [`recv`](Self::recv)
/// reuses the same listeners so no signal is lost between calls.
#[cfg(unix)]
pub struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Registers SIGINT and SIGTERM listeners.
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Waits for the next signal; `None` if the listeners were torn down.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::select! {
            s = self.interrupt.recv() => s.map(|_| ShutdownSignal::Interrupt),
            s = self.terminate.recv() => s.map(|_| ShutdownSignal::Terminate),
        }
    }
}

/// Registered termination signal listeners.
#[cfg(not(unix))]
pub struct ShutdownSignals {
    _private: (),
}

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self { _private: () })
    }

    /// Waits for the next Ctrl-C; `None` if listening failed.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|_| ShutdownSignal::Interrupt)
    }
}

/// Waits for a single termination signal.
///
/// Returns `Err` if signal registration fails.
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    let mut signals = ShutdownSignals::new()?;
    signals.recv().await.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "signal listener closed")
    })
}

/// Forwards signals into `tx` until the receiver goes away.
pub(crate) async fn forward_signals(
    mut signals: ShutdownSignals,
    tx: mpsc::Sender<ShutdownSignal>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            sig = signals.recv() => match sig {
                Some(sig) => {
                    if tx.send(sig).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}
