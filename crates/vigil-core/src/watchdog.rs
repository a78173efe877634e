//! Per-cycle watchdog supervision.
//!
//! The driver side ([`Supervisor`]) binds a loopback listener, launches the
//! watchdog executable and exchanges [`HeartbeatMessage`]s with it. The
//! watchdog side ([`Watchdog`]) connects back, announces itself, and kills the
//! driver if a started cycle is not ended within its deadline.
use crate::error::Result;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

/// The heartbeat wire format.
mod heartbeat;

/// Launching the watchdog process.
mod launcher;

/// The watchdog side of the heartbeat channel.
mod monitor;

/// The driver side of the heartbeat channel.
mod supervisor;

pub use heartbeat::{read_message, write_message, HeartbeatMessage, Received};
pub use launcher::{watchdog_args, Launcher, ProcessLauncher, Reap};
pub use monitor::{Outcome, ParentTerminator, Terminate, Watchdog, WatchdogConfig};
pub use supervisor::Supervisor;

/// Supervision of a single probe cycle.
#[cfg_attr(test, mockall::automock)]
pub trait Supervise {
    /// Launch a watchdog, complete the readiness handshake and send the start signal.
    fn start_cycle(&mut self, target: Ipv4Addr) -> Result<()>;

    /// Send the end signal, close the channel and reap the watchdog.
    fn end_cycle(&mut self) -> Result<()>;
}

/// The state of the current supervised cycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CycleState {
    /// No cycle has been started.
    Idle,
    /// The watchdog has been launched but has not yet been told to start.
    WatchdogSpawned,
    /// The start signal has been sent and the watchdog deadline is running.
    StartSignalSent,
    /// The end signal has been sent.
    EndSignalSent,
    /// The channel is closed and the watchdog reaped.
    Closed,
}

impl CycleState {
    /// May a new cycle be started from this state?
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }

    /// May the current cycle be ended from this state?
    #[must_use]
    pub const fn can_end(self) -> bool {
        matches!(self, Self::StartSignalSent)
    }
}

impl Display for CycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::WatchdogSpawned => write!(f, "watchdog spawned"),
            Self::StartSignalSent => write!(f, "start signal sent"),
            Self::EndSignalSent => write!(f, "end signal sent"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
