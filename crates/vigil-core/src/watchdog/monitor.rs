use crate::config::{defaults, heartbeat_addr};
use crate::error::SupervisionError;
use crate::watchdog::heartbeat::{read_message, write_message, HeartbeatMessage, Received};
use std::io::{self, BufReader};
use std::net::TcpStream;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Watchdog configuration.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WatchdogConfig {
    pub heartbeat_port: u16,
    pub timeout: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            heartbeat_port: defaults::DEFAULT_HEARTBEAT_PORT,
            timeout: defaults::DEFAULT_WATCHDOG_TIMEOUT,
        }
    }
}

/// How a watchdog run finished.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The cycle ended in time.
    Completed,
    /// The supervisor closed the channel without ending a cycle.
    Disconnected,
    /// The cycle for `target` overran and the supervised process was terminated.
    Terminated { target: String },
}

/// Terminate the supervised process.
#[cfg_attr(test, mockall::automock)]
pub trait Terminate {
    fn terminate(&mut self) -> Result<(), SupervisionError>;
}

/// Terminates the parent process with `SIGKILL`.
#[derive(Debug, Default)]
pub struct ParentTerminator;

impl Terminate for ParentTerminator {
    fn terminate(&mut self) -> Result<(), SupervisionError> {
        let parent = nix::unistd::getppid();
        tracing::warn!(%parent, "killing supervised process");
        nix::sys::signal::kill(parent, nix::sys::signal::Signal::SIGKILL)
            .map_err(|err| SupervisionError::Terminate(io::Error::from(err)))
    }
}

/// The watchdog side of the heartbeat channel.
pub struct Watchdog<T: Terminate> {
    config: WatchdogConfig,
    terminator: T,
}

impl<T: Terminate> Watchdog<T> {
    #[must_use]
    pub const fn new(config: WatchdogConfig, terminator: T) -> Self {
        Self { config, terminator }
    }

    /// Connect to the supervisor and watch a single cycle.
    ///
    /// Reports `READY`, waits for `START <target>` and then waits at most the
    /// configured timeout for `END`. If the deadline passes the supervised
    /// process is terminated.
    #[instrument(skip(self), level = "trace")]
    pub fn run(&mut self) -> Result<Outcome, SupervisionError> {
        let addr = heartbeat_addr(self.config.heartbeat_port);
        let stream = TcpStream::connect(addr).map_err(|err| SupervisionError::Connect(err, addr))?;
        tracing::debug!(%addr, "connected to supervisor");
        write_message(&mut &stream, &HeartbeatMessage::Ready)?;
        let mut reader = BufReader::new(&stream);
        let target = match read_message(&mut reader)? {
            Received::Message(HeartbeatMessage::Start(target)) => target,
            Received::Message(message) => {
                return Err(SupervisionError::UnexpectedMessage(message.to_string()))
            }
            Received::Closed | Received::TimedOut => return Ok(Outcome::Disconnected),
        };
        tracing::info!(%target, timeout = ?self.config.timeout, "cycle started");
        let deadline = Instant::now() + self.config.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.terminator.terminate()?;
                return Ok(Outcome::Terminated { target });
            }
            stream
                .set_read_timeout(Some(remaining))
                .map_err(SupervisionError::Recv)?;
            match read_message(&mut reader)? {
                Received::Message(HeartbeatMessage::End) => {
                    tracing::info!(%target, "cycle ended");
                    return Ok(Outcome::Completed);
                }
                Received::Message(message) => {
                    return Err(SupervisionError::UnexpectedMessage(message.to_string()))
                }
                Received::Closed => return Ok(Outcome::Disconnected),
                Received::TimedOut => {}
            }
        }
    }
}
