use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisionError};
use crate::watchdog::heartbeat::{read_message, write_message, HeartbeatMessage, Received};
use crate::watchdog::launcher::{Launcher, Reap};
use crate::watchdog::{CycleState, Supervise};
use nix::sys::select::FdSet;
use nix::sys::time::{TimeVal, TimeValLike};
use std::io::{self, BufReader};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::os::fd::AsFd;
use std::time::{Duration, Instant};
use tracing::instrument;

/// The driver side of the heartbeat channel.
///
/// Each cycle binds a fresh loopback listener, launches a watchdog, waits for
/// it to connect and report `READY`, and sends `START <target>`. Ending the
/// cycle sends `END`, closes the connection and reaps the watchdog.
pub struct Supervisor<L: Launcher> {
    config: SupervisorConfig,
    launcher: L,
    state: CycleState,
    cycle: Option<Cycle<L::Child>>,
}

/// The resources of an in-flight cycle.
struct Cycle<C> {
    reader: BufReader<TcpStream>,
    child: C,
}

impl<L: Launcher> Supervisor<L> {
    #[must_use]
    pub const fn new(config: SupervisorConfig, launcher: L) -> Self {
        Self {
            config,
            launcher,
            state: CycleState::Idle,
            cycle: None,
        }
    }

    /// The state of the current cycle.
    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    fn accept(&self, listener: &TcpListener) -> Result<TcpStream> {
        let timeout = self.config.ready_timeout;
        if !wait_readable(listener, timeout).map_err(SupervisionError::Accept)? {
            return Err(SupervisionError::AcceptTimeout(timeout).into());
        }
        let (stream, peer) = listener.accept().map_err(SupervisionError::Accept)?;
        tracing::debug!(%peer, "watchdog connected");
        stream
            .set_nonblocking(false)
            .map_err(SupervisionError::Accept)?;
        Ok(stream)
    }

    /// Accept the watchdog, wait for `READY` and send `START <target>`.
    fn handshake(&self, listener: TcpListener, target: Ipv4Addr) -> Result<BufReader<TcpStream>> {
        let stream = self.accept(&listener)?;
        drop(listener);
        let mut reader = BufReader::new(stream);
        self.await_ready(&mut reader)?;
        write_message(
            &mut reader.get_ref(),
            &HeartbeatMessage::Start(target.to_string()),
        )?;
        Ok(reader)
    }

    fn await_ready(&self, reader: &mut BufReader<TcpStream>) -> Result<()> {
        let timeout = self.config.ready_timeout;
        reader
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(SupervisionError::Recv)?;
        match read_message(reader)? {
            Received::Message(HeartbeatMessage::Ready) => Ok(()),
            Received::Message(message) => {
                Err(SupervisionError::UnexpectedMessage(message.to_string()).into())
            }
            Received::Closed => Err(SupervisionError::Closed.into()),
            Received::TimedOut => Err(SupervisionError::ReadyTimeout(timeout).into()),
        }
    }
}

impl<L: Launcher> Supervise for Supervisor<L> {
    #[instrument(skip(self), level = "trace")]
    fn start_cycle(&mut self, target: Ipv4Addr) -> Result<()> {
        if !self.state.can_start() {
            return Err(SupervisionError::InvalidState {
                operation: "start cycle",
                state: self.state,
            }
            .into());
        }
        let addr = self.config.heartbeat_addr();
        let listener =
            TcpListener::bind(addr).map_err(|err| SupervisionError::Listen(err, addr))?;
        let mut child = self.launcher.launch(&self.config)?;
        self.state = CycleState::WatchdogSpawned;
        match self.handshake(listener, target) {
            Ok(reader) => {
                self.state = CycleState::StartSignalSent;
                self.cycle = Some(Cycle { reader, child });
                Ok(())
            }
            Err(err) => {
                abandon(&mut child);
                Err(err)
            }
        }
    }

    #[instrument(skip(self), level = "trace")]
    fn end_cycle(&mut self) -> Result<()> {
        let cycle = match self.cycle.take() {
            Some(cycle) if self.state.can_end() => cycle,
            cycle => {
                self.cycle = cycle;
                return Err(SupervisionError::InvalidState {
                    operation: "end cycle",
                    state: self.state,
                }
                .into());
            }
        };
        let Cycle { reader, mut child } = cycle;
        write_message(&mut reader.get_ref(), &HeartbeatMessage::End)?;
        self.state = CycleState::EndSignalSent;
        drop(reader);
        child.reap().map_err(SupervisionError::Reap)?;
        self.state = CycleState::Closed;
        Ok(())
    }
}

/// Kill and reap a watchdog whose cycle failed to start.
fn abandon<C: Reap>(child: &mut C) {
    if let Err(err) = child.kill() {
        tracing::debug!(%err, "failed to kill watchdog");
    }
    if let Err(err) = child.reap() {
        tracing::debug!(%err, "failed to reap watchdog");
    }
}

/// Wait up to `timeout` for `listener` to have a pending connection.
fn wait_readable(listener: &TcpListener, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }
        let mut read = FdSet::new();
        read.insert(listener.as_fd());
        let millis = i64::try_from(remaining.as_millis()).unwrap_or(i64::MAX);
        match nix::sys::select::select(
            None,
            Some(&mut read),
            None,
            None,
            Some(&mut TimeVal::milliseconds(millis.max(1))),
        ) {
            Ok(ready) if ready > 0 => return Ok(true),
            Ok(_) | Err(nix::Error::EINTR) => {}
            Err(err) => return Err(io::Error::from(err)),
        }
    }
}
