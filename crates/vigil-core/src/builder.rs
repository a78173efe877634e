use crate::config::{ChannelConfig, DriverConfig, SupervisorConfig};
use crate::error::{Error, Result};
use crate::net::MAX_PAYLOAD_SIZE;
use crate::types::{MaxCycles, Sequence, TraceId};
use crate::Prober;
use std::net::Ipv4Addr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Build a prober.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use std::time::Duration;
/// use vigil_core::Builder;
///
/// let addr = std::net::Ipv4Addr::new(1, 2, 3, 4);
/// let prober = Builder::new(addr)
///     .reply_timeout(Duration::from_secs(2))
///     .watchdog_path("/usr/local/bin/watchdog")
///     .max_cycles(Some(4))
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Prober`] - A supervised liveness prober.
#[derive(Debug)]
pub struct Builder {
    target_addr: Ipv4Addr,
    identifier: TraceId,
    initial_sequence: Sequence,
    payload: Vec<u8>,
    interval: Duration,
    reply_timeout: Duration,
    max_cycles: Option<MaxCycles>,
    watchdog_path: PathBuf,
    heartbeat_port: u16,
    watchdog_timeout: Duration,
    ready_timeout: Duration,
    drop_privileges: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            target_addr: ChannelConfig::default().target_addr,
            identifier: DriverConfig::default().identifier,
            initial_sequence: DriverConfig::default().initial_sequence,
            payload: ChannelConfig::default().payload,
            interval: DriverConfig::default().interval,
            reply_timeout: DriverConfig::default().reply_timeout,
            max_cycles: DriverConfig::default().max_cycles,
            watchdog_path: SupervisorConfig::default().watchdog_path,
            heartbeat_port: SupervisorConfig::default().heartbeat_port,
            watchdog_timeout: SupervisorConfig::default().watchdog_timeout,
            ready_timeout: SupervisorConfig::default().ready_timeout,
            drop_privileges: false,
        }
    }
}

impl Builder {
    /// Build a prober builder for a given target.
    ///
    /// The echo identifier defaults to the process id reduced modulo `u16::MAX`.
    #[must_use]
    pub fn new(target_addr: Ipv4Addr) -> Self {
        Self {
            target_addr,
            identifier: default_identifier(),
            ..Default::default()
        }
    }

    /// Set the `ICMP` echo identifier.
    #[must_use]
    pub fn identifier(self, identifier: u16) -> Self {
        Self {
            identifier: TraceId(identifier),
            ..self
        }
    }

    /// Set the sequence number of the first probe.
    #[must_use]
    pub fn initial_sequence(self, initial_sequence: u16) -> Self {
        Self {
            initial_sequence: Sequence(initial_sequence),
            ..self
        }
    }

    /// Set the echo request payload.
    #[must_use]
    pub fn payload<P: Into<Vec<u8>>>(self, payload: P) -> Self {
        Self {
            payload: payload.into(),
            ..self
        }
    }

    /// Set the pause between cycles.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Set how long to wait for each echo reply.
    #[must_use]
    pub fn reply_timeout(self, reply_timeout: Duration) -> Self {
        Self {
            reply_timeout,
            ..self
        }
    }

    /// Set the number of cycles to run, `None` (or zero) runs forever.
    #[must_use]
    pub fn max_cycles(self, max_cycles: Option<usize>) -> Self {
        Self {
            max_cycles: max_cycles.and_then(NonZeroUsize::new).map(MaxCycles),
            ..self
        }
    }

    /// Set the watchdog executable.
    #[must_use]
    pub fn watchdog_path<P: Into<PathBuf>>(self, watchdog_path: P) -> Self {
        Self {
            watchdog_path: watchdog_path.into(),
            ..self
        }
    }

    /// Set the loopback port of the heartbeat channel.
    #[must_use]
    pub fn heartbeat_port(self, heartbeat_port: u16) -> Self {
        Self {
            heartbeat_port,
            ..self
        }
    }

    /// Set how long the watchdog waits for a cycle to end before killing the prober.
    #[must_use]
    pub fn watchdog_timeout(self, watchdog_timeout: Duration) -> Self {
        Self {
            watchdog_timeout,
            ..self
        }
    }

    /// Set how long to wait for a launched watchdog to connect and report ready.
    #[must_use]
    pub fn ready_timeout(self, ready_timeout: Duration) -> Self {
        Self {
            ready_timeout,
            ..self
        }
    }

    /// Drop raw socket privileges once the socket is open.
    #[must_use]
    pub fn drop_privileges(self, drop_privileges: bool) -> Self {
        Self {
            drop_privileges,
            ..self
        }
    }

    /// Build the [`Prober`].
    pub fn build(self) -> Result<Prober> {
        if self.target_addr.is_unspecified() || self.target_addr.is_broadcast() {
            return Err(Error::BadConfig(format!(
                "target_addr {} is not a unicast address",
                self.target_addr
            )));
        }
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidPayloadSize(self.payload.len()));
        }
        for (name, value) in [
            ("reply_timeout", self.reply_timeout),
            ("watchdog_timeout", self.watchdog_timeout),
            ("ready_timeout", self.ready_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::BadConfig(format!("{name} must be greater than zero")));
            }
        }
        if self.watchdog_timeout < self.reply_timeout {
            return Err(Error::BadConfig(format!(
                "watchdog_timeout {:?} < reply_timeout {:?}",
                self.watchdog_timeout, self.reply_timeout
            )));
        }
        if self.heartbeat_port == 0 {
            return Err(Error::BadConfig(String::from(
                "heartbeat_port must not be zero",
            )));
        }
        Ok(Prober::new(
            ChannelConfig {
                target_addr: self.target_addr,
                payload: self.payload,
            },
            SupervisorConfig {
                watchdog_path: self.watchdog_path,
                heartbeat_port: self.heartbeat_port,
                watchdog_timeout: self.watchdog_timeout,
                ready_timeout: self.ready_timeout,
            },
            DriverConfig {
                target_addr: self.target_addr,
                identifier: self.identifier,
                initial_sequence: self.initial_sequence,
                interval: self.interval,
                reply_timeout: self.reply_timeout,
                max_cycles: self.max_cycles,
            },
            self.drop_privileges,
        ))
    }
}

/// The process id reduced modulo `u16::MAX`.
#[allow(clippy::cast_possible_truncation)]
fn default_identifier() -> TraceId {
    TraceId((std::process::id() % u32::from(u16::MAX)) as u16)
}
