use crate::types::{MaxCycles, Sequence, TraceId};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `payload`.
    ///
    /// The trailing NUL is part of the payload on the wire.
    pub const DEFAULT_PAYLOAD: &[u8] = b"vigil liveness probe\n\0";

    /// The default value for `interval`.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    /// The default value for `reply-timeout`.
    pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

    /// The default value for `heartbeat-port`.
    pub const DEFAULT_HEARTBEAT_PORT: u16 = 3000;

    /// The default value for `watchdog-timeout`.
    pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

    /// The default value for `ready-timeout`.
    pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(2);

    /// The default value for `watchdog-path`.
    pub const DEFAULT_WATCHDOG_PATH: &str = "./watchdog";

    /// The default value for `initial-sequence`.
    pub const DEFAULT_INITIAL_SEQUENCE: u16 = 0;
}

/// Probe transport configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelConfig {
    pub target_addr: Ipv4Addr,
    pub payload: Vec<u8>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            target_addr: Ipv4Addr::UNSPECIFIED,
            payload: defaults::DEFAULT_PAYLOAD.to_vec(),
        }
    }
}

/// Watchdog supervision configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SupervisorConfig {
    pub watchdog_path: PathBuf,
    pub heartbeat_port: u16,
    pub watchdog_timeout: Duration,
    pub ready_timeout: Duration,
}

impl SupervisorConfig {
    /// The local address of the heartbeat listener.
    #[must_use]
    pub const fn heartbeat_addr(&self) -> SocketAddr {
        heartbeat_addr(self.heartbeat_port)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            watchdog_path: PathBuf::from(defaults::DEFAULT_WATCHDOG_PATH),
            heartbeat_port: defaults::DEFAULT_HEARTBEAT_PORT,
            watchdog_timeout: defaults::DEFAULT_WATCHDOG_TIMEOUT,
            ready_timeout: defaults::DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Probe loop configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DriverConfig {
    pub target_addr: Ipv4Addr,
    pub identifier: TraceId,
    pub initial_sequence: Sequence,
    pub interval: Duration,
    pub reply_timeout: Duration,
    pub max_cycles: Option<MaxCycles>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target_addr: Ipv4Addr::UNSPECIFIED,
            identifier: TraceId::default(),
            initial_sequence: Sequence(defaults::DEFAULT_INITIAL_SEQUENCE),
            interval: defaults::DEFAULT_INTERVAL,
            reply_timeout: defaults::DEFAULT_REPLY_TIMEOUT,
            max_cycles: None,
        }
    }
}

/// The loopback address the heartbeat channel uses for `port`.
#[must_use]
pub const fn heartbeat_addr(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
}
