use crate::watchdog::CycleState;
use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A prober error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A prober error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid payload size: {0} (maximum {})", crate::net::MAX_PAYLOAD_SIZE)]
    InvalidPayloadSize(usize),
    #[error("invalid packet: {0}")]
    PacketError(#[from] vigil_packet::error::Error),
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("probe failed to send: {0}")]
    ProbeFailed(IoError),
    #[error("opening a raw ICMP socket requires privileges: {0}")]
    PrivilegeRequired(IoError),
    #[error("privilege error: {0}")]
    PrivilegeError(#[from] vigil_privilege::Error),
    #[error("watchdog supervision failed: {0}")]
    Supervision(#[from] SupervisionError),
    #[error("no reply to icmp_seq={sequence} within {timeout:?}")]
    NoReply { sequence: u16, timeout: Duration },
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Custom IO error.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("failed to {1}: {0}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    /// Get the custom error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SendTo(e, _) | Self::Other(e, _) => ErrorKind::from(e),
        }
    }
}

/// Custom error kind.
///
/// This includes additional error kinds that are not part of the standard [`io::ErrorKind`].
#[derive(Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Interrupted,
    Std(io::ErrorKind),
}

/// Io operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IoOperation {
    NewSocket,
    SetNonBlocking,
    Select,
    RecvFrom,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::SetNonBlocking => write!(f, "set non-blocking"),
            Self::Select => write!(f, "select"),
            Self::RecvFrom => write!(f, "recv from"),
        }
    }
}

/// A heartbeat channel or watchdog process failure.
#[derive(Error, Debug)]
pub enum SupervisionError {
    #[error("failed to listen on {1}: {0}")]
    Listen(io::Error, SocketAddr),
    #[error("failed to spawn watchdog {}: {0}", .1.display())]
    Spawn(io::Error, PathBuf),
    #[error("watchdog did not connect within {0:?}")]
    AcceptTimeout(Duration),
    #[error("failed to accept watchdog connection: {0}")]
    Accept(io::Error),
    #[error("failed to connect to heartbeat channel {1}: {0}")]
    Connect(io::Error, SocketAddr),
    #[error("watchdog did not report ready within {0:?}")]
    ReadyTimeout(Duration),
    #[error("failed to send heartbeat: {0}")]
    Send(io::Error),
    #[error("failed to receive heartbeat: {0}")]
    Recv(io::Error),
    #[error("heartbeat channel closed by peer")]
    Closed,
    #[error("unexpected heartbeat message: {0:?}")]
    UnexpectedMessage(String),
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: CycleState,
    },
    #[error("failed to reap watchdog process: {0}")]
    Reap(io::Error),
    #[error("failed to terminate the supervised process: {0}")]
    Terminate(io::Error),
}
