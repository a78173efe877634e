use crate::error::Result;
use crate::probe::{EchoReply, EchoRequest};
use std::time::{Duration, SystemTime};

/// `IPv4` echo request building and reply matching.
mod ipv4;

/// Platform specific network code.
mod platform;

/// A network socket.
mod socket;

/// A channel for sending and receiving probes.
pub mod channel;

/// The platform specific socket type.
pub use platform::SocketImpl;

/// The maximum size of the IP packet we allow.
pub const MAX_PACKET_SIZE: usize = 1024;

/// The maximum size of echo request payload we allow.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE
    - vigil_packet::ipv4::Ipv4Packet::minimum_packet_size()
    - vigil_packet::icmpv4::IcmpPacket::minimum_packet_size();

/// An abstraction over a raw `ICMP` endpoint for probing.
#[cfg_attr(test, mockall::automock)]
pub trait Network {
    /// Build and transmit an echo request to the target.
    ///
    /// Returns the time the request was sent, taken after the packet is built.
    fn send_probe(&mut self, request: EchoRequest) -> Result<SystemTime>;

    /// Wait for the echo reply matching `request`.
    ///
    /// Datagrams which are not the matching reply are discarded and failed
    /// reads are retried. Returns [`crate::Error::NoReply`] if `timeout`
    /// elapses first.
    fn recv_probe(&mut self, request: EchoRequest, timeout: Duration) -> Result<EchoReply>;
}
