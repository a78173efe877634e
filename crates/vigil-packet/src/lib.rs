//! Packet wire format parsing and building for the vigil liveness prober.
//!
//! The following packet are supported:
//! - `ICMPv4` echo request
//! - `ICMPv4` echo reply
//! - `IPv4` (read side, used to locate the `ICMPv4` reply and its time-to-live)
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example builds an `ICMPv4` echo request packet:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use vigil_packet::checksum::icmp_ipv4_checksum;
//! use vigil_packet::icmpv4::echo_request::EchoRequestPacket;
//! use vigil_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
//!
//! let mut buf = [0; IcmpPacket::minimum_packet_size()];
//! let mut icmp = EchoRequestPacket::new(&mut buf)?;
//! icmp.set_icmp_type(IcmpType::EchoRequest);
//! icmp.set_icmp_code(IcmpCode(0));
//! icmp.set_identifier(1234);
//! icmp.set_sequence(10);
//! icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
//! assert_eq!(icmp.packet(), &hex_literal::hex!("08 00 f3 23 04 d2 00 0a"));
//! # Ok(())
//! # }
//! ```
//!
//! The following example parses an `IPv4` datagram holding an `ICMPv4` echo
//! reply, as read from a raw socket:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use vigil_packet::icmpv4::echo_reply::EchoReplyPacket;
//! use vigil_packet::ipv4::Ipv4Packet;
//!
//! let buf = hex_literal::hex!(
//!     "45 00 00 1c 00 00 00 00 40 01 00 00 7f 00 00 01
//!      7f 00 00 01 00 00 fb 23 04 d2 00 0a"
//! );
//! let ipv4 = Ipv4Packet::new_view(&buf)?;
//! assert_eq!(64, ipv4.get_ttl());
//! let reply = EchoReplyPacket::new_view(ipv4.payload())?;
//! assert_eq!(1234, reply.get_identifier());
//! assert_eq!(10, reply.get_sequence());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Functions for calculating network checksums.
pub mod checksum;

/// `ICMPv4` packets.
pub mod icmpv4;

/// `IPv4` packets.
pub mod ipv4;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            p => Self::Other(p),
        }
    }
}

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
