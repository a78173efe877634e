use crate::error::{Error, Result};
use crate::net::socket::Socket;
use crate::net::{MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE};
use crate::probe::{EchoReply, EchoRequest};
use crate::types::{Sequence, TraceId};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::SystemTime;
use tracing::instrument;
use vigil_packet::checksum::icmp_ipv4_checksum;
use vigil_packet::icmpv4::echo_reply::EchoReplyPacket;
use vigil_packet::icmpv4::echo_request::EchoRequestPacket;
use vigil_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
use vigil_packet::ipv4::Ipv4Packet;
use vigil_packet::IpProtocol;

/// The maximum size of ICMP packet we allow.
const MAX_ICMP_PACKET_BUF: usize = MAX_PAYLOAD_SIZE + IcmpPacket::minimum_packet_size();

/// IPv4 configuration.
#[derive(Debug)]
pub struct Ipv4 {
    pub dest_addr: Ipv4Addr,
    pub payload: Vec<u8>,
}

impl Default for Ipv4 {
    fn default() -> Self {
        Self {
            dest_addr: Ipv4Addr::UNSPECIFIED,
            payload: vec![],
        }
    }
}

impl Ipv4 {
    /// Build and send an echo request, returning the time it was sent.
    ///
    /// The send time is taken once the packet is built, immediately before it
    /// is handed to the socket. Any failure to send is fatal and reported as
    /// [`Error::ProbeFailed`].
    #[instrument(skip(self, socket), level = "trace")]
    pub fn dispatch_echo_request<S: Socket>(
        &self,
        socket: &mut S,
        request: EchoRequest,
    ) -> Result<SystemTime> {
        let mut icmp_buf = [0_u8; MAX_ICMP_PACKET_BUF];
        let echo_request = make_echo_request(
            &mut icmp_buf,
            request.identifier,
            request.sequence,
            &self.payload,
        )?;
        let remote_addr = SocketAddr::new(IpAddr::V4(self.dest_addr), 0);
        let sent = SystemTime::now();
        let bytes_sent = socket
            .send_to(echo_request.packet(), remote_addr)
            .map_err(Error::ProbeFailed)?;
        tracing::debug!(bytes_sent, ?remote_addr);
        Ok(sent)
    }

    /// Read one datagram and return it if it is the reply to `request`.
    ///
    /// Returns `None` for empty or failed reads and for any datagram which is
    /// not the matching echo reply. The caller retries until its deadline.
    #[instrument(skip(self, socket), level = "trace")]
    pub fn recv_echo_reply<S: Socket>(
        &self,
        socket: &mut S,
        request: EchoRequest,
    ) -> Option<EchoReply> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        match socket.recv_from(&mut buf) {
            Ok((0, _)) => {
                tracing::debug!("empty read");
                None
            }
            Ok((bytes_read, _)) => self.extract_echo_reply(&buf[..bytes_read], request),
            Err(err) => {
                tracing::debug!(%err, "read failed, retrying");
                None
            }
        }
    }

    /// Decode a raw datagram and check it against the outstanding request.
    fn extract_echo_reply(&self, buf: &[u8], request: EchoRequest) -> Option<EchoReply> {
        let received = SystemTime::now();
        let ipv4 = match Ipv4Packet::new_view(buf) {
            Ok(ipv4) => ipv4,
            Err(err) => {
                tracing::debug!(%err, "discarding undecodable datagram");
                return None;
            }
        };
        if ipv4.get_protocol() != IpProtocol::Icmp {
            tracing::debug!(protocol = ?ipv4.get_protocol(), "discarding non icmp datagram");
            return None;
        }
        let reply = match EchoReplyPacket::new_view(ipv4.payload()) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(%err, "discarding truncated icmp message");
                return None;
            }
        };
        let source = ipv4.get_source();
        let icmp_type = reply.get_icmp_type();
        let identifier = TraceId(reply.get_identifier());
        let sequence = Sequence(reply.get_sequence());
        if icmp_type != IcmpType::EchoReply {
            tracing::debug!(?icmp_type, %source, "discarding icmp message");
            None
        } else if identifier != request.identifier || sequence != request.sequence {
            tracing::debug!(?identifier, ?sequence, %source, "discarding echo reply for another probe");
            None
        } else if source != self.dest_addr {
            tracing::debug!(%source, "discarding echo reply from unexpected source");
            None
        } else {
            Some(EchoReply {
                received,
                source,
                ttl: ipv4.get_ttl(),
                identifier,
                sequence,
                bytes: reply.payload().len(),
            })
        }
    }
}

/// Create an `ICMPv4` `EchoRequest` packet in `icmp_buf`.
///
/// The header is written with a zero checksum, the payload appended, and the
/// checksum over the whole message is then written to the checksum field. The
/// returned packet spans exactly the header and payload.
pub fn make_echo_request<'a>(
    icmp_buf: &'a mut [u8],
    identifier: TraceId,
    sequence: Sequence,
    payload: &[u8],
) -> Result<EchoRequestPacket<'a>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::InvalidPayloadSize(payload.len()));
    }
    let packet_size = IcmpPacket::minimum_packet_size() + payload.len();
    let available = icmp_buf.len();
    let buf = icmp_buf.get_mut(..packet_size).ok_or_else(|| {
        vigil_packet::error::Error::InsufficientPacketBuffer(
            String::from("EchoRequestPacket"),
            packet_size,
            available,
        )
    })?;
    let mut icmp = EchoRequestPacket::new(buf)?;
    icmp.set_icmp_type(IcmpType::EchoRequest);
    icmp.set_icmp_code(IcmpCode(0));
    icmp.set_checksum(0);
    icmp.set_identifier(identifier.0);
    icmp.set_sequence(sequence.0);
    icmp.set_payload(payload)?;
    icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
    Ok(icmp)
}
