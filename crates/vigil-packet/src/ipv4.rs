use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::{fmt_payload, IpProtocol};
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

const VERSION_OFFSET: usize = 0;
const IHL_OFFSET: usize = 0;
const TOTAL_LENGTH_OFFSET: usize = 2;
const TIME_TO_LIVE_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const CHECKSUM_OFFSET: usize = 10;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

/// Represents an IPv4 Packet.
///
/// Only the fields needed to locate and attribute an `ICMPv4` reply are
/// exposed. Options are skipped, not decoded.
///
/// The internal representation is held in network byte order (big-endian) and all accessor methods
/// take and return data in host byte order, converting as necessary for the given architecture.
pub struct Ipv4Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv4Packet<'a> {
    /// Create a mutable packet for building.
    ///
    /// The header length field is not validated as the buffer is typically zeroed.
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Mutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("Ipv4Packet"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    /// Create a read-only view of a received datagram.
    ///
    /// Fails if the buffer is shorter than a minimal header, or if the header
    /// length field describes a header shorter than 20 bytes or longer than
    /// the buffer.
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() < Self::minimum_packet_size() {
            return Err(Error::InsufficientPacketBuffer(
                String::from("Ipv4Packet"),
                Self::minimum_packet_size(),
                packet.len(),
            ));
        }
        let ipv4 = Self {
            buf: Buffer::Immutable(packet),
        };
        let header_len = ipv4.header_len();
        if header_len < Self::minimum_packet_size() || header_len > packet.len() {
            return Err(Error::InvalidHeaderLength(header_len, packet.len()));
        }
        Ok(ipv4)
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        20
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        (self.buf.read(VERSION_OFFSET) & 0xf0) >> 4
    }

    /// The header length field, in 32-bit words.
    #[must_use]
    pub fn get_header_length(&self) -> u8 {
        self.buf.read(IHL_OFFSET) & 0xf
    }

    /// The header length in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        usize::from(self.get_header_length()) * 4
    }

    #[must_use]
    pub fn get_total_length(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(TOTAL_LENGTH_OFFSET))
    }

    #[must_use]
    pub fn get_ttl(&self) -> u8 {
        self.buf.read(TIME_TO_LIVE_OFFSET)
    }

    #[must_use]
    pub fn get_protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buf.read(PROTOCOL_OFFSET))
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(CHECKSUM_OFFSET))
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.get_bytes(SOURCE_OFFSET))
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.get_bytes(DESTINATION_OFFSET))
    }

    pub fn set_version(&mut self, val: u8) {
        *self.buf.write(VERSION_OFFSET) =
            (self.buf.read(VERSION_OFFSET) & 0xf) | ((val & 0xf) << 4);
    }

    pub fn set_header_length(&mut self, val: u8) {
        *self.buf.write(IHL_OFFSET) = (self.buf.read(IHL_OFFSET) & 0xf0) | (val & 0xf);
    }

    pub fn set_total_length(&mut self, val: u16) {
        self.buf.set_bytes(TOTAL_LENGTH_OFFSET, val.to_be_bytes());
    }

    pub fn set_ttl(&mut self, val: u8) {
        *self.buf.write(TIME_TO_LIVE_OFFSET) = val;
    }

    pub fn set_protocol(&mut self, val: IpProtocol) {
        *self.buf.write(PROTOCOL_OFFSET) = val.id();
    }

    pub fn set_checksum(&mut self, val: u16) {
        self.buf.set_bytes(CHECKSUM_OFFSET, val.to_be_bytes());
    }

    pub fn set_source(&mut self, val: Ipv4Addr) {
        self.buf.set_bytes(SOURCE_OFFSET, val.octets());
    }

    pub fn set_destination(&mut self, val: Ipv4Addr) {
        self.buf.set_bytes(DESTINATION_OFFSET, val.octets());
    }

    /// Write the payload after the header.
    ///
    /// Fails without writing anything if `vals` does not fit in the buffer.
    pub fn set_payload(&mut self, vals: &[u8]) -> Result<()> {
        let offset = self.payload_offset();
        let capacity = self.buf.len().saturating_sub(offset);
        if vals.len() > capacity {
            return Err(Error::PayloadTooLarge(
                vals.len(),
                String::from("Ipv4Packet"),
                capacity,
            ));
        }
        self.buf.copy_into(offset, vals);
        Ok(())
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The bytes following the header, empty if the header fills the buffer.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.buf.tail(self.payload_offset())
    }

    fn payload_offset(&self) -> usize {
        self.header_len().max(Self::minimum_packet_size())
    }
}

impl Debug for Ipv4Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv4Packet")
            .field("version", &self.get_version())
            .field("header_length", &self.get_header_length())
            .field("total_length", &self.get_total_length())
            .field("ttl", &self.get_ttl())
            .field("protocol", &self.get_protocol())
            .field("checksum", &self.get_checksum())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use test_case::test_case;

    #[test]
    fn test_version_and_header_length() {
        let mut buf = [0_u8; Ipv4Packet::minimum_packet_size()];
        let mut packet = Ipv4Packet::new(&mut buf).unwrap();
        packet.set_version(4);
        packet.set_header_length(5);
        assert_eq!(4, packet.get_version());
        assert_eq!(5, packet.get_header_length());
        assert_eq!(20, packet.header_len());
        assert_eq!([0x45], packet.packet()[..1]);
        packet.set_header_length(15);
        assert_eq!(4, packet.get_version());
        assert_eq!(60, packet.header_len());
        assert_eq!([0x4F], packet.packet()[..1]);
    }

    #[test]
    fn test_fields() {
        let mut buf = [0_u8; Ipv4Packet::minimum_packet_size()];
        let mut packet = Ipv4Packet::new(&mut buf).unwrap();
        packet.set_total_length(84);
        packet.set_ttl(u8::MAX);
        packet.set_protocol(IpProtocol::Icmp);
        packet.set_checksum(0xbeef);
        packet.set_source(Ipv4Addr::new(192, 168, 1, 1));
        packet.set_destination(Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(84, packet.get_total_length());
        assert_eq!(u8::MAX, packet.get_ttl());
        assert_eq!(IpProtocol::Icmp, packet.get_protocol());
        assert_eq!(0xbeef, packet.get_checksum());
        assert_eq!(Ipv4Addr::new(192, 168, 1, 1), packet.get_source());
        assert_eq!(Ipv4Addr::new(10, 0, 0, 2), packet.get_destination());
        assert_eq!(
            hex!("00 00 00 54 00 00 00 00 ff 01 be ef c0 a8 01 01 0a 00 00 02"),
            packet.packet()
        );
    }

    #[test]
    fn test_view() {
        let buf = hex!(
            "45 00 00 20 a2 37 00 00 37 01 1c 4c 08 08 08 08
             c0 a8 01 15 00 00 ff fc 12 34 00 01 de ad be ef"
        );
        let packet = Ipv4Packet::new_view(&buf).unwrap();
        assert_eq!(4, packet.get_version());
        assert_eq!(5, packet.get_header_length());
        assert_eq!(32, packet.get_total_length());
        assert_eq!(55, packet.get_ttl());
        assert_eq!(IpProtocol::Icmp, packet.get_protocol());
        assert_eq!(Ipv4Addr::new(8, 8, 8, 8), packet.get_source());
        assert_eq!(Ipv4Addr::new(192, 168, 1, 21), packet.get_destination());
        assert_eq!(
            &hex!("00 00 ff fc 12 34 00 01 de ad be ef"),
            packet.payload()
        );
    }

    #[test]
    fn test_view_with_options() {
        let buf = hex!(
            "46 00 00 20 00 00 00 00 40 01 00 00 7f 00 00 01
             7f 00 00 01 01 01 01 00 00 00 ff ff 00 00 00 00"
        );
        let packet = Ipv4Packet::new_view(&buf).unwrap();
        assert_eq!(24, packet.header_len());
        assert_eq!(&hex!("00 00 ff ff 00 00 00 00"), packet.payload());
    }

    #[test]
    fn test_view_header_only() {
        let buf = hex!("45 00 00 14 00 00 00 00 40 01 00 00 7f 00 00 01 7f 00 00 01");
        let packet = Ipv4Packet::new_view(&buf).unwrap();
        assert!(packet.payload().is_empty());
    }

    #[test_case(0x40, 0; "zero words")]
    #[test_case(0x44, 16; "below minimum")]
    #[test_case(0x46, 24; "beyond buffer")]
    #[test_case(0x4f, 60; "maximum beyond buffer")]
    fn test_view_invalid_header_length(first: u8, header_len: usize) {
        let mut buf = [0_u8; Ipv4Packet::minimum_packet_size()];
        buf[0] = first;
        let err = Ipv4Packet::new_view(&buf).unwrap_err();
        assert_eq!(Error::InvalidHeaderLength(header_len, 20), err);
    }

    #[test]
    fn test_set_payload() {
        let mut buf = [0_u8; 24];
        let mut packet = Ipv4Packet::new(&mut buf).unwrap();
        packet.set_header_length(5);
        packet.set_payload(&[1, 2, 3]).unwrap();
        assert_eq!(&[1, 2, 3, 0], packet.payload());
        let err = packet.set_payload(&[0; 5]).unwrap_err();
        assert_eq!(Error::PayloadTooLarge(5, String::from("Ipv4Packet"), 4), err);
    }

    #[test]
    fn test_new_insufficient_buffer() {
        const SIZE: usize = Ipv4Packet::minimum_packet_size();
        let mut buf = [0_u8; SIZE - 1];
        let err = Ipv4Packet::new(&mut buf).unwrap_err();
        assert_eq!(
            Error::InsufficientPacketBuffer(String::from("Ipv4Packet"), SIZE, SIZE - 1),
            err
        );
    }

    #[test]
    fn test_new_view_insufficient_buffer() {
        const SIZE: usize = Ipv4Packet::minimum_packet_size();
        let buf = [0_u8; SIZE - 1];
        let err = Ipv4Packet::new_view(&buf).unwrap_err();
        assert_eq!(
            Error::InsufficientPacketBuffer(String::from("Ipv4Packet"), SIZE, SIZE - 1),
            err
        );
    }
}
