use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// Attempting to create a packet with an insufficient buffer size.
    #[error("insufficient buffer for {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// The `IPv4` header length field points outside of the buffer.
    #[error("invalid ipv4 header length {0}, packet length={1}")]
    InvalidHeaderLength(usize, usize),
    /// Attempting to write a payload larger than the packet buffer.
    #[error("payload of {0} bytes does not fit in {1} packet with capacity {2}")]
    PayloadTooLarge(usize, String, usize),
}
