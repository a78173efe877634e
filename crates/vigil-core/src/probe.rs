use crate::types::{Sequence, TraceId};
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

/// An outstanding `ICMPv4` echo request.
///
/// The payload is fixed for the lifetime of the transport and so is not
/// carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoRequest {
    pub identifier: TraceId,
    pub sequence: Sequence,
}

impl EchoRequest {
    #[must_use]
    pub const fn new(identifier: TraceId, sequence: Sequence) -> Self {
        Self {
            identifier,
            sequence,
        }
    }
}

/// A decoded echo reply that matched an outstanding [`EchoRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    /// The time the reply was read from the socket.
    pub received: SystemTime,
    /// The responder, taken from the `IPv4` header.
    pub source: Ipv4Addr,
    /// The time-to-live from the `IPv4` header.
    pub ttl: u8,
    pub identifier: TraceId,
    pub sequence: Sequence,
    /// Length of the `ICMP` payload.
    pub bytes: usize,
}

/// The outcome of one probe cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub sequence: Sequence,
    pub source: Ipv4Addr,
    pub ttl: u8,
    pub bytes: usize,
    /// Round trip time in milliseconds.
    pub rtt_ms: f64,
}

/// The round trip time between two wall clock readings, in milliseconds.
///
/// Computed as `(end_sec - start_sec) * 1000 + (end_us - start_us) / 1000`
/// from the whole seconds and sub-second microseconds since the unix epoch.
/// A clock reading before the epoch counts as the epoch.
#[must_use]
pub fn round_trip_millis(start: SystemTime, end: SystemTime) -> f64 {
    let (start_sec, start_us) = epoch_parts(start);
    let (end_sec, end_us) = epoch_parts(end);
    (end_sec - start_sec) * 1000.0 + (end_us - start_us) / 1000.0
}

fn epoch_parts(time: SystemTime) -> (f64, f64) {
    let since = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    (since.as_secs() as f64, f64::from(since.subsec_micros()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn at(secs: u64, micros: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs) + Duration::from_micros(micros)
    }

    #[test_case((10, 0), (10, 250_000), 250.0; "quarter second")]
    #[test_case((10, 0), (10, 0), 0.0; "zero")]
    #[test_case((10, 999_000), (11, 1_000), 2.0; "across second boundary")]
    #[test_case((10, 0), (12, 500), 2000.5; "sub millisecond")]
    fn test_round_trip_millis(start: (u64, u64), end: (u64, u64), expected: f64) {
        let rtt = round_trip_millis(at(start.0, start.1), at(end.0, end.1));
        assert!((rtt - expected).abs() < f64::EPSILON * 1000.0, "{rtt}");
    }

    #[test]
    fn test_round_trip_ignores_nanos() {
        let start = at(1, 0);
        let end = at(1, 0) + Duration::from_nanos(999);
        assert!(round_trip_millis(start, end).abs() < f64::EPSILON);
    }
}
