use crate::config::ChannelConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::net::ipv4::Ipv4;
use crate::net::socket::Socket;
use crate::net::{Network, MAX_PAYLOAD_SIZE};
use crate::probe::{EchoReply, EchoRequest};
use std::io;
use std::time::{Duration, Instant, SystemTime};
use tracing::instrument;

/// A channel for sending and receiving echo probes over a raw socket.
pub struct Channel<S: Socket> {
    socket: S,
    ipv4: Ipv4,
}

impl<S: Socket> Channel<S> {
    /// Open the raw `ICMP` endpoint.
    ///
    /// This operation requires the `CAP_NET_RAW` capability on Linux and root
    /// elsewhere, a refusal is reported as [`Error::PrivilegeRequired`].
    #[instrument(skip_all, level = "trace")]
    pub fn connect(config: &ChannelConfig) -> Result<Self> {
        tracing::debug!(?config);
        if config.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidPayloadSize(config.payload.len()));
        }
        let socket = S::new_icmp_socket_ipv4().map_err(|err| match err.kind() {
            ErrorKind::Std(io::ErrorKind::PermissionDenied) => Error::PrivilegeRequired(err),
            _ => Error::IoError(err),
        })?;
        Ok(Self {
            socket,
            ipv4: Ipv4 {
                dest_addr: config.target_addr,
                payload: config.payload.clone(),
            },
        })
    }
}

impl<S: Socket> Network for Channel<S> {
    #[instrument(skip(self), level = "trace")]
    fn send_probe(&mut self, request: EchoRequest) -> Result<SystemTime> {
        tracing::debug!(?request);
        self.ipv4.dispatch_echo_request(&mut self.socket, request)
    }

    #[instrument(skip(self), level = "trace")]
    fn recv_probe(&mut self, request: EchoRequest, timeout: Duration) -> Result<EchoReply> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::NoReply {
                    sequence: request.sequence.0,
                    timeout,
                });
            }
            match self.socket.is_readable(remaining) {
                Ok(true) => {
                    if let Some(reply) = self.ipv4.recv_echo_reply(&mut self.socket, request) {
                        tracing::debug!(?reply);
                        return Ok(reply);
                    }
                }
                Ok(false) => {}
                Err(err) => tracing::debug!(%err, "wait for reply failed, retrying"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoOperation, IoResult};
    use crate::mocket_recv_from;
    use crate::net::socket::MockSocket;
    use crate::types::{Sequence, TraceId};
    use hex_literal::hex;
    use nix::errno::Errno;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Mutex;

    // The `new_icmp_socket_ipv4` expectation is a static and so these tests must not run
    // concurrently.
    static MTX: Mutex<()> = Mutex::new(());

    const DEST: Ipv4Addr = Ipv4Addr::new(142, 251, 222, 206);
    const FROM: SocketAddr = SocketAddr::new(IpAddr::V4(DEST), 0);

    // echo reply from 142.251.222.206, ttl 59, id 30167, seq 33049, 4 byte payload
    const REPLY: [u8; 32] = hex!(
        "
        45 20 00 20 00 00 00 00 3b 01 50 36 8e fb de ce
        c0 a8 01 15 00 00 09 0f 75 d7 81 19 00 00 00 00
        "
    );

    fn channel(socket: MockSocket) -> Channel<MockSocket> {
        Channel {
            socket,
            ipv4: Ipv4 {
                dest_addr: DEST,
                payload: vec![],
            },
        }
    }

    const fn request() -> EchoRequest {
        EchoRequest::new(TraceId(30167), Sequence(33049))
    }

    #[test]
    fn test_connect() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let ctx = MockSocket::new_icmp_socket_ipv4_context();
        ctx.expect().times(1).returning(|| Ok(MockSocket::new()));
        let config = ChannelConfig {
            target_addr: DEST,
            ..Default::default()
        };
        let channel = Channel::<MockSocket>::connect(&config)?;
        assert_eq!(DEST, channel.ipv4.dest_addr);
        assert_eq!(config.payload, channel.ipv4.payload);
        Ok(())
    }

    #[test]
    fn test_connect_permission_denied() {
        let _m = MTX.lock();
        let ctx = MockSocket::new_icmp_socket_ipv4_context();
        ctx.expect().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::PermissionDenied),
                IoOperation::NewSocket,
            ))
        });
        let err = Channel::<MockSocket>::connect(&ChannelConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::PrivilegeRequired(_)));
    }

    #[test]
    fn test_connect_other_failure() {
        let _m = MTX.lock();
        let ctx = MockSocket::new_icmp_socket_ipv4_context();
        ctx.expect().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::Unsupported),
                IoOperation::NewSocket,
            ))
        });
        let err = Channel::<MockSocket>::connect(&ChannelConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_connect_payload_too_large() {
        let config = ChannelConfig {
            payload: vec![0; MAX_PAYLOAD_SIZE + 1],
            ..Default::default()
        };
        let err = Channel::<MockSocket>::connect(&config).err().unwrap();
        assert!(matches!(err, Error::InvalidPayloadSize(_)));
    }

    #[test]
    fn test_recv_probe() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket.expect_is_readable().times(1).returning(|_| Ok(true));
        mocket
            .expect_recv_from()
            .times(1)
            .returning(mocket_recv_from!(REPLY, FROM));
        let reply = channel(mocket).recv_probe(request(), Duration::from_secs(5))?;
        assert_eq!(59, reply.ttl);
        assert_eq!(4, reply.bytes);
        assert_eq!(DEST, reply.source);
        Ok(())
    }

    #[test]
    fn test_recv_probe_retries_empty_reads() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        let mut seq = mockall::Sequence::new();
        mocket.expect_is_readable().times(3).returning(|_| Ok(true));
        mocket
            .expect_recv_from()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok((0, None)));
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(mocket_recv_from!(REPLY, FROM));
        let reply = channel(mocket).recv_probe(request(), Duration::from_secs(5))?;
        assert_eq!(Sequence(33049), reply.sequence);
        Ok(())
    }

    #[test]
    fn test_recv_probe_skips_unrelated_datagrams() -> anyhow::Result<()> {
        let mut other = REPLY;
        other[27] = 0x1a;
        let mut mocket = MockSocket::new();
        let mut seq = mockall::Sequence::new();
        mocket.expect_is_readable().times(3).returning(|_| Ok(true));
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(mocket_recv_from!(other, FROM));
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(IoError::Other(
                    io::Error::from(io::ErrorKind::WouldBlock),
                    IoOperation::RecvFrom,
                ))
            });
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(mocket_recv_from!(REPLY, FROM));
        let reply = channel(mocket).recv_probe(request(), Duration::from_secs(5))?;
        assert_eq!(Sequence(33049), reply.sequence);
        Ok(())
    }

    #[test]
    fn test_recv_probe_no_reply() {
        let mut mocket = MockSocket::new();
        mocket.expect_is_readable().returning(|timeout| {
            std::thread::sleep(timeout);
            Ok(false)
        });
        mocket.expect_recv_from().never();
        let err = channel(mocket)
            .recv_probe(request(), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoReply {
                sequence: 33049,
                ..
            }
        ));
    }

    #[test]
    fn test_recv_retries_after_wait_failure() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        let mut seq = mockall::Sequence::new();
        mocket
            .expect_is_readable()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(IoError::Other(
                    io::Error::from(Errno::EBADF),
                    IoOperation::Select,
                ))
            });
        mocket
            .expect_is_readable()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(mocket_recv_from!(REPLY, FROM));
        let reply = channel(mocket).recv_probe(request(), Duration::from_secs(5))?;
        assert_eq!(Sequence(33049), reply.sequence);
        Ok(())
    }

    #[test]
    fn test_recv_retries_after_read_failure() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        let mut seq = mockall::Sequence::new();
        mocket.expect_is_readable().times(2).returning(|_| Ok(true));
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(IoError::Other(
                    io::Error::from(Errno::EHOSTUNREACH),
                    IoOperation::RecvFrom,
                ))
            });
        mocket
            .expect_recv_from()
            .times(1)
            .in_sequence(&mut seq)
            .returning(mocket_recv_from!(REPLY, FROM));
        let reply = channel(mocket).recv_probe(request(), Duration::from_secs(5))?;
        assert_eq!(59, reply.ttl);
        assert_eq!(Sequence(33049), reply.sequence);
        Ok(())
    }

    #[test]
    fn test_recv_persistent_failure_is_bounded() {
        let mut mocket = MockSocket::new();
        mocket.expect_is_readable().returning(|_| Ok(true));
        mocket.expect_recv_from().returning(|_| {
            std::thread::sleep(Duration::from_millis(1));
            Err(IoError::Other(
                io::Error::from(Errno::ENETUNREACH),
                IoOperation::RecvFrom,
            ))
        });
        let err = channel(mocket)
            .recv_probe(request(), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, Error::NoReply { sequence: 33049, .. }));
    }

    #[test]
    fn test_send_probe() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .times(1)
            .returning(|buf, addr| {
                assert_eq!(SocketAddr::new(IpAddr::V4(DEST), 0), addr);
                assert_eq!(hex!("08 00 01 0f 75 d7 81 19"), buf);
                Ok(buf.len())
            });
        let before = SystemTime::now();
        let sent = channel(mocket).send_probe(request())?;
        assert!(before <= sent);
        Ok(())
    }
}
