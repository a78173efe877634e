use crate::error::SupervisionError;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// A message on the heartbeat channel.
///
/// Messages are newline terminated text lines.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HeartbeatMessage {
    /// Sent by the watchdog once it has connected.
    Ready,
    /// Sent by the driver when a cycle begins, naming the probed target.
    Start(String),
    /// Sent by the driver when a cycle ends.
    End,
}

impl Display for HeartbeatMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Start(target) => write!(f, "START {target}"),
            Self::End => write!(f, "END"),
        }
    }
}

impl FromStr for HeartbeatMessage {
    type Err = SupervisionError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            "READY" => Ok(Self::Ready),
            "END" => Ok(Self::End),
            _ => match line.strip_prefix("START ") {
                Some(target) if !target.trim().is_empty() => {
                    Ok(Self::Start(target.trim().to_string()))
                }
                _ => Err(SupervisionError::UnexpectedMessage(line.to_string())),
            },
        }
    }
}

/// The result of reading from the heartbeat channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Received {
    Message(HeartbeatMessage),
    /// The peer closed the channel.
    Closed,
    /// The read timeout configured on the underlying stream elapsed.
    TimedOut,
}

/// Write a single message, newline terminated, and flush it.
pub fn write_message<W: Write>(
    writer: &mut W,
    message: &HeartbeatMessage,
) -> Result<(), SupervisionError> {
    tracing::debug!(%message, "heartbeat send");
    writer
        .write_all(format!("{message}\n").as_bytes())
        .and_then(|()| writer.flush())
        .map_err(SupervisionError::Send)
}

/// Read a single message.
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Received, SupervisionError> {
    let mut line = String::new();
    loop {
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(Received::Closed),
            Ok(_) => {
                let message = line.parse::<HeartbeatMessage>()?;
                tracing::debug!(%message, "heartbeat recv");
                return Ok(Received::Message(message));
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(Received::TimedOut);
            }
            Err(err) if err.kind() == io::ErrorKind::ConnectionReset => {
                return Ok(Received::Closed);
            }
            Err(err) => return Err(SupervisionError::Recv(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_case::test_case;

    #[test_case("READY\n", HeartbeatMessage::Ready)]
    #[test_case("END\n", HeartbeatMessage::End)]
    #[test_case("END\r\n", HeartbeatMessage::End; "crlf")]
    #[test_case("START 10.0.0.1\n", HeartbeatMessage::Start(String::from("10.0.0.1")))]
    fn test_parse(line: &str, expected: HeartbeatMessage) -> anyhow::Result<()> {
        assert_eq!(expected, line.parse::<HeartbeatMessage>()?);
        Ok(())
    }

    #[test_case("HELLO\n")]
    #[test_case("START \n"; "start without target")]
    #[test_case("ready\n"; "lowercase")]
    #[test_case("\n"; "empty")]
    fn test_parse_unexpected(line: &str) {
        let err = line.parse::<HeartbeatMessage>().unwrap_err();
        assert!(matches!(err, SupervisionError::UnexpectedMessage(_)));
    }

    #[test]
    fn test_write_message() -> anyhow::Result<()> {
        let mut buf = vec![];
        write_message(&mut buf, &HeartbeatMessage::Ready)?;
        write_message(&mut buf, &HeartbeatMessage::Start(String::from("8.8.8.8")))?;
        write_message(&mut buf, &HeartbeatMessage::End)?;
        assert_eq!(b"READY\nSTART 8.8.8.8\nEND\n".as_slice(), buf.as_slice());
        Ok(())
    }

    #[test]
    fn test_read_message_sequence() -> anyhow::Result<()> {
        let mut reader = Cursor::new(b"READY\nSTART 8.8.8.8\nEND\n".to_vec());
        assert_eq!(
            Received::Message(HeartbeatMessage::Ready),
            read_message(&mut reader)?
        );
        assert_eq!(
            Received::Message(HeartbeatMessage::Start(String::from("8.8.8.8"))),
            read_message(&mut reader)?
        );
        assert_eq!(
            Received::Message(HeartbeatMessage::End),
            read_message(&mut reader)?
        );
        assert_eq!(Received::Closed, read_message(&mut reader)?);
        Ok(())
    }

    #[test]
    fn test_read_message_unterminated_final_line() -> anyhow::Result<()> {
        let mut reader = Cursor::new(b"END".to_vec());
        assert_eq!(
            Received::Message(HeartbeatMessage::End),
            read_message(&mut reader)?
        );
        Ok(())
    }

    struct TimingOut;

    impl io::Read for TimingOut {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }
    }

    #[test]
    fn test_read_message_timeout() -> anyhow::Result<()> {
        let mut reader = io::BufReader::new(TimingOut);
        assert_eq!(Received::TimedOut, read_message(&mut reader)?);
        Ok(())
    }
}
