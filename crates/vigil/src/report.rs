use std::io::Write;
use std::net::Ipv4Addr;
use std::ops::ControlFlow;
use vigil_core::ProbeResult;

/// Writes one line per result and stops the run on the first write failure.
pub struct Reporter<W> {
    out: W,
    dest: Ipv4Addr,
    error: Option<anyhow::Error>,
}

impl<W: Write> Reporter<W> {
    pub const fn new(out: W, dest: Ipv4Addr) -> Self {
        Self {
            out,
            dest,
            error: None,
        }
    }

    pub fn handle(&mut self, result: &ProbeResult) -> ControlFlow<()> {
        match report(&mut self.out, self.dest, result) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                tracing::debug!(%err, "failed to write result, stopping");
                self.error = Some(err);
                ControlFlow::Break(())
            }
        }
    }

    /// The first write failure, if any.
    pub fn finish(self) -> anyhow::Result<()> {
        match self.error {
            Some(err) => Err(err.context("failed to write result")),
            None => Ok(()),
        }
    }
}

/// Format a single probe result.
pub fn format_result(dest: Ipv4Addr, result: &ProbeResult) -> String {
    format!(
        "{} bytes from {}: icmp_seq={} ttl={} time={:.3} ms",
        result.bytes, dest, result.sequence, result.ttl, result.rtt_ms
    )
}

/// Write a single probe result line and flush it.
pub fn report<W: Write>(out: &mut W, dest: Ipv4Addr, result: &ProbeResult) -> anyhow::Result<()> {
    writeln!(out, "{}", format_result(dest, result))?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use vigil_core::Sequence;

    fn result(sequence: u16, ttl: u8, rtt_ms: f64) -> ProbeResult {
        ProbeResult {
            sequence: Sequence(sequence),
            source: Ipv4Addr::new(93, 184, 216, 34),
            ttl,
            bytes: 22,
            rtt_ms,
        }
    }

    #[test_case(0, 56, 12.3456, "22 bytes from 93.184.216.34: icmp_seq=0 ttl=56 time=12.346 ms")]
    #[test_case(65535, 1, 0.0, "22 bytes from 93.184.216.34: icmp_seq=65535 ttl=1 time=0.000 ms")]
    #[test_case(7, 255, 250.0, "22 bytes from 93.184.216.34: icmp_seq=7 ttl=255 time=250.000 ms")]
    fn test_format_result(sequence: u16, ttl: u8, rtt_ms: f64, expected: &str) {
        let dest = Ipv4Addr::new(93, 184, 216, 34);
        pretty_assertions::assert_eq!(expected, format_result(dest, &result(sequence, ttl, rtt_ms)));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reporter_continues() -> anyhow::Result<()> {
        let dest = Ipv4Addr::new(93, 184, 216, 34);
        let mut reporter = Reporter::new(vec![], dest);
        assert_eq!(ControlFlow::Continue(()), reporter.handle(&result(0, 56, 1.0)));
        assert_eq!(ControlFlow::Continue(()), reporter.handle(&result(1, 56, 1.0)));
        reporter.finish()?;
        Ok(())
    }

    #[test]
    fn test_reporter_stops_on_closed_output() {
        let mut reporter = Reporter::new(ClosedPipe, Ipv4Addr::LOCALHOST);
        assert_eq!(ControlFlow::Break(()), reporter.handle(&result(0, 56, 1.0)));
        let err = reporter.finish().unwrap_err();
        assert!(err.to_string().starts_with("failed to write result"));
        assert_eq!(
            Some(std::io::ErrorKind::BrokenPipe),
            err.downcast_ref::<std::io::Error>().map(std::io::Error::kind)
        );
    }

    #[test]
    fn test_report_lines() -> anyhow::Result<()> {
        let dest = Ipv4Addr::new(93, 184, 216, 34);
        let mut out = vec![];
        report(&mut out, dest, &result(0, 56, 1.0))?;
        report(&mut out, dest, &result(1, 56, 2.5))?;
        pretty_assertions::assert_eq!(
            "22 bytes from 93.184.216.34: icmp_seq=0 ttl=56 time=1.000 ms\n\
             22 bytes from 93.184.216.34: icmp_seq=1 ttl=56 time=2.500 ms\n",
            String::from_utf8(out)?
        );
        Ok(())
    }
}
