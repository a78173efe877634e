use crate::config::DriverConfig;
use crate::error::Result;
use crate::net::Network;
use crate::probe::{round_trip_millis, EchoRequest, ProbeResult};
use crate::types::Sequence;
use crate::watchdog::Supervise;
use std::ops::ControlFlow;
use tracing::instrument;

/// Drives probe cycles against a single target.
///
/// Each cycle starts a supervised watchdog, sends one echo request, waits for
/// the matching reply, reports the result and ends the supervised cycle. The
/// first failure ends the run.
#[derive(Debug)]
pub struct Driver<N, S> {
    config: DriverConfig,
    network: N,
    supervisor: S,
}

impl<N: Network, S: Supervise> Driver<N, S> {
    #[must_use]
    pub const fn new(config: DriverConfig, network: N, supervisor: S) -> Self {
        Self {
            config,
            network,
            supervisor,
        }
    }

    /// Run cycles until `max_cycles` have completed, or forever if unbounded.
    ///
    /// Cycles are separated by the configured interval.
    pub fn run<F: FnMut(&ProbeResult)>(self, mut func: F) -> Result<()> {
        self.try_run(|result| {
            func(result);
            ControlFlow::Continue(())
        })
    }

    /// Run cycles as [`Driver::run`] does, stopping early once `func` breaks.
    ///
    /// The cycle whose result caused the break is still ended before the run
    /// returns `Ok(())`.
    #[instrument(skip_all, level = "trace")]
    pub fn try_run<F>(mut self, mut func: F) -> Result<()>
    where
        F: FnMut(&ProbeResult) -> ControlFlow<()>,
    {
        let mut sequence = self.config.initial_sequence;
        let mut completed = 0_usize;
        loop {
            match self.run_cycle(sequence, &mut func)? {
                ControlFlow::Continue(next) => sequence = next,
                ControlFlow::Break(()) => {
                    tracing::debug!(completed, "run stopped by result handler");
                    return Ok(());
                }
            }
            completed += 1;
            if let Some(max_cycles) = self.config.max_cycles {
                if completed >= max_cycles.0.get() {
                    tracing::debug!(completed, "all cycles complete");
                    return Ok(());
                }
            }
            std::thread::sleep(self.config.interval);
        }
    }

    /// Run a single cycle with `sequence`.
    ///
    /// Returns the sequence for the next cycle, or `Break` if `func` asked to
    /// stop.
    #[instrument(skip(self, func), level = "trace")]
    pub fn run_cycle<F: FnMut(&ProbeResult) -> ControlFlow<()>>(
        &mut self,
        sequence: Sequence,
        func: &mut F,
    ) -> Result<ControlFlow<(), Sequence>> {
        self.supervisor.start_cycle(self.config.target_addr)?;
        let request = EchoRequest::new(self.config.identifier, sequence);
        let sent = self.network.send_probe(request)?;
        let reply = self
            .network
            .recv_probe(request, self.config.reply_timeout)?;
        let result = ProbeResult {
            sequence: reply.sequence,
            source: reply.source,
            ttl: reply.ttl,
            bytes: reply.bytes,
            rtt_ms: round_trip_millis(sent, reply.received),
        };
        tracing::debug!(?result);
        let flow = func(&result);
        self.supervisor.end_cycle()?;
        Ok(match flow {
            ControlFlow::Continue(()) => ControlFlow::Continue(sequence.next()),
            ControlFlow::Break(()) => ControlFlow::Break(()),
        })
    }
}
