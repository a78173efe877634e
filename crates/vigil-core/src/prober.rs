use crate::config::{ChannelConfig, DriverConfig, SupervisorConfig};
use crate::driver::Driver;
use crate::error::Result;
use crate::net::channel::Channel;
use crate::net::SocketImpl;
use crate::probe::ProbeResult;
use crate::watchdog::{ProcessLauncher, Supervisor};
use std::net::Ipv4Addr;
use std::ops::ControlFlow;
use tracing::instrument;
use vigil_privilege::Privilege;

/// A supervised `ICMP` liveness prober.
///
/// See the [`crate`] documentation for more information.
///
/// Use the [`crate::Builder`] type to create a [`Prober`].
#[derive(Debug, Clone)]
pub struct Prober {
    channel_config: ChannelConfig,
    supervisor_config: SupervisorConfig,
    driver_config: DriverConfig,
    drop_privileges: bool,
}

impl Prober {
    pub(crate) const fn new(
        channel_config: ChannelConfig,
        supervisor_config: SupervisorConfig,
        driver_config: DriverConfig,
        drop_privileges: bool,
    ) -> Self {
        Self {
            channel_config,
            supervisor_config,
            driver_config,
            drop_privileges,
        }
    }

    /// Run the [`Prober`] with a custom result handler.
    ///
    /// Opens the raw socket, optionally drops privileges and then runs cycles
    /// on the current thread until the configured number of cycles complete
    /// or a cycle fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use vigil_core::Builder;
    ///
    /// let addr = std::net::Ipv4Addr::new(1, 1, 1, 1);
    /// Builder::new(addr)
    ///     .max_cycles(Some(1))
    ///     .build()?
    ///     .run_with(|result| println!("{} {:.3}", result.sequence, result.rtt_ms))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn run_with<F: FnMut(&ProbeResult)>(&self, mut func: F) -> Result<()> {
        self.try_run_with(|result| {
            func(result);
            ControlFlow::Continue(())
        })
    }

    /// Run the [`Prober`] with a result handler which may stop the run.
    ///
    /// Returning `ControlFlow::Break` ends the current cycle and returns
    /// `Ok(())` without starting another.
    #[instrument(skip_all, level = "trace")]
    pub fn try_run_with<F>(&self, func: F) -> Result<()>
    where
        F: FnMut(&ProbeResult) -> ControlFlow<()>,
    {
        let channel = Channel::<SocketImpl>::connect(&self.channel_config)?;
        if self.drop_privileges {
            Privilege::drop_privileges()?;
        }
        let supervisor = Supervisor::new(self.supervisor_config.clone(), ProcessLauncher);
        Driver::new(self.driver_config, channel, supervisor).try_run(func)
    }

    #[must_use]
    pub const fn target_addr(&self) -> Ipv4Addr {
        self.driver_config.target_addr
    }

    #[must_use]
    pub const fn channel_config(&self) -> &ChannelConfig {
        &self.channel_config
    }

    #[must_use]
    pub const fn supervisor_config(&self) -> &SupervisorConfig {
        &self.supervisor_config
    }

    #[must_use]
    pub const fn driver_config(&self) -> &DriverConfig {
        &self.driver_config
    }

    #[must_use]
    pub const fn drop_privileges(&self) -> bool {
        self.drop_privileges
    }
}
