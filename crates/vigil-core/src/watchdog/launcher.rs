use crate::config::{defaults, SupervisorConfig};
use crate::error::SupervisionError;
use std::io;
use std::process::{Child, Command, Stdio};
use tracing::instrument;

/// Launches a watchdog for a single cycle.
pub trait Launcher {
    type Child: Reap;

    /// Start a watchdog which will connect to `config.heartbeat_addr()`.
    fn launch(&mut self, config: &SupervisorConfig) -> Result<Self::Child, SupervisionError>;
}

/// A launched watchdog which can be stopped and waited on.
pub trait Reap {
    /// Block until the watchdog has exited.
    fn reap(&mut self) -> io::Result<()>;

    /// Stop a watchdog whose cycle was abandoned before it started.
    ///
    /// Does nothing by default.
    fn kill(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Launch the watchdog as a child process.
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    type Child = Child;

    #[instrument(skip(self), level = "trace")]
    fn launch(&mut self, config: &SupervisorConfig) -> Result<Child, SupervisionError> {
        let child = Command::new(&config.watchdog_path)
            .args(watchdog_args(config))
            .stdin(Stdio::null())
            .spawn()
            .map_err(|err| SupervisionError::Spawn(err, config.watchdog_path.clone()))?;
        tracing::debug!(pid = child.id(), "watchdog spawned");
        Ok(child)
    }
}

impl Reap for Child {
    fn reap(&mut self) -> io::Result<()> {
        let status = self.wait()?;
        tracing::debug!(pid = self.id(), %status, "watchdog reaped");
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        tracing::debug!(pid = self.id(), "killing watchdog");
        Child::kill(self)
    }
}

/// The command line arguments passed to the watchdog executable.
///
/// Only values which differ from the watchdog defaults are passed.
#[must_use]
pub fn watchdog_args(config: &SupervisorConfig) -> Vec<String> {
    let mut args = vec![];
    if config.heartbeat_port != defaults::DEFAULT_HEARTBEAT_PORT {
        args.push(String::from("--port"));
        args.push(config.heartbeat_port.to_string());
    }
    if config.watchdog_timeout != defaults::DEFAULT_WATCHDOG_TIMEOUT {
        args.push(String::from("--timeout"));
        args.push(format!("{}ms", config.watchdog_timeout.as_millis()));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_watchdog_args_default() {
        assert!(watchdog_args(&SupervisorConfig::default()).is_empty());
    }

    #[test]
    fn test_watchdog_args_overridden() {
        let config = SupervisorConfig {
            heartbeat_port: 4000,
            watchdog_timeout: Duration::from_millis(1500),
            ..Default::default()
        };
        assert_eq!(
            vec!["--port", "4000", "--timeout", "1500ms"],
            watchdog_args(&config)
        );
    }

    #[test]
    fn test_kill_and_reap_child() -> anyhow::Result<()> {
        let mut child = Command::new("sleep").arg("30").spawn()?;
        Reap::kill(&mut child)?;
        child.reap()?;
        assert!(child.try_wait()?.is_some());
        Ok(())
    }

    #[test]
    fn test_launch_missing_executable() {
        let config = SupervisorConfig {
            watchdog_path: PathBuf::from("/nonexistent/vigil/watchdog"),
            ..Default::default()
        };
        let err = ProcessLauncher.launch(&config).unwrap_err();
        assert!(matches!(err, SupervisionError::Spawn(_, path) if path == config.watchdog_path));
    }
}
