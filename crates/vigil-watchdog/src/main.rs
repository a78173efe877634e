#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions, clippy::missing_const_for_fn)]
#![forbid(unsafe_code)]

use anyhow::anyhow;
use clap::builder::Styles;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use vigil_core::defaults;
use vigil_core::watchdog::{Outcome, ParentTerminator, Watchdog, WatchdogConfig};

/// Kill the parent vigil process if a probe cycle does not end in time
#[derive(Parser, Debug)]
#[command(name = "watchdog", author, version, about, long_about = None, styles=Styles::styled())]
struct Args {
    /// The loopback heartbeat port to connect to [default: 3000]
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// How long to wait for the cycle to end [default: 10s]
    #[arg(short = 't', long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// The debug log filter [default: vigil=debug]
    #[arg(long)]
    log_filter: Option<String>,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn watchdog_config(&self) -> anyhow::Result<WatchdogConfig> {
        let heartbeat_port = self.port.unwrap_or(defaults::DEFAULT_HEARTBEAT_PORT);
        let timeout = self.timeout.unwrap_or(defaults::DEFAULT_WATCHDOG_TIMEOUT);
        if heartbeat_port == 0 {
            return Err(anyhow!("port must not be zero"));
        }
        if timeout.is_zero() {
            return Err(anyhow!("timeout must be greater than zero"));
        }
        Ok(WatchdogConfig {
            heartbeat_port,
            timeout,
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(args.log_filter.as_deref().unwrap_or("vigil=debug"))
            .compact()
            .init();
    }
    match run(&args) {
        Ok(Outcome::Completed | Outcome::Disconnected) => ExitCode::SUCCESS,
        Ok(Outcome::Terminated { target }) => {
            eprintln!("watchdog: probe of {target} did not complete in time, process terminated");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("watchdog: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<Outcome> {
    let config = args.watchdog_config()?;
    tracing::debug!(?config, "watchdog starting");
    Ok(Watchdog::new(config, ParentTerminator).run()?)
}

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("watchdog", 3000, Duration::from_secs(10); "defaults")]
    #[test_case("watchdog -p 4000", 4000, Duration::from_secs(10); "short port")]
    #[test_case("watchdog --port 4000 --timeout 1500ms", 4000, Duration::from_millis(1500); "long args")]
    #[test_case("watchdog -t 2s", 3000, Duration::from_secs(2); "short timeout")]
    fn test_watchdog_config(cmd: &str, port: u16, timeout: Duration) -> anyhow::Result<()> {
        let config = parse(cmd)?.watchdog_config()?;
        assert_eq!(
            WatchdogConfig {
                heartbeat_port: port,
                timeout
            },
            config
        );
        Ok(())
    }

    #[test_case("watchdog --port 0", "port must not be zero")]
    #[test_case("watchdog --timeout 0s", "timeout must be greater than zero")]
    fn test_watchdog_config_invalid(cmd: &str, expected: &str) -> anyhow::Result<()> {
        let err = parse(cmd)?.watchdog_config().unwrap_err();
        assert_eq!(expected, err.to_string());
        Ok(())
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(parse("watchdog --timeout soon").is_err());
    }

    fn parse(cmd: &str) -> anyhow::Result<Args> {
        Ok(Args::try_parse_from(
            cmd.split(' ').map(std::ffi::OsString::from),
        )?)
    }
}
