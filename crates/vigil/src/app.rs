use crate::config::{LogFormat, LogSpanEvents, VigilConfig};
use crate::report::Reporter;
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use vigil_core::{Builder, Error};
use vigil_privilege::Privilege;

/// Run the vigil application.
pub fn run_vigil(cfg: &VigilConfig, privilege: &Privilege) -> anyhow::Result<()> {
    configure_logging(cfg);
    privilege.ensure()?;
    tracing::debug!(?cfg);
    let prober = Builder::new(cfg.target)
        .identifier(cfg.identifier)
        .initial_sequence(cfg.initial_sequence)
        .payload(cfg.payload.as_slice())
        .interval(cfg.interval)
        .reply_timeout(cfg.reply_timeout)
        .max_cycles(cfg.count)
        .watchdog_path(&cfg.watchdog_path)
        .heartbeat_port(cfg.heartbeat_port)
        .watchdog_timeout(cfg.watchdog_timeout)
        .ready_timeout(cfg.ready_timeout)
        .drop_privileges(true)
        .build()?;
    let mut reporter = Reporter::new(io::stdout().lock(), cfg.target);
    prober.try_run_with(|result| reporter.handle(result))?;
    reporter.finish()
}

/// The process exit code for a fatal error.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<Error>() {
        match err {
            Error::BadConfig(_) | Error::InvalidPayloadSize(_) => 3,
            Error::PrivilegeRequired(_) | Error::PrivilegeError(_) => 4,
            Error::IoError(_) | Error::ProbeFailed(_) | Error::PacketError(_) => 5,
            Error::Supervision(_) => 6,
            Error::NoReply { .. } => 7,
        }
    } else if err.downcast_ref::<vigil_privilege::Error>().is_some() {
        4
    } else if err.downcast_ref::<io::Error>().is_some() {
        5
    } else {
        3
    }
}

fn configure_logging(cfg: &VigilConfig) {
    if cfg.verbose {
        let fmt_span = match cfg.log_span_events {
            LogSpanEvents::Off => FmtSpan::NONE,
            LogSpanEvents::Active => FmtSpan::ACTIVE,
            LogSpanEvents::Full => FmtSpan::FULL,
        };
        match cfg.log_format {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_writer(io::stderr)
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_writer(io::stderr)
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .pretty()
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_writer(io::stderr)
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .json()
                    .init();
            }
        }
    }
}
