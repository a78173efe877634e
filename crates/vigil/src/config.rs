use anyhow::anyhow;
use clap::ValueEnum;
use file::ConfigFile;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use vigil_core::{defaults, MAX_PAYLOAD_SIZE};

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// How to log event spans.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSpanEvents {
    /// Do not display event spans.
    Off,
    /// Display enter and exit event spans.
    Active,
    /// Display all event spans.
    Full,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Eq, PartialEq)]
pub struct VigilConfig {
    pub target: Ipv4Addr,
    pub interval: Duration,
    pub reply_timeout: Duration,
    pub count: Option<usize>,
    pub identifier: u16,
    pub initial_sequence: u16,
    pub payload: Vec<u8>,
    pub watchdog_path: PathBuf,
    pub heartbeat_port: u16,
    pub watchdog_timeout: Duration,
    pub ready_timeout: Duration,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
    pub log_span_events: LogSpanEvents,
}

impl VigilConfig {
    pub fn from(args: Args, pid: u16) -> anyhow::Result<Self> {
        let cfg_file = if let Some(cfg) = &args.config_file {
            file::read_config_file(cfg)?
        } else {
            file::read_default_config_file()?.unwrap_or_default()
        };
        Self::build_config(args, cfg_file, pid)
    }

    fn build_config(args: Args, cfg_file: ConfigFile, pid: u16) -> anyhow::Result<Self> {
        let cfg_file_vigil = cfg_file.vigil.unwrap_or_default();
        let cfg_file_probe = cfg_file.probe.unwrap_or_default();
        let cfg_file_watchdog = cfg_file.watchdog.unwrap_or_default();
        let verbose = args.verbose;
        let log_format = cfg_layer(
            args.log_format,
            cfg_file_vigil.log_format,
            constants::DEFAULT_LOG_FORMAT,
        );
        let log_filter = cfg_layer(
            args.log_filter,
            cfg_file_vigil.log_filter,
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        let log_span_events = cfg_layer(
            args.log_span_events,
            cfg_file_vigil.log_span_events,
            constants::DEFAULT_LOG_SPAN_EVENTS,
        );
        let interval = cfg_layer(
            args.interval,
            cfg_file_probe.interval,
            defaults::DEFAULT_INTERVAL,
        );
        let reply_timeout = cfg_layer(
            args.reply_timeout,
            cfg_file_probe.reply_timeout,
            defaults::DEFAULT_REPLY_TIMEOUT,
        );
        let count = cfg_layer_opt(args.count, cfg_file_probe.count);
        let identifier = cfg_layer(args.identifier, cfg_file_probe.identifier, pid);
        let initial_sequence = cfg_layer(
            args.initial_sequence,
            cfg_file_probe.initial_sequence,
            defaults::DEFAULT_INITIAL_SEQUENCE,
        );
        let payload = cfg_layer_opt(args.payload, cfg_file_probe.payload)
            .map_or_else(|| defaults::DEFAULT_PAYLOAD.to_vec(), payload_bytes);
        let watchdog_path = cfg_layer(
            args.watchdog_path,
            cfg_file_watchdog.path,
            String::from(defaults::DEFAULT_WATCHDOG_PATH),
        );
        let heartbeat_port = cfg_layer(
            args.heartbeat_port,
            cfg_file_watchdog.heartbeat_port,
            defaults::DEFAULT_HEARTBEAT_PORT,
        );
        let watchdog_timeout = cfg_layer(
            args.watchdog_timeout,
            cfg_file_watchdog.timeout,
            defaults::DEFAULT_WATCHDOG_TIMEOUT,
        );
        let ready_timeout = cfg_layer(
            args.ready_timeout,
            cfg_file_watchdog.ready_timeout,
            defaults::DEFAULT_READY_TIMEOUT,
        );
        validate_count(count)?;
        validate_payload(&payload)?;
        validate_timeouts(reply_timeout, watchdog_timeout, ready_timeout)?;
        validate_heartbeat_port(heartbeat_port)?;
        Ok(Self {
            target: args.target,
            interval,
            reply_timeout,
            count,
            identifier,
            initial_sequence,
            payload,
            watchdog_path: PathBuf::from(watchdog_path),
            heartbeat_port,
            watchdog_timeout,
            ready_timeout,
            verbose,
            log_format,
            log_filter,
            log_span_events,
        })
    }
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            target: Ipv4Addr::LOCALHOST,
            interval: defaults::DEFAULT_INTERVAL,
            reply_timeout: defaults::DEFAULT_REPLY_TIMEOUT,
            count: None,
            identifier: 0,
            initial_sequence: defaults::DEFAULT_INITIAL_SEQUENCE,
            payload: defaults::DEFAULT_PAYLOAD.to_vec(),
            watchdog_path: PathBuf::from(defaults::DEFAULT_WATCHDOG_PATH),
            heartbeat_port: defaults::DEFAULT_HEARTBEAT_PORT,
            watchdog_timeout: defaults::DEFAULT_WATCHDOG_TIMEOUT,
            ready_timeout: defaults::DEFAULT_READY_TIMEOUT,
            verbose: false,
            log_format: constants::DEFAULT_LOG_FORMAT,
            log_filter: String::from(constants::DEFAULT_LOG_FILTER),
            log_span_events: constants::DEFAULT_LOG_SPAN_EVENTS,
        }
    }
}

/// The payload bytes for the given text, NUL terminated.
fn payload_bytes(text: String) -> Vec<u8> {
    let mut bytes = text.into_bytes();
    bytes.push(0);
    bytes
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

fn cfg_layer_opt<T>(fst: Option<T>, snd: Option<T>) -> Option<T> {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => Some(val),
        (None, None) => None,
    }
}

/// Validate the cycle count.
fn validate_count(count: Option<usize>) -> anyhow::Result<()> {
    if count == Some(0) {
        Err(anyhow!("count must be greater than zero"))
    } else {
        Ok(())
    }
}

/// Validate the payload size.
fn validate_payload(payload: &[u8]) -> anyhow::Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        Err(anyhow!(
            "payload ({} bytes including the trailing NUL) must not exceed {} bytes",
            payload.len(),
            MAX_PAYLOAD_SIZE
        ))
    } else {
        Ok(())
    }
}

/// Validate the reply, watchdog and ready timeouts.
///
/// The watchdog must not fire before the in-process reply deadline.
fn validate_timeouts(
    reply_timeout: Duration,
    watchdog_timeout: Duration,
    ready_timeout: Duration,
) -> anyhow::Result<()> {
    if reply_timeout.is_zero() {
        Err(anyhow!("reply-timeout must be greater than zero"))
    } else if ready_timeout.is_zero() {
        Err(anyhow!("ready-timeout must be greater than zero"))
    } else if watchdog_timeout < reply_timeout {
        Err(anyhow!(
            "watchdog-timeout ({}) must not be shorter than reply-timeout ({})",
            humantime::format_duration(watchdog_timeout),
            humantime::format_duration(reply_timeout)
        ))
    } else {
        Ok(())
    }
}

/// Validate the heartbeat port.
fn validate_heartbeat_port(heartbeat_port: u16) -> anyhow::Result<()> {
    if heartbeat_port == 0 {
        Err(anyhow!("heartbeat-port must not be zero"))
    } else {
        Ok(())
    }
}
