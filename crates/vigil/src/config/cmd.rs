use crate::config::{LogFormat, LogSpanEvents};
use clap::builder::Styles;
use clap::Parser;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Probe a host with ICMP echo requests under the supervision of a watchdog
#[derive(Parser, Debug)]
#[command(name = "vigil", author, version, about, long_about = None, arg_required_else_help(true), styles=Styles::styled())]
pub struct Args {
    /// The IPv4 address to probe
    pub target: Ipv4Addr,

    /// Config file
    #[arg(short = 'c', long, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<String>,

    /// The pause between cycles [default: 500ms]
    #[arg(short = 'i', long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// How long to wait for each echo reply [default: 5s]
    #[arg(short = 'W', long, value_parser = parse_duration)]
    pub reply_timeout: Option<Duration>,

    /// Stop after this many cycles [default: unbounded]
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// The ICMP echo identifier [default: the process id]
    #[arg(long)]
    pub identifier: Option<u16>,

    /// The sequence number of the first echo request [default: 0]
    #[arg(long)]
    pub initial_sequence: Option<u16>,

    /// The echo request payload text, a NUL byte is appended
    #[arg(long)]
    pub payload: Option<String>,

    /// The watchdog executable [default: ./watchdog]
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pub watchdog_path: Option<String>,

    /// The loopback port of the heartbeat channel [default: 3000]
    #[arg(long)]
    pub heartbeat_port: Option<u16>,

    /// How long the watchdog waits for a cycle to end [default: 10s]
    #[arg(long, value_parser = parse_duration)]
    pub watchdog_timeout: Option<Duration>,

    /// How long to wait for the watchdog to report ready [default: 2s]
    #[arg(long, value_parser = parse_duration)]
    pub ready_timeout: Option<Duration>,

    /// The debug log format [default: pretty]
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: vigil=debug]
    #[arg(long)]
    pub log_filter: Option<String>,

    /// The debug log format [default: off]
    #[arg(long)]
    pub log_span_events: Option<LogSpanEvents>,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}
