//! Vigil - supervised `ICMP` liveness probing.
//!
//! This crate provides the probing engine used by the standalone `vigil`
//! application. Each probe cycle sends a single `ICMPv4` echo request to a
//! target over a raw socket and waits for the matching echo reply. Every
//! cycle is guarded by an external watchdog process which kills the prober if
//! the cycle does not complete in time.
//!
//! # Example
//!
//! The following example probes a target four times, printing each result:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::Ipv4Addr;
//! # use std::str::FromStr;
//! use vigil_core::Builder;
//!
//! let addr = Ipv4Addr::from_str("1.1.1.1")?;
//! Builder::new(addr)
//!     .max_cycles(Some(4))
//!     .build()?
//!     .run_with(|result| println!("{:?}", result))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Watchdog
//!
//! The watchdog is a separate executable which connects back to the prober
//! over a loopback TCP heartbeat channel. See [`watchdog`] for the protocol
//! and [`watchdog::Watchdog`] for the watchdog side of it.
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Prober`].
//! - [`Prober::run_with`] - Run the prober with a custom result handler.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod builder;
mod config;
mod driver;
mod error;
mod net;
mod probe;
mod prober;
mod types;
pub mod watchdog;

pub use builder::Builder;
pub use config::{defaults, heartbeat_addr, ChannelConfig, DriverConfig, SupervisorConfig};
pub use driver::Driver;
pub use error::{Error, ErrorKind, IoError, IoOperation, Result, SupervisionError};
pub use net::{Network, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE};
pub use probe::{round_trip_millis, EchoReply, EchoRequest, ProbeResult};
pub use prober::Prober;
pub use types::{MaxCycles, Sequence, TraceId};
