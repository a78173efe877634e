#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation
)]
#![forbid(unsafe_code)]

use clap::Parser;
use config::{Args, VigilConfig};
use std::process::{self, ExitCode};
use vigil_privilege::Privilege;

mod app;
mod config;
mod report;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("vigil: {err}");
            ExitCode::from(app::exit_code(&err))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let privilege = Privilege::acquire_privileges()?;
    let pid = u16::try_from(process::id() % u32::from(u16::MAX))?;
    let cfg = VigilConfig::from(args, pid)?;
    app::run_vigil(&cfg, &privilege)
}
