use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod commands;
mod interactive;
mod logging;

use crate::commands::{MachineOpt, Subcommand};
use crate::logging::LogOpt;

#[derive(Parser)]
#[command(name = "masm", version, author, about)]
struct Opt {
    #[command(flatten)]
    log: LogOpt,

    #[command(flatten)]
    machine: MachineOpt,

    #[command(subcommand)]
    command: Subcommand,
}

fn main() -> ExitCode {
    let opt = Opt::parse();
    opt.log.init();

    match opt.command.exec(&opt.machine) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
