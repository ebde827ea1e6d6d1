mod decode;
mod encode;
mod types;

use clap::{Args, CommandFactory};
use masm_emulator::constants::{self as C, Integer};
use masm_emulator::runtime::InstructionSet;
use masm_emulator::Computer;
use tracing::debug;

use crate::interactive::run_interactive;

/// Layout of the machine the commands run against
#[derive(Args, Debug)]
pub struct MachineOpt {
    /// Size of the variable memory, in bytes
    #[arg(long, default_value_t = C::MEMORY_SIZE, global = true)]
    memory_size: usize,

    /// Number of slots in the value stack
    #[arg(long, default_value_t = C::STACK_SIZE, global = true)]
    stack_size: usize,
}

impl MachineOpt {
    /// A fresh machine with the x86 register file and the MASM instructions
    pub fn build(&self) -> Computer {
        debug!(
            memory_size = self.memory_size,
            stack_size = self.stack_size,
            "Building machine"
        );
        Computer::new(self.memory_size, self.stack_size, InstructionSet::masm())
    }
}

/// Parse a number literal argument
pub(crate) fn integer(input: &str) -> Result<Integer, String> {
    masm_emulator::parser::parse_number(input)
        .map_err(|e| format!("invalid number literal near {:?}", e.input))
}

/// Format bytes as space-separated hexadecimal pairs
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Start an interactive session on a fresh machine
    Shell,

    /// Print the bytes a value is stored as
    Encode(self::encode::EncodeOpt),

    /// Read a value back from its bytes
    Decode(self::decode::DecodeOpt),

    /// List the supported variable types
    Types(self::types::TypesOpt),

    /// Generate shell completions for masm
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self, machine: &MachineOpt) -> anyhow::Result<()> {
        match self {
            Self::Shell => run_interactive(&mut machine.build()),
            Self::Encode(opt) => opt.exec(),
            Self::Decode(opt) => opt.exec(),
            Self::Types(opt) => opt.exec(),
            Self::Completion { shell } => {
                let mut command = crate::Opt::command();
                let name = command.get_name().to_string();
                clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
                Ok(())
            }
        }
    }
}
