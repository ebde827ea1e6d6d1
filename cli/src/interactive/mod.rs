//! This module implements the TTY interactive interface.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use clap::Parser;
use masm_emulator::constants::Integer;
use masm_emulator::runtime::{Computer, MachineError, Source, Target};
use masm_emulator::TypeDescriptor;
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

use crate::commands::{hex, integer};

mod helper;
use self::helper::RunHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command.
Registers are written %name, numbers in decimal, 0x hexadecimal, 0o octal or 0b binary."#;

#[derive(Parser, Clone, Debug)]
#[command(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
    allow_negative_numbers = true,
)]
/// Interactive mode commands
enum Command {
    /// Show the state of registers
    #[command(alias = "r")]
    Registers {
        /// Only show this register
        register: Option<String>,
    },

    /// Show the declared variables
    Memory,

    /// Show the content of the stack, from the top
    Stack,

    /// List the available instructions
    Instructions,

    /// Declare a new variable
    Declare {
        /// Name of the variable
        name: String,

        /// Type of the variable, e.g. BYTE or SWORD
        kind: TypeDescriptor,

        /// Initial value
        #[arg(value_parser = integer, allow_hyphen_values = true)]
        value: Option<Integer>,
    },

    /// Set the value of a variable
    Assign {
        name: String,

        #[arg(value_parser = integer, allow_hyphen_values = true)]
        value: Integer,
    },

    /// Show a variable and its bytes
    #[command(alias = "p")]
    Print { name: String },

    /// Delete a variable
    Delete { name: String },

    /// Execute an instruction, e.g. "exec ADD %eax 5"
    #[command(alias = "x")]
    Exec {
        opcode: String,

        /// Register or variable to modify
        target: Target,

        /// Number, register or variable to read
        #[arg(allow_hyphen_values = true)]
        source: Source,
    },

    /// Push a value on the stack
    Push {
        #[arg(allow_hyphen_values = true)]
        source: Source,
    },

    /// Pop the top of the stack into a register or variable
    Pop { target: Target },

    /// Exit the shell
    Exit,
}

/// Run a single command against the machine
fn run_command(computer: &mut Computer, command: Command) -> Result<(), MachineError> {
    match command {
        Command::Exit => {}

        Command::Registers { register } => {
            if let Some(name) = register {
                let register = computer.registers.get(&name)?;
                info!(usage = register.usage(), "Register {register}");
            } else {
                for register in computer.registers.roots() {
                    info!(usage = register.usage(), "{register}");
                }
            }
        }

        Command::Memory => {
            let memory = &computer.memory;
            info!(
                used = memory.next_free(),
                available = memory.available(),
                "Memory"
            );
            for line in memory.to_string().lines() {
                info!("  {line}");
            }
        }

        Command::Stack => {
            let stack = &computer.stack;
            info!(
                depth = stack.len(),
                capacity = stack.capacity(),
                pointer = stack.pointer(),
                "Stack"
            );
            for value in stack.iter() {
                info!("  {value}");
            }
        }

        Command::Instructions => {
            for operation in computer.instructions().iter() {
                info!("{:<4} {}", operation.name(), operation.help());
            }
        }

        Command::Declare { name, kind, value } => {
            let slot = computer.memory.declare(&name, kind, value)?;
            info!(offset = slot.offset, "Declared {kind} {name}");
        }

        Command::Assign { name, value } => {
            computer.memory.assign(&name, value)?;
            info!("{}", computer.memory.read(&name)?);
        }

        Command::Print { name } => {
            let variable = computer.memory.read(&name)?;
            let bytes = computer.memory.bytes(&name)?;
            info!(offset = variable.offset(), bytes = %hex(&bytes), "{variable}");
        }

        Command::Delete { name } => {
            computer.memory.delete(&name)?;
            info!("Deleted {name}");
        }

        Command::Exec {
            opcode,
            target,
            source,
        } => {
            computer.execute(&opcode, &target, &source)?;
        }

        Command::Push { source } => {
            computer.push(&source)?;
            info!(depth = computer.stack.len(), "Pushed {source}");
        }

        Command::Pop { target } => {
            let value = computer.pop(&target)?;
            info!("Popped {value} into {target}");
        }
    }

    Ok(())
}

pub(crate) fn run_interactive(computer: &mut Computer) -> anyhow::Result<()> {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let h: RunHelper<Command> = RunHelper::new(&computer.registers, computer.instructions());
    let mut rl: Editor<RunHelper<Command>, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(h));

    let mut last_command: Option<Command> = None;

    'read: loop {
        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if readline.trim().is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            match Command::try_parse_from(words) {
                Ok(command) => {
                    last_command = Some(command.clone());
                    command
                }
                Err(e) => {
                    // Help and usage errors are already formatted by clap
                    warn!("{e}");
                    continue 'read;
                }
            }
        };

        debug!("Executing command: {:?}", command);

        if let Command::Exit = command {
            return Ok(());
        }

        if let Err(e) = run_command(computer, command) {
            warn!(error = &e as &dyn std::error::Error, "Command failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use masm_emulator::runtime::{InstructionSet, MemoryError};

    use super::*;

    fn run(computer: &mut Computer, line: &str) -> Result<(), MachineError> {
        let words = shell_words::split(line).unwrap();
        let command = Command::try_parse_from(words).unwrap();
        run_command(computer, command)
    }

    #[test]
    fn session_test() {
        let mut computer = Computer::new(32, 4, InstructionSet::masm());

        run(&mut computer, "declare total SDWORD -5").unwrap();
        run(&mut computer, "declare step byte 0x10").unwrap();
        run(&mut computer, "exec add total step").unwrap();
        assert_eq!(computer.memory.value("total"), Ok(11));

        run(&mut computer, "x mov %eax total").unwrap();
        run(&mut computer, "push %ax").unwrap();
        run(&mut computer, "pop step").unwrap();
        assert_eq!(computer.memory.value("step"), Ok(11));

        run(&mut computer, "assign step 0b1").unwrap();
        run(&mut computer, "delete total").unwrap();
        assert_eq!(
            run(&mut computer, "print total"),
            Err(MachineError::Memory(MemoryError::VariableNotDefined(
                "total".to_string()
            )))
        );
    }

    #[test]
    fn parse_test() {
        assert!(Command::try_parse_from(["exec", "ADD", "42", "1"]).is_err());
        assert!(Command::try_parse_from(["declare", "x", "TBYTE"]).is_err());
        assert!(matches!(
            Command::try_parse_from(["push", "-3"]),
            Ok(Command::Push {
                source: Source::Literal(-3)
            })
        ));
    }
}
