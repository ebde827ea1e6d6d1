use thiserror::Error;
use tracing::{debug, info};

use crate::codec::CodecError;
use crate::constants::{self as C, Integer};

pub mod arithmetic;
pub mod instructions;
pub mod memory;
pub mod registers;
pub mod stack;

pub use self::arithmetic::{ArithmeticError, BinaryOp, Holder, Number, Operand};
pub use self::instructions::{InstructionError, InstructionSet, Operation};
pub use self::memory::{Memory, MemoryError, Slot, Variable};
pub use self::registers::{Register, RegisterError, RegisterFile};
pub use self::stack::{Stack, StackError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

type Result<T> = std::result::Result<T, MachineError>;

/// Where a value can be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Register(String),
    Variable(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register(name) => write!(f, "%{name}"),
            Self::Variable(name) => write!(f, "{name}"),
        }
    }
}

/// Where a value can be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Literal(Integer),
    Register(String),
    Variable(String),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Register(name) => write!(f, "%{name}"),
            Self::Variable(name) => write!(f, "{name}"),
        }
    }
}

impl From<Target> for Source {
    fn from(target: Target) -> Self {
        match target {
            Target::Register(name) => Self::Register(name),
            Target::Variable(name) => Self::Variable(name),
        }
    }
}

#[derive(Error, Debug)]
#[error("could not parse operand {0:?}")]
pub struct OperandParseError(String);

impl std::str::FromStr for Source {
    type Err = OperandParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        crate::parser::parse_source(s.trim()).map_err(|_| OperandParseError(s.to_string()))
    }
}

impl std::str::FromStr for Target {
    type Err = OperandParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        crate::parser::parse_target(s.trim()).map_err(|_| OperandParseError(s.to_string()))
    }
}

/// The whole machine state: registers, variable memory, value stack and the instructions it
/// understands
pub struct Computer {
    pub registers: RegisterFile,
    pub memory: Memory,
    pub stack: Stack<Integer>,
    instructions: InstructionSet,
}

impl Default for Computer {
    fn default() -> Self {
        Self::new(C::MEMORY_SIZE, C::STACK_SIZE, InstructionSet::masm())
    }
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {}, memory: {:?}, stack: [...] }}",
            self.registers, self.memory
        )
    }
}

impl Computer {
    /// Build a computer with the x86 register file
    #[must_use]
    pub fn new(memory_size: usize, stack_size: usize, instructions: InstructionSet) -> Self {
        debug!(memory_size, stack_size, "Building computer");
        Self {
            registers: RegisterFile::x86(),
            memory: Memory::new(memory_size),
            stack: Stack::new(stack_size),
            instructions,
        }
    }

    #[must_use]
    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    /// Read the value of an operand
    ///
    /// # Errors
    ///
    /// Fails if the register or variable does not exist, or if the variable is not initialized.
    pub fn value(&self, source: &Source) -> Result<Integer> {
        match source {
            Source::Literal(value) => Ok(*value),
            Source::Register(name) => Ok(Integer::from(self.registers.get(name)?.read())),
            Source::Variable(name) => Ok(self.memory.value(name)?),
        }
    }

    /// Execute an operation on a target, with a source
    ///
    /// When the target is a variable, the result is written back to memory.
    ///
    /// # Errors
    ///
    /// Fails if the opcode is unknown, if an operand cannot be resolved, or if the operation
    /// fails.
    #[tracing::instrument(skip(self), err)]
    pub fn execute(&mut self, opcode: &str, target: &Target, source: &Source) -> Result<()> {
        let operation = self.instructions.get(opcode)?;

        let source_register;
        let source_variable;
        let operand = match source {
            Source::Literal(value) => Operand::Literal(*value),
            Source::Register(name) => {
                source_register = self.registers.get(name)?;
                Operand::Holder(&source_register)
            }
            Source::Variable(name) => {
                source_variable = self.memory.read(name)?;
                Operand::Holder(&source_variable)
            }
        };

        match target {
            Target::Register(name) => {
                let mut destination = self.registers.get(name)?;
                operation.execute(&mut destination, operand)?;
                info!("{destination}");
            }
            Target::Variable(name) => {
                let mut destination = self.memory.read(name)?;
                operation.execute(&mut destination, operand)?;
                self.memory.store(&destination)?;
                info!("{destination}");
            }
        }

        Ok(())
    }

    /// Push the value of an operand on the stack
    ///
    /// # Errors
    ///
    /// Fails if the operand cannot be read or the stack is full.
    #[tracing::instrument(skip(self), err)]
    pub fn push(&mut self, source: &Source) -> Result<()> {
        let value = self.value(source)?;
        self.stack.push(value)?;
        debug!(value, depth = self.stack.len(), "Pushed value");
        Ok(())
    }

    /// Pop the top of the stack into a register or variable
    ///
    /// The value stays on the stack if it cannot be stored in the target.
    ///
    /// # Errors
    ///
    /// Fails if the stack is empty, if the target does not exist or cannot hold the value.
    #[tracing::instrument(skip(self), err)]
    pub fn pop(&mut self, target: &Target) -> Result<Integer> {
        let value = *self
            .stack
            .peek()
            .ok_or(StackError::NoMoreObjectsInStack)?;

        // Both writes are checked before any byte changes
        match target {
            Target::Register(name) => self.registers.get(name)?.write(value)?,
            Target::Variable(name) => self.memory.assign(name, value)?,
        }

        self.stack.pop()?;
        debug!(value, depth = self.stack.len(), "Popped value");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::TypeDescriptor;

    fn reg(name: &str) -> Target {
        Target::Register(name.to_string())
    }

    fn var(name: &str) -> Target {
        Target::Variable(name.to_string())
    }

    #[test]
    fn execute_register_test() {
        let mut computer = Computer::default();

        computer
            .execute("MOV", &reg("eax"), &Source::Literal(5))
            .unwrap();
        computer
            .execute("ADD", &reg("eax"), &Source::Literal(5))
            .unwrap();
        assert_eq!(computer.registers.get("eax").unwrap().read(), 10);

        // Sub-registers see the change
        assert_eq!(computer.registers.get("al").unwrap().read(), 10);

        computer
            .execute("ADD", &reg("ax"), &Source::Register("al".to_string()))
            .unwrap();
        assert_eq!(computer.registers.get("eax").unwrap().read(), 20);

        let err = computer
            .execute("ADD", &reg("al"), &Source::Register("eax".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            MachineError::Arithmetic(ArithmeticError::IncompatibleVariableSizes {
                left: 1,
                right: 4
            })
        );
    }

    #[test]
    fn execute_variable_test() {
        let mut computer = Computer::default();
        computer
            .memory
            .declare("x", TypeDescriptor::of::<u32>(), Some(10))
            .unwrap();
        computer
            .memory
            .declare("y", TypeDescriptor::of::<u16>(), Some(5))
            .unwrap();

        computer
            .execute("add", &var("x"), &Source::Variable("y".to_string()))
            .unwrap();
        assert_eq!(computer.memory.value("x"), Ok(15));

        computer
            .execute("MOV", &reg("ebx"), &Source::Variable("x".to_string()))
            .unwrap();
        assert_eq!(computer.registers.get("ebx").unwrap().read(), 15);

        assert!(matches!(
            computer.execute("ADD", &var("y"), &Source::Variable("x".to_string())),
            Err(MachineError::Arithmetic(
                ArithmeticError::IncompatibleVariableSizes { .. }
            ))
        ));
        assert_eq!(computer.memory.value("y"), Ok(5));
    }

    #[test]
    fn mov_initializes_variable_test() {
        let mut computer = Computer::default();
        computer
            .memory
            .declare("z", TypeDescriptor::of::<i16>(), None)
            .unwrap();

        assert!(computer
            .execute("ADD", &var("z"), &Source::Literal(1))
            .is_err());

        computer
            .execute("MOV", &var("z"), &Source::Literal(-12))
            .unwrap();
        assert_eq!(computer.memory.value("z"), Ok(-12));
    }

    #[test]
    fn unknown_operands_test() {
        let mut computer = Computer::default();
        assert_eq!(
            computer
                .execute("JMP", &reg("eax"), &Source::Literal(1))
                .unwrap_err(),
            MachineError::Instruction(InstructionError::UnknownOpcode("JMP".to_string()))
        );
        assert_eq!(
            computer
                .execute("ADD", &reg("rax"), &Source::Literal(1))
                .unwrap_err(),
            MachineError::Register(RegisterError::UnknownRegister("rax".to_string()))
        );
        assert_eq!(
            computer
                .execute("ADD", &reg("eax"), &Source::Variable("nope".to_string()))
                .unwrap_err(),
            MachineError::Memory(MemoryError::VariableNotDefined("nope".to_string()))
        );
    }

    #[test]
    fn stack_test() {
        let mut computer = Computer::new(16, 2, InstructionSet::masm());
        computer.registers.get("ecx").unwrap().write(7).unwrap();

        computer.push(&Source::Register("ecx".to_string())).unwrap();
        computer.push(&Source::Literal(42)).unwrap();
        assert_eq!(
            computer.push(&Source::Literal(1)).unwrap_err(),
            MachineError::Stack(StackError::StackFull { capacity: 2 })
        );

        assert_eq!(computer.pop(&reg("dl")), Ok(42));
        assert_eq!(computer.registers.get("edx").unwrap().read(), 42);

        computer
            .memory
            .declare("v", TypeDescriptor::of::<u8>(), None)
            .unwrap();
        assert_eq!(computer.pop(&var("v")), Ok(7));
        assert_eq!(computer.memory.value("v"), Ok(7));

        assert_eq!(
            computer.pop(&reg("eax")).unwrap_err(),
            MachineError::Stack(StackError::NoMoreObjectsInStack)
        );
    }

    #[test]
    fn failed_pop_keeps_value_test() {
        let mut computer = Computer::new(16, 4, InstructionSet::masm());
        computer.push(&Source::Literal(300)).unwrap();

        assert_eq!(
            computer.pop(&reg("al")).unwrap_err(),
            MachineError::Codec(CodecError::OutOfRange {
                value: 300,
                size: crate::types::ByteSize::Byte
            })
        );
        assert_eq!(computer.stack.len(), 1);
        assert_eq!(computer.registers.get("eax").unwrap().read(), 0);

        assert_eq!(
            computer.pop(&reg("rax")).unwrap_err(),
            MachineError::Register(RegisterError::UnknownRegister("rax".to_string()))
        );
        assert_eq!(
            computer.pop(&var("missing")).unwrap_err(),
            MachineError::Memory(MemoryError::VariableNotDefined("missing".to_string()))
        );
        assert_eq!(computer.stack.len(), 1);

        assert_eq!(computer.pop(&reg("ax")), Ok(300));
        assert_eq!(computer.stack.len(), 0);
        assert_eq!(computer.registers.get("eax").unwrap().read(), 300);
    }

    #[test]
    fn operand_parse_test() {
        assert_eq!("%eax".parse::<Target>().unwrap(), reg("eax"));
        assert_eq!("x".parse::<Target>().unwrap(), var("x"));
        assert!("42".parse::<Target>().is_err());

        assert_eq!("0x2A".parse::<Source>().unwrap(), Source::Literal(42));
        assert_eq!("-3".parse::<Source>().unwrap(), Source::Literal(-3));
        assert_eq!(
            " %al ".parse::<Source>().unwrap(),
            Source::Register("al".to_string())
        );
        assert!("%".parse::<Source>().is_err());
        assert!("1x".parse::<Source>().is_err());

        assert_eq!(reg("eax").to_string(), "%eax");
        assert_eq!(Source::Literal(-3).to_string(), "-3");
    }
}
