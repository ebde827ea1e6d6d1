use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use super::arithmetic::{ArithmeticError, BinaryOp, Holder, Operand};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(String),
}

/// An operation the processor can execute
pub trait Operation: std::fmt::Debug {
    /// Opcode, in upper case
    fn name(&self) -> &str;

    /// One-line description
    fn help(&self) -> &str;

    /// Run the operation on a destination and a source
    ///
    /// # Errors
    ///
    /// Fails if the operands cannot be read, written or combined.
    fn execute(
        &self,
        destination: &mut dyn Holder,
        source: Operand<'_>,
    ) -> Result<(), ArithmeticError>;
}

/// In-place arithmetic: `destination <op>= source`
#[derive(Debug, Clone)]
pub struct Arithmetic {
    name: &'static str,
    help: &'static str,
    op: BinaryOp,
}

impl Arithmetic {
    #[must_use]
    pub const fn new(name: &'static str, help: &'static str, op: BinaryOp) -> Self {
        Self { name, help, op }
    }
}

impl Operation for Arithmetic {
    fn name(&self) -> &str {
        self.name
    }

    fn help(&self) -> &str {
        self.help
    }

    fn execute(
        &self,
        destination: &mut dyn Holder,
        source: Operand<'_>,
    ) -> Result<(), ArithmeticError> {
        destination.apply(self.op, source)
    }
}

/// Copy the source value into the destination
#[derive(Debug, Clone, Copy)]
pub struct Mov;

impl Operation for Mov {
    fn name(&self) -> &str {
        "MOV"
    }

    fn help(&self) -> &str {
        "Copy a value to a register or a variable"
    }

    fn execute(
        &self,
        destination: &mut dyn Holder,
        source: Operand<'_>,
    ) -> Result<(), ArithmeticError> {
        let value = match source {
            Operand::Literal(value) => value,
            Operand::Holder(holder) => holder.load()?,
        };
        destination.store(value)
    }
}

/// A mapping from opcodes to operations
#[derive(Debug, Default)]
pub struct InstructionSet {
    operations: BTreeMap<String, Box<dyn Operation>>,
}

impl InstructionSet {
    /// An empty instruction set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The MASM-flavoured instruction set
    #[must_use]
    pub fn masm() -> Self {
        Self::new()
            .with(Arithmetic::new(
                "ADD",
                "Add a value to a register or a variable",
                BinaryOp::Add,
            ))
            .with(Arithmetic::new(
                "SUB",
                "Subtract a value from a register or a variable",
                BinaryOp::Sub,
            ))
            .with(Arithmetic::new(
                "MUL",
                "Multiply a register or a variable by a value",
                BinaryOp::Mul,
            ))
            .with(Arithmetic::new(
                "DIV",
                "Divide a register or a variable by a value, rounding down",
                BinaryOp::FloorDiv,
            ))
            .with(Mov)
    }

    /// Add an operation, replacing any operation with the same opcode
    #[must_use]
    pub fn with(mut self, operation: impl Operation + 'static) -> Self {
        self.insert(Box::new(operation));
        self
    }

    pub fn insert(&mut self, operation: Box<dyn Operation>) {
        let name = operation.name().to_uppercase();
        debug!(opcode = %name, "Registering operation");
        self.operations.insert(name, operation);
    }

    /// Find an operation by opcode (case-insensitive)
    ///
    /// # Errors
    ///
    /// Fails with [`InstructionError::UnknownOpcode`] if there is no such operation.
    pub fn get(&self, opcode: &str) -> Result<&dyn Operation, InstructionError> {
        self.operations
            .get(&opcode.to_uppercase())
            .map(AsRef::as_ref)
            .ok_or_else(|| InstructionError::UnknownOpcode(opcode.to_string()))
    }

    /// Operations, sorted by opcode
    pub fn iter(&self) -> impl Iterator<Item = &dyn Operation> {
        self.operations.values().map(AsRef::as_ref)
    }
}
