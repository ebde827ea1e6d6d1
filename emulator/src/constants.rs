use crate::types::ByteSize;

/// Integer type used to carry values across the machine.
///
/// It is wide enough to hold both the full unsigned and the full signed range of the widest
/// (8 bytes) variable type.
pub type Integer = i128;

/// Default capacity of the variable memory, in bytes
pub const MEMORY_SIZE: usize = 1024;

/// Default depth of the value stack
pub const STACK_SIZE: usize = 1024;

/// Size of the general purpose registers
pub const REGISTER_SIZE: ByteSize = ByteSize::DWord;

/// Placeholder name given to the discarded high half when a register is split
pub(crate) const UNNAMED_HALF: &str = "_";
