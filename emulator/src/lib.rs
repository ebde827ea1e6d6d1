pub mod codec;
pub mod constants;
pub mod parser;
pub mod runtime;
pub mod store;
pub mod types;

pub use self::{
    runtime::{Computer, MachineError, Source, Target},
    types::{ByteSize, TypeDescriptor},
};
