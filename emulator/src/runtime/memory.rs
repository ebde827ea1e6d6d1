use std::collections::BTreeMap;
use std::ops::Range;

use thiserror::Error;
use tracing::debug;

use super::arithmetic::{self, ArithmeticError, Holder};
use crate::codec::{self, CodecError};
use crate::constants::Integer;
use crate::store::BackingStore;
use crate::types::TypeDescriptor;

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("variable {0} has not been defined")]
    VariableNotDefined(String),

    #[error("variable {0} is already defined")]
    VariableAlreadyDefined(String),

    #[error("variable {0} has not been initialized")]
    VariableNotInitialized(String),

    #[error("out of memory: {requested} bytes requested, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

type Result<T> = std::result::Result<T, MemoryError>;

/// Where a variable lives in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub kind: TypeDescriptor,
    pub initialized: bool,
}

impl Slot {
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.kind.bytes()
    }
}

/// Byte-addressed variable memory.
///
/// Variables are bump-allocated: each new declaration gets the bytes right after the previous one,
/// and the bytes of a deleted variable are zeroed but never handed out again.
pub struct Memory {
    store: BackingStore,
    next_free: usize,
    variables: BTreeMap<String, Slot>,
}

impl Memory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            store: BackingStore::new(capacity),
            next_free: 0,
            variables: BTreeMap::new(),
        }
    }

    /// Total size of the memory, in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Offset the next variable will be allocated at
    #[must_use]
    pub fn next_free(&self) -> usize {
        self.next_free
    }

    /// Number of bytes still available for new variables
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity() - self.next_free
    }

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.variables
            .get(name)
            .ok_or_else(|| MemoryError::VariableNotDefined(name.to_string()))
    }

    /// Declare a new variable, optionally with an initial value
    ///
    /// # Errors
    ///
    /// Fails if the name is already taken, if the initial value does not fit the type, or if
    /// there is not enough memory left.
    #[tracing::instrument(skip(self), err)]
    pub fn declare(
        &mut self,
        name: &str,
        kind: TypeDescriptor,
        initial: Option<Integer>,
    ) -> Result<Slot> {
        if self.variables.contains_key(name) {
            return Err(MemoryError::VariableAlreadyDefined(name.to_string()));
        }

        let requested = kind.bytes();
        if requested > self.available() {
            return Err(MemoryError::OutOfMemory {
                requested,
                available: self.available(),
            });
        }

        let bytes = initial.map(|value| codec::encode(value, kind.size())).transpose()?;

        let slot = Slot {
            offset: self.next_free,
            kind,
            initialized: bytes.is_some(),
        };
        self.next_free += requested;

        if let Some(bytes) = bytes {
            self.store.store(slot.offset, &bytes);
        }

        debug!(offset = slot.offset, "Declared variable");
        self.variables.insert(name.to_string(), slot);
        Ok(slot)
    }

    /// Set the value of an existing variable
    ///
    /// # Errors
    ///
    /// Fails if the variable does not exist or if the value does not fit its type.
    #[tracing::instrument(skip(self), err)]
    pub fn assign(&mut self, name: &str, value: Integer) -> Result<()> {
        let slot = *self.slot(name)?;
        let bytes = codec::encode(value, slot.kind.size())?;
        self.store.store(slot.offset, &bytes);

        if let Some(slot) = self.variables.get_mut(name) {
            slot.initialized = true;
        }

        Ok(())
    }

    /// Take a snapshot of a variable
    ///
    /// The snapshot is detached: changing it does not affect memory until it is written back with
    /// [`Memory::store`].
    ///
    /// # Errors
    ///
    /// Fails if the variable does not exist.
    pub fn read(&self, name: &str) -> Result<Variable> {
        let slot = *self.slot(name)?;
        let value = slot
            .initialized
            .then(|| codec::decode(&self.store.load(slot.range()), slot.kind.signed()));

        Ok(Variable {
            name: name.to_string(),
            offset: slot.offset,
            kind: slot.kind,
            value,
        })
    }

    /// Get the value of an initialized variable
    ///
    /// # Errors
    ///
    /// Fails if the variable does not exist or was never given a value.
    pub fn value(&self, name: &str) -> Result<Integer> {
        self.read(name)?.value()
    }

    /// Raw bytes of a variable
    ///
    /// # Errors
    ///
    /// Fails if the variable does not exist.
    pub fn bytes(&self, name: &str) -> Result<Vec<u8>> {
        let slot = self.slot(name)?;
        Ok(self.store.load(slot.range()))
    }

    /// Write a variable snapshot back to memory
    ///
    /// # Errors
    ///
    /// Fails if the variable no longer exists, if the snapshot has no value or if the value does not
    /// fit the slot.
    pub fn store(&mut self, variable: &Variable) -> Result<()> {
        let value = variable.value()?;
        self.assign(variable.name(), value)
    }

    /// Delete a variable, zeroing its bytes
    ///
    /// # Errors
    ///
    /// Fails if the variable does not exist.
    #[tracing::instrument(skip(self), err)]
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let slot = self
            .variables
            .remove(name)
            .ok_or_else(|| MemoryError::VariableNotDefined(name.to_string()))?;
        self.store.zero(slot.range());
        debug!(offset = slot.offset, "Deleted variable");
        Ok(())
    }

    /// Iterate over the variable table, sorted by name
    pub fn variables(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.variables.iter().map(|(name, slot)| (name.as_str(), slot))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(crate::constants::MEMORY_SIZE)
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("capacity", &self.capacity())
            .field("next_free", &self.next_free)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

/// One line per variable, in allocation order
impl std::fmt::Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut variables: Vec<_> = self
            .variables
            .keys()
            .filter_map(|name| self.read(name).ok())
            .collect();
        variables.sort_by_key(Variable::offset);
        for variable in variables {
            writeln!(f, "{:#06x}  {variable}", variable.offset())?;
        }
        Ok(())
    }
}

/// Snapshot of a variable, as read from memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    offset: usize,
    kind: TypeDescriptor,
    value: Option<Integer>,
}

impl Variable {
    /// Build a variable that is not backed by memory
    #[must_use]
    pub fn new(name: &str, offset: usize, kind: TypeDescriptor, value: Option<Integer>) -> Self {
        Self {
            name: name.to_string(),
            offset,
            kind,
            value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn signed(&self) -> bool {
        self.kind.signed()
    }

    #[must_use]
    pub fn initialized(&self) -> bool {
        self.value.is_some()
    }

    /// The value of the variable
    ///
    /// # Errors
    ///
    /// Fails with [`MemoryError::VariableNotInitialized`] if the variable has no value yet.
    pub fn value(&self) -> Result<Integer> {
        self.value
            .ok_or_else(|| MemoryError::VariableNotInitialized(self.name.clone()))
    }
}

impl Holder for Variable {
    fn kind(&self) -> TypeDescriptor {
        self.kind
    }

    fn load(&self) -> std::result::Result<Integer, ArithmeticError> {
        Ok(self.value()?)
    }

    fn store(&mut self, value: Integer) -> std::result::Result<(), ArithmeticError> {
        arithmetic::check_storable(self.kind, value)?;
        self.value = Some(value);
        Ok(())
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value {
            Some(value) => write!(f, "{} {} = {}", self.kind, self.name, value),
            None => write!(f, "{} {} = ?", self.kind, self.name),
        }
    }
}
