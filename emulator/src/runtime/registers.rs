use std::collections::HashMap;
use std::ops::Range;

use thiserror::Error;
use tracing::{debug, trace};

use super::arithmetic::{ArithmeticError, Holder};
use crate::codec::{self, CodecError};
use crate::constants::{self as C, Integer};
use crate::store::BackingStore;
use crate::types::{ByteSize, TypeDescriptor};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid register width of {0} bits, expected one of 8, 16, 32 or 64")]
    InvalidWidth(usize),

    #[error("register {name} is {bits} bits wide and cannot be split")]
    CannotSplit { name: String, bits: usize },

    #[error("unknown register {0}")]
    UnknownRegister(String),

    #[error("register {0} is already defined")]
    AlreadyDefined(String),
}

/// Bytes a register reads and writes
#[derive(Debug)]
enum Storage<'s> {
    /// A root register owns its store
    Owned(BackingStore),

    /// A sub-register views bytes owned by another register
    Shared(&'s BackingStore),
}

impl Storage<'_> {
    fn get(&self) -> &BackingStore {
        match self {
            Self::Owned(store) => store,
            Self::Shared(store) => *store,
        }
    }
}

/// A named, fixed-width view over a range of bytes.
///
/// The value of a register is always read as an unsigned big-endian integer over its bytes.
///
/// Registers can be [split](Register::split) into two halves that share the bytes of their
/// parent: writing through one of them is immediately visible through the parent, and the other
/// way around. The halves borrow the parent's store, so they cannot outlive it.
#[derive(Debug)]
pub struct Register<'s> {
    name: String,
    usage: String,
    size: ByteSize,
    range: Range<usize>,
    storage: Storage<'s>,
}

impl Register<'static> {
    /// Create a standalone register owning zeroed bytes
    ///
    /// # Errors
    ///
    /// Fails if the width is not one of 8, 16, 32 or 64 bits.
    pub fn new(
        name: impl Into<String>,
        bits: usize,
        usage: impl Into<String>,
    ) -> Result<Self, RegisterError> {
        let size = ByteSize::from_bits(bits).map_err(|_| RegisterError::InvalidWidth(bits))?;
        Ok(Self::owned(name, size, usage))
    }

    fn owned(name: impl Into<String>, size: ByteSize, usage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: usage.into(),
            size,
            range: 0..size.bytes(),
            storage: Storage::Owned(BackingStore::new(size.bytes())),
        }
    }
}

impl<'s> Register<'s> {
    fn alias(
        store: &'s BackingStore,
        name: &str,
        usage: &str,
        size: ByteSize,
        range: Range<usize>,
    ) -> Self {
        debug_assert_eq!(range.len(), size.bytes());
        Register {
            name: name.to_string(),
            usage: usage.to_string(),
            size,
            range,
            storage: Storage::Shared(store),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the register is conventionally used for
    #[must_use]
    pub fn usage(&self) -> &str {
        &self.usage
    }

    #[must_use]
    pub fn size(&self) -> ByteSize {
        self.size
    }

    #[must_use]
    pub fn bits(&self) -> usize {
        self.size.bits()
    }

    /// Range of bytes covered in the underlying store
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Raw big-endian bytes of the register
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.storage.get().load(self.range())
    }

    #[must_use]
    pub fn read(&self) -> u64 {
        // At most 8 bytes, read unsigned
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = codec::decode(&self.bytes(), false) as u64;
        value
    }

    /// Write a value to the register bytes
    ///
    /// Every register sharing those bytes observes the change.
    ///
    /// # Errors
    ///
    /// Fails if the value does not fit the register width.
    pub fn write(&self, value: Integer) -> Result<(), CodecError> {
        let bytes = codec::encode(value, self.size)?;
        trace!(register = %self.name, value, ?bytes, "Writing register");
        self.storage.get().store(self.range.start, &bytes);
        Ok(())
    }

    /// Split the register into two halves sharing its bytes.
    ///
    /// The first register returned covers the most significant half.
    ///
    /// # Errors
    ///
    /// Fails with [`RegisterError::CannotSplit`] on a 8 bits register.
    pub fn split(
        &self,
        high: &str,
        low: &str,
    ) -> Result<(Register<'_>, Register<'_>), RegisterError> {
        let half = self.size.half().ok_or_else(|| RegisterError::CannotSplit {
            name: self.name.clone(),
            bits: self.bits(),
        })?;

        let mid = self.range.start + half.bytes();
        let store = self.storage.get();
        Ok((
            Register::alias(store, high, &self.usage, half, self.range.start..mid),
            Register::alias(store, low, &self.usage, half, mid..self.range.end),
        ))
    }

    /// A non-owning view of this register, under the same name
    #[must_use]
    pub fn view(&self) -> Register<'_> {
        Register::alias(
            self.storage.get(),
            &self.name,
            &self.usage,
            self.size,
            self.range(),
        )
    }
}

impl Holder for Register<'_> {
    fn kind(&self) -> TypeDescriptor {
        TypeDescriptor::unsigned(self.size)
    }

    fn load(&self) -> Result<Integer, ArithmeticError> {
        Ok(Integer::from(self.read()))
    }

    fn store(&mut self, value: Integer) -> Result<(), ArithmeticError> {
        self.write(value)?;
        Ok(())
    }
}

impl std::fmt::Display for Register<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {:#0width$x}",
            self.name,
            self.read(),
            width = self.size.bytes() * 2 + 2
        )
    }
}

/// Location of a register in the file
#[derive(Debug, Clone)]
struct Entry {
    root: usize,
    size: ByteSize,
    range: Range<usize>,
    usage: String,
}

/// A set of root registers and the sub-registers derived from them.
///
/// The file owns the bytes of every root register, and hands out non-owning [`Register`] views by
/// name.
#[derive(Debug, Default)]
pub struct RegisterFile {
    roots: Vec<Register<'static>>,
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The classic 32 bits x86 register file.
    ///
    /// Each general purpose register has a 16 bits low half (`eax` → `ax`), and the first four also
    /// have their 16 bits half split into two 8 bits registers (`ax` → `ah`, `al`).
    #[must_use]
    pub fn x86() -> Self {
        const GENERAL: [(&str, &str, Option<(&str, &str)>, &str); 8] = [
            ("eax", "ax", Some(("ah", "al")), "accumulator"),
            ("ebx", "bx", Some(("bh", "bl")), "base"),
            ("ecx", "cx", Some(("ch", "cl")), "counter"),
            ("edx", "dx", Some(("dh", "dl")), "data"),
            ("ebp", "bp", None, "stack base pointer"),
            ("esi", "si", None, "source index"),
            ("edi", "di", None, "destination index"),
            ("esp", "sp", None, "stack pointer"),
        ];

        // The named parts sit in the two least significant bytes
        let end = C::REGISTER_SIZE.bytes();
        let mut file = Self::new();
        for (extended, half, bytes, usage) in GENERAL {
            let root = file.push_root(Register::owned(extended, C::REGISTER_SIZE, usage));
            let alias = |size, range| Entry {
                root,
                size,
                range,
                usage: usage.to_string(),
            };

            file.insert(half, alias(ByteSize::Word, end - 2..end));
            if let Some((high, low)) = bytes {
                file.insert(high, alias(ByteSize::Byte, end - 2..end - 1));
                file.insert(low, alias(ByteSize::Byte, end - 1..end));
            }
        }

        file
    }

    /// Add a standalone register
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the width is invalid.
    pub fn add_root(&mut self, name: &str, bits: usize, usage: &str) -> Result<(), RegisterError> {
        if self.contains(name) {
            return Err(RegisterError::AlreadyDefined(name.to_string()));
        }

        let register = Register::new(name, bits, usage)?;
        debug!(name, bits, "Adding register");
        self.push_root(register);
        Ok(())
    }

    /// Register a root and return its index
    fn push_root(&mut self, register: Register<'static>) -> usize {
        let root = self.roots.len();
        let entry = Entry {
            root,
            size: register.size(),
            range: register.range(),
            usage: register.usage().to_string(),
        };
        self.insert(register.name(), entry);
        self.roots.push(register);
        root
    }

    /// Split a register into two named halves.
    ///
    /// A half named `_` is not registered.
    ///
    /// # Errors
    ///
    /// Fails if the parent is unknown, cannot be split, or if a name is taken. Both halves cannot
    /// share a name.
    pub fn add_halves(&mut self, parent: &str, high: &str, low: &str) -> Result<(), RegisterError> {
        for name in [high, low] {
            if name != C::UNNAMED_HALF && self.contains(name) {
                return Err(RegisterError::AlreadyDefined(name.to_string()));
            }
        }

        if low != C::UNNAMED_HALF && high.eq_ignore_ascii_case(low) {
            return Err(RegisterError::AlreadyDefined(low.to_string()));
        }

        let root = self.entry(parent)?.root;
        let halves = {
            let view = self.get(parent)?;
            let (h, l) = view.split(high, low)?;
            [(h.name, h.size, h.range), (l.name, l.size, l.range)]
        };

        let usage = self.entry(parent)?.usage.clone();
        for (name, size, range) in halves {
            if name == C::UNNAMED_HALF {
                continue;
            }

            debug!(%name, parent, ?range, "Adding sub-register");
            let entry = Entry {
                root,
                size,
                range,
                usage: usage.clone(),
            };
            self.insert(&name, entry);
        }

        Ok(())
    }

    fn insert(&mut self, name: &str, entry: Entry) {
        let name = name.to_lowercase();
        self.entries.insert(name.clone(), entry);
        self.order.push(name);
    }

    /// Checks if a register exists (case-insensitive)
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    fn entry(&self, name: &str) -> Result<&Entry, RegisterError> {
        self.entries
            .get(&name.to_lowercase())
            .ok_or_else(|| RegisterError::UnknownRegister(name.to_string()))
    }

    /// Get a view of a register by name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Fails with [`RegisterError::UnknownRegister`] if there is no such register.
    pub fn get(&self, name: &str) -> Result<Register<'_>, RegisterError> {
        let name = name.to_lowercase();
        let entry = self.entry(&name)?;
        let root = self.roots[entry.root].storage.get();
        Ok(Register::alias(
            root,
            &name,
            &entry.usage,
            entry.size,
            entry.range.clone(),
        ))
    }

    /// Register names, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Views of all the registers, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Register<'_>> {
        self.order.iter().filter_map(|name| self.get(name).ok())
    }

    /// Views of the root registers only
    pub fn roots(&self) -> impl Iterator<Item = Register<'_>> {
        self.roots.iter().map(Register::view)
    }
}

impl std::fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for register in self.roots() {
            if !first {
                write!(f, " | ")?;
            }
            first = false;
            write!(f, "{register}")?;
        }
        Ok(())
    }
}
