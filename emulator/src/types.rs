//! Variable type descriptors.
//!
//! A variable type has three equivalent representations, which are always mutually derivable:
//!   - the assembly word (`BYTE`, `WORD`, `DWORD`, `QWORD`, each optionally prefixed by `S` for
//!     signed types),
//!   - the layout, a (byte size, signedness) pair,
//!   - the native Rust integer kind holding such a value (`u8`, `i16`, …).
//!
//! [`TypeDescriptor`] is the canonical form, and [`TypeQuery`] resolves it from exactly one of
//! those representations.

use std::str::FromStr;

use parse_display::Display;
use thiserror::Error;

use crate::constants::Integer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid size {0}, expected one of 1, 2, 4 or 8 bytes")]
    InvalidSize(usize),

    #[error("invalid width of {0} bits, expected one of 8, 16, 32 or 64")]
    InvalidWidth(usize),

    #[error("unknown type word {0:?}")]
    UnknownWord(String),

    #[error("unknown native kind {0:?}")]
    UnknownNative(String),

    #[error("no match found for conversion: expected exactly one representation, got {given}")]
    AmbiguousConversion { given: usize },
}

/// Size of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum ByteSize {
    #[display("BYTE")]
    Byte,

    #[display("WORD")]
    Word,

    #[display("DWORD")]
    DWord,

    #[display("QWORD")]
    QWord,
}

impl ByteSize {
    pub const ALL: [ByteSize; 4] = [Self::Byte, Self::Word, Self::DWord, Self::QWord];

    /// Number of bytes
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::DWord => 4,
            Self::QWord => 8,
        }
    }

    /// Number of bits
    #[must_use]
    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }

    /// Size of each half of a value of this size, if it can be halved
    #[must_use]
    pub const fn half(self) -> Option<Self> {
        match self {
            Self::Byte => None,
            Self::Word => Some(Self::Byte),
            Self::DWord => Some(Self::Word),
            Self::QWord => Some(Self::DWord),
        }
    }

    /// Largest unsigned value that fits in this size
    #[must_use]
    pub const fn max_unsigned(self) -> Integer {
        (1 << self.bits()) - 1
    }

    /// Get the size from a number of bytes
    ///
    /// # Errors
    ///
    /// Fails with [`TypeError::InvalidSize`] if the size is not one of 1, 2, 4 or 8.
    pub const fn from_bytes(bytes: usize) -> Result<Self, TypeError> {
        match bytes {
            1 => Ok(Self::Byte),
            2 => Ok(Self::Word),
            4 => Ok(Self::DWord),
            8 => Ok(Self::QWord),
            other => Err(TypeError::InvalidSize(other)),
        }
    }

    /// Get the size from a number of bits
    ///
    /// # Errors
    ///
    /// Fails with [`TypeError::InvalidWidth`] if the width is not one of 8, 16, 32 or 64.
    pub const fn from_bits(bits: usize) -> Result<Self, TypeError> {
        match bits {
            8 => Ok(Self::Byte),
            16 => Ok(Self::Word),
            32 => Ok(Self::DWord),
            64 => Ok(Self::QWord),
            other => Err(TypeError::InvalidWidth(other)),
        }
    }
}

impl TryFrom<usize> for ByteSize {
    type Error = TypeError;

    fn try_from(bytes: usize) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl FromStr for ByteSize {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BYTE" => Ok(Self::Byte),
            "WORD" => Ok(Self::Word),
            "DWORD" => Ok(Self::DWord),
            "QWORD" => Ok(Self::QWord),
            _ => Err(TypeError::UnknownWord(s.to_string())),
        }
    }
}

/// Native integer kind holding a variable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(style = "lowercase")]
pub enum NativeKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
}

impl FromStr for NativeKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "u8" | "uint8" => Ok(Self::U8),
            "i8" | "int8" => Ok(Self::I8),
            "u16" | "uint16" => Ok(Self::U16),
            "i16" | "int16" => Ok(Self::I16),
            "u32" | "uint32" => Ok(Self::U32),
            "i32" | "int32" => Ok(Self::I32),
            "u64" | "uint64" => Ok(Self::U64),
            "i64" | "int64" => Ok(Self::I64),
            _ => Err(TypeError::UnknownNative(s.to_string())),
        }
    }
}

/// Rust integer types that can back a variable
pub trait Native {
    const KIND: NativeKind;
}

macro_rules! native {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Native for $ty {
                const KIND: NativeKind = NativeKind::$kind;
            }
        )*
    };
}

native! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
}

/// Canonical description of a variable type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    size: ByteSize,
    signed: bool,
}

impl TypeDescriptor {
    #[must_use]
    pub const fn new(size: ByteSize, signed: bool) -> Self {
        Self { size, signed }
    }

    #[must_use]
    pub const fn unsigned(size: ByteSize) -> Self {
        Self::new(size, false)
    }

    /// Descriptor of a native Rust integer type
    #[must_use]
    pub fn of<T: Native>() -> Self {
        T::KIND.into()
    }

    /// Build a descriptor from a (byte size, signedness) pair
    ///
    /// # Errors
    ///
    /// Fails with [`TypeError::InvalidSize`] if the size is not one of 1, 2, 4 or 8.
    pub fn from_layout(bytes: usize, signed: bool) -> Result<Self, TypeError> {
        let size = ByteSize::from_bytes(bytes)?;
        Ok(Self::new(size, signed))
    }

    /// Iterate over every variable type, unsigned first
    pub fn all() -> impl Iterator<Item = Self> {
        [false, true]
            .into_iter()
            .flat_map(|signed| ByteSize::ALL.into_iter().map(move |size| Self::new(size, signed)))
    }

    #[must_use]
    pub const fn size(&self) -> ByteSize {
        self.size
    }

    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.size.bytes()
    }

    #[must_use]
    pub const fn signed(&self) -> bool {
        self.signed
    }

    /// The (byte size, signedness) pair
    #[must_use]
    pub const fn layout(&self) -> (usize, bool) {
        (self.size.bytes(), self.signed)
    }

    /// The assembly word of this type, e.g. `SDWORD`
    #[must_use]
    pub fn word(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub const fn native(&self) -> NativeKind {
        use NativeKind as N;
        match (self.size, self.signed) {
            (ByteSize::Byte, false) => N::U8,
            (ByteSize::Byte, true) => N::I8,
            (ByteSize::Word, false) => N::U16,
            (ByteSize::Word, true) => N::I16,
            (ByteSize::DWord, false) => N::U32,
            (ByteSize::DWord, true) => N::I32,
            (ByteSize::QWord, false) => N::U64,
            (ByteSize::QWord, true) => N::I64,
        }
    }

    /// Smallest value of the native integer kind
    #[must_use]
    pub const fn min(&self) -> Integer {
        if self.signed {
            -(1 << (self.size.bits() - 1))
        } else {
            0
        }
    }

    /// Largest value of the native integer kind
    #[must_use]
    pub const fn max(&self) -> Integer {
        if self.signed {
            (1 << (self.size.bits() - 1)) - 1
        } else {
            self.size.max_unsigned()
        }
    }

    /// Coerce an integer to this type, with the fixed-width wrapping of the native kind
    #[must_use]
    pub const fn wrap(&self, value: Integer) -> Integer {
        let modulus: Integer = 1 << self.size.bits();
        let value = value.rem_euclid(modulus);
        if self.signed && value > self.max() {
            value - modulus
        } else {
            value
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.signed {
            write!(f, "S{}", self.size)
        } else {
            write!(f, "{}", self.size)
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_uppercase();
        let (signed, size) = match word.strip_prefix('S') {
            Some(rest) => (true, rest),
            None => (false, word.as_str()),
        };

        let size: ByteSize = size
            .parse()
            .map_err(|_| TypeError::UnknownWord(s.to_string()))?;
        Ok(Self::new(size, signed))
    }
}

impl TryFrom<(usize, bool)> for TypeDescriptor {
    type Error = TypeError;

    fn try_from((bytes, signed): (usize, bool)) -> Result<Self, Self::Error> {
        Self::from_layout(bytes, signed)
    }
}

impl From<NativeKind> for TypeDescriptor {
    fn from(kind: NativeKind) -> Self {
        use NativeKind as N;
        let (size, signed) = match kind {
            N::U8 => (ByteSize::Byte, false),
            N::I8 => (ByteSize::Byte, true),
            N::U16 => (ByteSize::Word, false),
            N::I16 => (ByteSize::Word, true),
            N::U32 => (ByteSize::DWord, false),
            N::I32 => (ByteSize::DWord, true),
            N::U64 => (ByteSize::QWord, false),
            N::I64 => (ByteSize::QWord, true),
        };
        Self::new(size, signed)
    }
}

impl From<TypeDescriptor> for NativeKind {
    fn from(descriptor: TypeDescriptor) -> Self {
        descriptor.native()
    }
}

/// Request to resolve a [`TypeDescriptor`] from exactly one of its representations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TypeQuery<'a> {
    pub word: Option<&'a str>,
    pub layout: Option<(usize, bool)>,
    pub native: Option<NativeKind>,
}

impl<'a> TypeQuery<'a> {
    #[must_use]
    pub fn word(word: &'a str) -> Self {
        Self {
            word: Some(word),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn layout(bytes: usize, signed: bool) -> Self {
        Self {
            layout: Some((bytes, signed)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn native(kind: NativeKind) -> Self {
        Self {
            native: Some(kind),
            ..Self::default()
        }
    }

    /// Resolve the full descriptor
    ///
    /// # Errors
    ///
    /// Fails with [`TypeError::AmbiguousConversion`] unless exactly one representation is given,
    /// and with the underlying conversion error if that representation is invalid.
    pub fn resolve(self) -> Result<TypeDescriptor, TypeError> {
        match (self.word, self.layout, self.native) {
            (Some(word), None, None) => word.parse(),
            (None, Some(layout), None) => layout.try_into(),
            (None, None, Some(kind)) => Ok(kind.into()),
            (word, layout, native) => Err(TypeError::AmbiguousConversion {
                given: usize::from(word.is_some())
                    + usize::from(layout.is_some())
                    + usize::from(native.is_some()),
            }),
        }
    }
}
