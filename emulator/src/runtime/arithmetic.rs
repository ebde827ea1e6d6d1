//! Size-checked arithmetic between values held by registers, variables and literals.
//!
//! Anything exposing a typed integer value implements [`Holder`] and gets addition,
//! subtraction, multiplication and floor division for free, against either a literal or another
//! holder. The left-hand side decides the width of the computation: literals and right-hand
//! holders are coerced to it, and results wrap like the native integer of that width.
//!
//! A holder can only be combined with a holder of the same size or narrower; the other way around
//! fails with [`ArithmeticError::IncompatibleVariableSizes`].

use parse_display::Display;
use thiserror::Error;

use super::memory::MemoryError;
use crate::codec::{self, CodecError};
use crate::constants::Integer;
use crate::types::TypeDescriptor;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("incompatible variable sizes: a {left} bytes value cannot operate on a {right} bytes one")]
    IncompatibleVariableSizes { left: usize, right: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

type Result<T> = std::result::Result<T, ArithmeticError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    #[display("div")]
    FloorDiv,
}

impl BinaryOp {
    /// Compute the operation, before any fixed-width wrapping
    fn compute(self, lhs: Integer, rhs: Integer) -> Result<Integer> {
        match self {
            Self::Add => Ok(lhs.wrapping_add(rhs)),
            Self::Sub => Ok(lhs.wrapping_sub(rhs)),
            // Wrapping modulo 2^128 keeps the low 64 bits exact
            Self::Mul => Ok(lhs.wrapping_mul(rhs)),
            Self::FloorDiv => {
                if rhs == 0 {
                    return Err(ArithmeticError::DivisionByZero);
                }

                let quotient = lhs / rhs;
                if lhs % rhs != 0 && (lhs < 0) != (rhs < 0) {
                    Ok(quotient - 1)
                } else {
                    Ok(quotient)
                }
            }
        }
    }
}

/// Right-hand side of an arithmetic operation
#[derive(Clone, Copy)]
pub enum Operand<'a> {
    Literal(Integer),
    Holder(&'a dyn Holder),
}

impl std::fmt::Debug for Operand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Holder(holder) => f.debug_tuple("Holder").field(&holder.kind()).finish(),
        }
    }
}

impl From<Integer> for Operand<'_> {
    fn from(value: Integer) -> Self {
        Self::Literal(value)
    }
}

impl<'a, H: Holder> From<&'a H> for Operand<'a> {
    fn from(holder: &'a H) -> Self {
        Self::Holder(holder)
    }
}

/// An entity holding a typed integer value
pub trait Holder {
    /// Type of the held value
    fn kind(&self) -> TypeDescriptor;

    /// Read the held value
    ///
    /// # Errors
    ///
    /// Fails if there is no value to read yet.
    fn load(&self) -> Result<Integer>;

    /// Replace the held value
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be represented by the holder.
    fn store(&mut self, value: Integer) -> Result<()>;

    fn byte_size(&self) -> usize {
        self.kind().bytes()
    }

    /// Compute `self <op> operand` into a detached [`Number`], leaving both sides untouched
    ///
    /// # Errors
    ///
    /// Fails with [`ArithmeticError::IncompatibleVariableSizes`] if the operand is a wider
    /// holder, with [`ArithmeticError::DivisionByZero`] on a null divisor, or if either side
    /// cannot be read.
    fn compute(&self, op: BinaryOp, operand: Operand<'_>) -> Result<Number> {
        let kind = self.kind();
        let rhs = match operand {
            Operand::Literal(value) => kind.wrap(value),
            Operand::Holder(other) => {
                if self.byte_size() < other.byte_size() {
                    return Err(ArithmeticError::IncompatibleVariableSizes {
                        left: self.byte_size(),
                        right: other.byte_size(),
                    });
                }

                kind.wrap(other.load()?)
            }
        };

        let lhs = self.load()?;
        let value = kind.wrap(op.compute(lhs, rhs)?);
        Ok(Number { kind, value })
    }

    /// Compute `self <op>= operand`, storing the result back in the holder
    ///
    /// # Errors
    ///
    /// See [`Holder::compute`] and [`Holder::store`].
    fn apply(&mut self, op: BinaryOp, operand: Operand<'_>) -> Result<()> {
        let result = self.compute(op, operand)?;
        self.store(result.value)
    }

    /// # Errors
    ///
    /// See [`Holder::compute`].
    fn add(&self, operand: Operand<'_>) -> Result<Number> {
        self.compute(BinaryOp::Add, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::compute`].
    fn sub(&self, operand: Operand<'_>) -> Result<Number> {
        self.compute(BinaryOp::Sub, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::compute`].
    fn mul(&self, operand: Operand<'_>) -> Result<Number> {
        self.compute(BinaryOp::Mul, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::compute`].
    fn floor_div(&self, operand: Operand<'_>) -> Result<Number> {
        self.compute(BinaryOp::FloorDiv, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::apply`].
    fn add_assign(&mut self, operand: Operand<'_>) -> Result<()> {
        self.apply(BinaryOp::Add, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::apply`].
    fn sub_assign(&mut self, operand: Operand<'_>) -> Result<()> {
        self.apply(BinaryOp::Sub, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::apply`].
    fn mul_assign(&mut self, operand: Operand<'_>) -> Result<()> {
        self.apply(BinaryOp::Mul, operand)
    }

    /// # Errors
    ///
    /// See [`Holder::apply`].
    fn floor_div_assign(&mut self, operand: Operand<'_>) -> Result<()> {
        self.apply(BinaryOp::FloorDiv, operand)
    }
}

/// A detached, typed value
///
/// Results of the non in-place operations. It is a holder itself, so results can be chained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Number {
    kind: TypeDescriptor,
    value: Integer,
}

impl Number {
    /// Build a number, coercing the value to the given type
    #[must_use]
    pub fn new(kind: TypeDescriptor, value: Integer) -> Self {
        Self {
            kind,
            value: kind.wrap(value),
        }
    }

    #[must_use]
    pub const fn value(&self) -> Integer {
        self.value
    }
}

impl Holder for Number {
    fn kind(&self) -> TypeDescriptor {
        self.kind
    }

    fn load(&self) -> Result<Integer> {
        Ok(self.value)
    }

    fn store(&mut self, value: Integer) -> Result<()> {
        if value < self.kind.min() || value > self.kind.max() {
            return Err(CodecError::OutOfRange {
                value,
                size: self.kind.size(),
            }
            .into());
        }

        self.value = value;
        Ok(())
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Check a value against the codec range of a holder before storing it
pub(crate) fn check_storable(kind: TypeDescriptor, value: Integer) -> Result<()> {
    codec::check(value, kind.size())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lit(value: Integer) -> Operand<'static> {
        Operand::Literal(value)
    }

    fn dword(value: Integer) -> Number {
        Number::new(TypeDescriptor::of::<u32>(), value)
    }

    fn word(value: Integer) -> Number {
        Number::new(TypeDescriptor::of::<u16>(), value)
    }

    #[test]
    fn literal_test() {
        let a = dword(10);
        assert_eq!(a.add(lit(5)).unwrap().value(), 15);
        assert_eq!(a.sub(lit(3)).unwrap().value(), 7);
        assert_eq!(a.mul(lit(4)).unwrap().value(), 40);
        assert_eq!(a.floor_div(lit(3)).unwrap().value(), 3);

        // The left-hand side is left untouched
        assert_eq!(a.value(), 10);
    }

    #[test]
    fn holder_sizes_test() {
        let wide = dword(10);
        let narrow = word(5);

        let sum = wide.add((&narrow).into()).unwrap();
        assert_eq!(sum.value(), 15);
        assert_eq!(sum.byte_size(), 4);

        assert_eq!(
            narrow.add((&wide).into()),
            Err(ArithmeticError::IncompatibleVariableSizes { left: 2, right: 4 })
        );

        // Same size is fine
        assert_eq!(narrow.add((&word(1)).into()).unwrap().value(), 6);
    }

    #[test]
    fn in_place_test() {
        let mut a = dword(10);
        a.add_assign(lit(6)).unwrap();
        assert_eq!(a.value(), 16);

        a.sub_assign((&word(1)).into()).unwrap();
        assert_eq!(a.value(), 15);

        a.mul_assign(lit(2)).unwrap();
        assert_eq!(a.value(), 30);

        a.floor_div_assign(lit(7)).unwrap();
        assert_eq!(a.value(), 4);

        let mut b = word(1);
        assert!(b.add_assign((&a).into()).is_err());
        assert_eq!(b.value(), 1);
    }

    #[test]
    fn wrapping_test() {
        let byte = Number::new(TypeDescriptor::of::<u8>(), 250);
        assert_eq!(byte.add(lit(10)).unwrap().value(), 4);
        assert_eq!(byte.mul(lit(2)).unwrap().value(), 244);

        let zero = Number::new(TypeDescriptor::of::<u8>(), 0);
        assert_eq!(zero.sub(lit(1)).unwrap().value(), 255);

        // Literals are coerced to the width of the left-hand side first
        assert_eq!(zero.add(lit(257)).unwrap().value(), 1);

        let sbyte = Number::new(TypeDescriptor::of::<i8>(), 127);
        assert_eq!(sbyte.add(lit(1)).unwrap().value(), -128);

        let qword = Number::new(TypeDescriptor::of::<u64>(), Integer::from(u64::MAX));
        assert_eq!(qword.mul((&qword).into()).unwrap().value(), 1);
    }

    #[test]
    fn floor_division_test() {
        let signed = |v| Number::new(TypeDescriptor::of::<i32>(), v);
        assert_eq!(signed(7).floor_div(lit(2)).unwrap().value(), 3);
        assert_eq!(signed(-7).floor_div(lit(2)).unwrap().value(), -4);
        assert_eq!(signed(7).floor_div(lit(-2)).unwrap().value(), -4);
        assert_eq!(signed(-7).floor_div(lit(-2)).unwrap().value(), 3);
        assert_eq!(signed(-8).floor_div(lit(2)).unwrap().value(), -4);

        assert_eq!(
            signed(1).floor_div(lit(0)),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn number_store_test() {
        let mut byte = Number::new(TypeDescriptor::of::<u8>(), 0);
        byte.store(255).unwrap();
        assert_eq!(byte.value(), 255);
        assert!(byte.store(256).is_err());
        assert!(byte.store(-1).is_err());
    }
}
