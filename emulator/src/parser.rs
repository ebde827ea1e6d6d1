//! Parse operands: number literals, registers and variable names.
//!
//! Number literals are in base 10, base 16 (prefixed by `0x`), base 8 (prefixed by `0o`) or
//! base 2 (prefixed by `0b`), with an optional leading minus sign. Registers are written with a
//! `%` prefix (`%eax`), anything else that looks like an identifier is a variable.

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{pair, preceded},
    Finish, IResult,
};

use crate::constants::Integer;
use crate::runtime::{Source, Target};

fn from_radix(radix: u32) -> impl Fn(&str) -> Result<Integer, std::num::ParseIntError> {
    move |input| Integer::from_str_radix(input, radix)
}

/// Check if character is a digit in the given base
fn is_digit_in(radix: u32) -> impl Fn(char) -> bool {
    move |c| c.is_digit(radix)
}

/// Extract a prefixed literal, without its prefix
fn take_prefixed<'a>(
    prefix: &'static str,
    radix: u32,
) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(tag_no_case(prefix), take_while1(is_digit_in(radix)))
}

/// Parse an unsigned number literal
fn parse_magnitude(input: &str) -> IResult<&str, Integer> {
    alt((
        map_res(take_prefixed("0x", 16), from_radix(16)),
        map_res(take_prefixed("0o", 8), from_radix(8)),
        map_res(take_prefixed("0b", 2), from_radix(2)),
        map_res(take_while1(is_digit_in(10)), from_radix(10)),
    ))(input)
}

/// Parse a number literal, optionally negative
pub fn parse_literal(input: &str) -> IResult<&str, Integer> {
    let (input, minus) = opt(char('-'))(input)?;
    let (input, magnitude) = parse_magnitude(input)?;
    Ok((input, if minus.is_some() { -magnitude } else { magnitude }))
}

/// Parse an identifier: a letter or underscore, then letters, digits or underscores
pub fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse a register name, prefixed by `%`
pub fn parse_register(input: &str) -> IResult<&str, &str> {
    preceded(char('%'), parse_identifier)(input)
}

fn target(input: &str) -> IResult<&str, Target> {
    alt((
        map(parse_register, |name| Target::Register(name.to_string())),
        map(parse_identifier, |name| Target::Variable(name.to_string())),
    ))(input)
}

fn source(input: &str) -> IResult<&str, Source> {
    alt((
        map(parse_literal, Source::Literal),
        map(target, Source::from),
    ))(input)
}

/// Parse a whole string as a number literal
///
/// # Errors
///
/// Fails if the input is not exactly one number literal.
pub fn parse_number(input: &str) -> Result<Integer, nom::error::Error<&str>> {
    all_consuming(parse_literal)(input).finish().map(|(_, n)| n)
}

/// Parse a whole string as a source operand
///
/// # Errors
///
/// Fails if the input is not exactly one literal, register or variable.
pub fn parse_source(input: &str) -> Result<Source, nom::error::Error<&str>> {
    all_consuming(source)(input).finish().map(|(_, s)| s)
}

/// Parse a whole string as a target operand
///
/// # Errors
///
/// Fails if the input is not exactly one register or variable.
pub fn parse_target(input: &str) -> Result<Target, nom::error::Error<&str>> {
    all_consuming(target)(input).finish().map(|(_, t)| t)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn is_digit_in_test() {
        for c in '0'..='9' {
            assert!(is_digit_in(10)(c));
        }
        for c in ('0'..='9').chain('a'..='f').chain('A'..='F') {
            assert!(is_digit_in(16)(c));
        }
        for c in ('8'..='9').chain('a'..='z') {
            assert!(!is_digit_in(8)(c));
        }
        assert!(!is_digit_in(2)('2'));
    }

    #[test]
    fn take_prefixed_test() {
        assert_eq!(take_prefixed("0x", 16)("0x4F"), Ok(("", "4F")));
        assert_eq!(take_prefixed("0x", 16)("0X4f"), Ok(("", "4f")));
        assert_eq!(take_prefixed("0o", 8)("0o778"), Ok(("8", "77")));
        assert!(take_prefixed("0x", 16)("0xinvalid").is_err()); // No digits
        assert!(take_prefixed("0b", 2)("10").is_err()); // No prefix
    }

    #[test]
    fn parse_literal_test() {
        // Decimal
        assert_eq!(parse_literal("100"), Ok(("", 100)));
        assert_eq!(parse_literal("-42"), Ok(("", -42)));
        assert_eq!(
            parse_literal("18446744073709551616"),
            Ok(("", 1 << 64))
        ); // Wider than any register

        // Hexadecimal
        assert_eq!(parse_literal("0x4f"), Ok(("", 0x4f)));
        assert_eq!(parse_literal("-0xFF"), Ok(("", -0xff)));
        assert_eq!(parse_literal("0xg"), Ok(("xg", 0))); // Falls back to the leading zero

        // Octal
        assert_eq!(parse_literal("0o77"), Ok(("", 0o77)));

        // Binary
        assert_eq!(parse_literal("0b10"), Ok(("", 2)));
        assert_eq!(parse_literal("0B101"), Ok(("", 5)));

        assert!(parse_literal("-").is_err());
        assert!(parse_literal("abc").is_err());
    }

    #[test]
    fn parse_number_test() {
        assert_eq!(parse_number("-0b1010"), Ok(-10));
        assert!(parse_number("10 ").is_err());
        assert!(parse_number("").is_err());
    }

    #[test]
    fn parse_identifier_test() {
        assert_eq!(parse_identifier("foo bar"), Ok((" bar", "foo")));
        assert_eq!(parse_identifier("_x1"), Ok(("", "_x1")));
        assert!(parse_identifier("1x").is_err());
    }

    #[test]
    fn parse_register_test() {
        assert_eq!(parse_register("%eax"), Ok(("", "eax")));
        assert_eq!(parse_register("%AL,"), Ok((",", "AL")));
        assert!(parse_register("eax").is_err());
        assert!(parse_register("%").is_err());
    }

    #[test]
    fn operand_test() {
        assert_eq!(parse_source("0b11"), Ok(Source::Literal(3)));
        assert_eq!(
            parse_source("%bx"),
            Ok(Source::Register("bx".to_string()))
        );
        assert_eq!(
            parse_source("counter"),
            Ok(Source::Variable("counter".to_string()))
        );
        assert!(parse_source("12 13").is_err());

        assert_eq!(
            parse_target("total"),
            Ok(Target::Variable("total".to_string()))
        );
        assert!(parse_target("-1").is_err());
    }
}
