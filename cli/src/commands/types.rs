use clap::Parser;
use masm_emulator::codec;
use masm_emulator::TypeDescriptor;

#[derive(Parser, Debug)]
pub struct TypesOpt {}

/// One line of the table, with the range of values the slot reads back unchanged
fn row(kind: TypeDescriptor) -> String {
    let range = codec::exact_range(kind.size(), kind.signed());
    format!(
        "{:<8} {:>5}  {:<8} {:<6} {:>21} {:>21}",
        kind.word(),
        kind.bytes(),
        kind.signed(),
        kind.native().to_string(),
        range.start(),
        range.end()
    )
}

impl TypesOpt {
    pub fn exec(&self) -> anyhow::Result<()> {
        println!(
            "{:<8} {:>5}  {:<8} {:<6} {:>21} {:>21}",
            "TYPE", "BYTES", "SIGNED", "NATIVE", "MIN", "MAX"
        );
        for kind in TypeDescriptor::all() {
            println!("{}", row(kind));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(word: &str) -> Vec<String> {
        let kind: TypeDescriptor = word.parse().unwrap();
        row(kind).split_whitespace().map(ToString::to_string).collect()
    }

    #[test]
    fn row_test() {
        assert_eq!(columns("BYTE"), ["BYTE", "1", "false", "u8", "0", "255"]);
        assert_eq!(columns("SBYTE"), ["SBYTE", "1", "true", "i8", "-127", "127"]);
        assert_eq!(
            columns("SQWORD"),
            [
                "SQWORD",
                "8",
                "true",
                "i64",
                "-9223372036854775807",
                "9223372036854775807"
            ]
        );
    }
}
