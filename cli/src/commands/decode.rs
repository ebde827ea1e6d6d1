use anyhow::{bail, Context};
use clap::Parser;
use masm_emulator::codec;
use masm_emulator::TypeDescriptor;
use tracing::debug;

#[derive(Parser, Debug)]
pub struct DecodeOpt {
    /// Type of the slot, e.g. BYTE or SDWORD
    kind: TypeDescriptor,

    /// Big-endian bytes, in hexadecimal
    #[arg(required = true)]
    bytes: Vec<String>,
}

impl DecodeOpt {
    pub fn exec(&self) -> anyhow::Result<()> {
        let bytes = self
            .bytes
            .iter()
            .map(|b| {
                let digits = b.trim_start_matches("0x").trim_start_matches("0X");
                u8::from_str_radix(digits, 16).with_context(|| format!("invalid byte {b:?}"))
            })
            .collect::<anyhow::Result<Vec<u8>>>()?;

        if bytes.len() != self.kind.bytes() {
            bail!(
                "{} is {} bytes wide, got {} bytes",
                self.kind,
                self.kind.bytes(),
                bytes.len()
            );
        }

        debug!(kind = %self.kind, ?bytes, "Decoding value");
        println!("{}", codec::decode(&bytes, self.kind.signed()));
        Ok(())
    }
}
