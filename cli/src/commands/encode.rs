use clap::Parser;
use masm_emulator::codec;
use masm_emulator::constants::Integer;
use masm_emulator::TypeDescriptor;
use tracing::debug;

#[derive(Parser, Debug)]
pub struct EncodeOpt {
    /// Type of the slot, e.g. BYTE or SDWORD
    kind: TypeDescriptor,

    /// Value to encode
    #[arg(value_parser = super::integer, allow_hyphen_values = true)]
    value: Integer,
}

impl EncodeOpt {
    pub fn exec(&self) -> anyhow::Result<()> {
        debug!(kind = %self.kind, value = self.value, "Encoding value");
        let bytes = codec::encode(self.value, self.kind.size())?;
        println!("{}", super::hex(&bytes));
        Ok(())
    }
}
