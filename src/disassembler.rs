use std::{fmt, path::PathBuf};

use anyhow::{Context, Result};

use crate::{compiler::codegen::LOAD_BASE, instruction::Instruction};

pub mod listing;

/// A decoded piece of an image.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum Item {
    Instruction(Instruction),
    /// A word that is not a known instruction, usually data
    Word(u16),
    /// A trailing odd byte
    Byte(u8),
}

impl Item {
    pub fn size(&self) -> usize {
        match self {
            Item::Instruction(_) | Item::Word(_) => 2,
            Item::Byte(_) => 1,
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Item::Instruction(ins) => ins.to_bytes().to_vec(),
            Item::Word(word) => word.to_be_bytes().to_vec(),
            Item::Byte(byte) => vec![*byte],
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Instruction(ins) => write!(f, "{}", ins),
            Item::Word(word) => write!(f, ".word ${:04X}", word),
            Item::Byte(byte) => write!(f, ".byte ${:02X}", byte),
        }
    }
}

#[tracing::instrument(skip(input))]
fn decode_item(input: &[u8], ix: usize) -> Item {
    match input.get(ix..ix + 2) {
        Some(&[high, low]) => {
            let word = u16::from_be_bytes([high, low]);
            Instruction::decode(word).map_or(Item::Word(word), Item::Instruction)
        }
        _ => Item::Byte(input[ix]),
    }
}

/// Decode an image into items, paired with their offset into the image.
///
/// Instructions are assumed to be word aligned, data in between instructions may throw the
/// decoding off.
pub fn disassemble_code(input: &[u8]) -> Vec<(usize, Item)> {
    let mut code = vec![];
    let mut curr_ix = 0;

    while curr_ix < input.len() {
        let item = decode_item(input, curr_ix);
        code.push((curr_ix, item));
        curr_ix += item.size();
    }

    code
}

#[derive(clap::Args, Debug)]
pub struct DisassemblyArgs {
    #[clap(help = "Image to disassemble")]
    pub input: PathBuf,
}

/// Print a listing of a compiled image.
pub fn disassemble(args: &DisassemblyArgs) -> Result<()> {
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Unable to read {}", args.input.display()))?;
    print!("{}", listing::generate(LOAD_BASE, &bytes));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_disassemble_code() {
        let tests = vec![
            (
                vec![0x60, 0x05],
                vec![(0, Item::Instruction(Instruction::LoadImmediate { x: 0, byte: 5 }))],
            ),
            (
                vec![0x60, 0x01, 0x12, 0x00],
                vec![
                    (0, Item::Instruction(Instruction::LoadImmediate { x: 0, byte: 1 })),
                    (2, Item::Instruction(Instruction::Jump(0x200))),
                ],
            ),
            (
                vec![0xA2, 0x04, 0x00, 0xE0, 0xFF],
                vec![
                    (0, Item::Instruction(Instruction::LoadIndex(0x204))),
                    (2, Item::Word(0x00E0)),
                    (4, Item::Byte(0xFF)),
                ],
            ),
            (vec![], vec![]),
        ];

        for (input, expected) in tests {
            assert_eq!(disassemble_code(&input), expected);
        }
    }
}
