use super::CodeGenError;

/// Maximum size of a compiled image in bytes.
pub const ROM_CAPACITY: usize = 0xffff;

/// Fixed capacity, append only output buffer.
///
/// Words are stored big-endian like the CHIP-8 expects them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    pub fn new() -> Rom {
        Rom::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn push_byte(&mut self, byte: u8) -> Result<(), CodeGenError> {
        if self.bytes.len() >= ROM_CAPACITY {
            return Err(CodeGenError::RomOverflow {
                capacity: ROM_CAPACITY,
            });
        }
        self.bytes.push(byte);
        Ok(())
    }

    pub fn push_word(&mut self, word: u16) -> Result<(), CodeGenError> {
        let [high, low] = word.to_be_bytes();
        self.push_byte(high)?;
        self.push_byte(low)
    }

    /// Overwrite the word at `offset` which must already have been written.
    pub fn patch_word(&mut self, offset: usize, word: u16) {
        self.bytes[offset..offset + 2].copy_from_slice(&word.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_and_patch() -> Result<(), CodeGenError> {
        let mut rom = Rom::new();
        rom.push_word(0x6005)?;
        rom.push_word(0x0000)?;
        rom.push_byte(0xff)?;
        rom.patch_word(2, 0x1200);
        assert_eq!(rom.into_bytes(), vec![0x60, 0x05, 0x12, 0x00, 0xff]);
        Ok(())
    }

    #[test]
    fn test_overflow() -> Result<(), CodeGenError> {
        let mut rom = Rom::new();
        for _ in 0..ROM_CAPACITY - 1 {
            rom.push_byte(0)?;
        }
        assert_eq!(
            rom.push_word(0x1200),
            Err(CodeGenError::RomOverflow {
                capacity: ROM_CAPACITY
            })
        );
        assert_eq!(rom.len(), ROM_CAPACITY);
        Ok(())
    }
}
