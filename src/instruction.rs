use std::fmt;

/// Opcode tag of `1NNN`, jump to `NNN`
pub const JUMP_TAG: u16 = 0x1000;

/// Opcode tag of `ANNN`, set `I` to `NNN`
pub const LOAD_INDEX_TAG: u16 = 0xA000;

/// The subset of CHIP-8 instructions that the compiler emits.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub enum Instruction {
    /// `1NNN`: jump to address `NNN`
    Jump(u16),
    /// `6XNN`: `VX = NN`
    LoadImmediate { x: u8, byte: u8 },
    /// `7XNN`: `VX += NN`
    AddImmediate { x: u8, byte: u8 },
    /// `8XY0`: `VX = VY`
    Copy { x: u8, y: u8 },
    /// `8XY4`: `VX += VY`
    AddRegister { x: u8, y: u8 },
    /// `ANNN`: `I = NNN`
    LoadIndex(u16),
    /// `DXYN`: draw `N` rows of the sprite at `I` at (`VX`, `VY`)
    Draw { x: u8, y: u8, rows: u8 },
    /// `FX07`: `VX = DT`
    GetDelayTimer(u8),
    /// `FX15`: `DT = VX`
    SetDelayTimer(u8),
}

impl Instruction {
    /// Encode the instruction as a single 16-bit word.
    ///
    /// Fields are truncated to their width, callers are expected to range check them first.
    pub fn encode(&self) -> u16 {
        fn x(reg: u8) -> u16 {
            ((reg & 0xf) as u16) << 8
        }
        fn y(reg: u8) -> u16 {
            ((reg & 0xf) as u16) << 4
        }

        match *self {
            Instruction::Jump(addr) => JUMP_TAG | (addr & 0x0fff),
            Instruction::LoadImmediate { x: vx, byte } => 0x6000 | x(vx) | byte as u16,
            Instruction::AddImmediate { x: vx, byte } => 0x7000 | x(vx) | byte as u16,
            Instruction::Copy { x: vx, y: vy } => 0x8000 | x(vx) | y(vy),
            Instruction::AddRegister { x: vx, y: vy } => 0x8004 | x(vx) | y(vy),
            Instruction::LoadIndex(addr) => LOAD_INDEX_TAG | (addr & 0x0fff),
            Instruction::Draw { x: vx, y: vy, rows } => {
                0xD000 | x(vx) | y(vy) | (rows & 0xf) as u16
            }
            Instruction::GetDelayTimer(vx) => 0xF007 | x(vx),
            Instruction::SetDelayTimer(vx) => 0xF015 | x(vx),
        }
    }

    /// Decode a word, `None` if it is not part of the supported subset.
    pub fn decode(word: u16) -> Option<Instruction> {
        let x = ((word >> 8) & 0xf) as u8;
        let y = ((word >> 4) & 0xf) as u8;
        let n = (word & 0xf) as u8;
        let byte = (word & 0xff) as u8;
        let addr = word & 0x0fff;

        match word >> 12 {
            0x1 => Some(Instruction::Jump(addr)),
            0x6 => Some(Instruction::LoadImmediate { x, byte }),
            0x7 => Some(Instruction::AddImmediate { x, byte }),
            0x8 if n == 0x0 => Some(Instruction::Copy { x, y }),
            0x8 if n == 0x4 => Some(Instruction::AddRegister { x, y }),
            0xA => Some(Instruction::LoadIndex(addr)),
            0xD => Some(Instruction::Draw { x, y, rows: n }),
            0xF if byte == 0x07 => Some(Instruction::GetDelayTimer(x)),
            0xF if byte == 0x15 => Some(Instruction::SetDelayTimer(x)),
            _ => None,
        }
    }

    /// Encoded instruction in big-endian byte order.
    pub fn to_bytes(&self) -> [u8; 2] {
        self.encode().to_be_bytes()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Jump(addr) => write!(f, "JP ${:03X}", addr),
            Instruction::LoadImmediate { x, byte } => write!(f, "LD V{:X}, #${:02X}", x, byte),
            Instruction::AddImmediate { x, byte } => write!(f, "ADD V{:X}, #${:02X}", x, byte),
            Instruction::Copy { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Instruction::AddRegister { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Instruction::LoadIndex(addr) => write!(f, "LD I, ${:03X}", addr),
            Instruction::Draw { x, y, rows } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, rows),
            Instruction::GetDelayTimer(x) => write!(f, "LD V{:X}, DT", x),
            Instruction::SetDelayTimer(x) => write!(f, "LD DT, V{:X}", x),
        }
    }
}
