use std::{collections::HashMap, fmt};

use lazy_static::lazy_static;

use super::{AddressKind, CallSite, CodeGen, CodeGenError, MAX_ADDRESS};
use crate::{
    ast::{Atom, Register, Value},
    instruction::Instruction,
};

/// Validates the arguments of a builtin call and emits its machine code.
pub type Encoder = fn(&mut CodeGen, CallSite, &[Atom]) -> Result<(), CodeGenError>;

/// A named operation with a direct machine code encoding.
pub struct Builtin {
    pub name: &'static str,
    /// Number of arguments, checked by the parser
    pub arity: usize,
    pub encode: Encoder,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Builtin {}

lazy_static! {
    /// Every builtin, by name.
    pub static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let builtins = vec![
            Builtin {
                name: "=",
                arity: 2,
                encode: encode_assign,
            },
            Builtin {
                name: "+",
                arity: 2,
                encode: encode_add,
            },
            Builtin {
                name: "draw",
                arity: 3,
                encode: encode_draw,
            },
        ];
        builtins
            .into_iter()
            .map(|builtin| (builtin.name, builtin))
            .collect()
    };
}

/// Look up a builtin by name.
pub fn find(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

fn invalid_argument(operation: &'static str, args: &[Atom], site: CallSite) -> CodeGenError {
    CodeGenError::InvalidArgument {
        operation,
        args: args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<String>>()
            .join(" "),
        offset: site.offset,
    }
}

fn check_size(value: u64, max: u64, offset: usize) -> Result<(), CodeGenError> {
    if value > max {
        return Err(CodeGenError::IntegerTooLarge { value, max, offset });
    }
    Ok(())
}

fn immediate_byte(value: u64, offset: usize) -> Result<u8, CodeGenError> {
    check_size(value, u8::MAX as u64, offset)?;
    Ok(value as u8)
}

/// An argument classified by the shape the encoders match on.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
enum Operand<'a> {
    V(u8),
    Index,
    DelayTimer,
    Integer { value: u64, offset: usize },
    Label { name: &'a str, offset: usize },
    /// A `V` register outside `V0` - `VF`
    Invalid,
}

fn operands(args: &[Atom]) -> Vec<Operand<'_>> {
    args.iter()
        .map(|arg| match &arg.value {
            Value::Register(Register::V(reg)) if *reg <= 0xf => Operand::V(*reg),
            Value::Register(Register::V(_)) => Operand::Invalid,
            Value::Register(Register::Index) => Operand::Index,
            Value::Register(Register::DelayTimer) => Operand::DelayTimer,
            Value::Integer(value) => Operand::Integer {
                value: *value,
                offset: arg.offset,
            },
            Value::Identifier(name) => Operand::Label {
                name,
                offset: arg.offset,
            },
        })
        .collect()
}

/// `(= dst src)`
fn encode_assign(
    codegen: &mut CodeGen,
    site: CallSite,
    args: &[Atom],
) -> Result<(), CodeGenError> {
    let ins = match operands(args).as_slice() {
        [Operand::V(x), Operand::Integer { value, offset }] => Instruction::LoadImmediate {
            x: *x,
            byte: immediate_byte(*value, *offset)?,
        },
        [Operand::V(x), Operand::V(y)] => Instruction::Copy { x: *x, y: *y },
        [Operand::V(x), Operand::DelayTimer] => Instruction::GetDelayTimer(*x),
        [Operand::Index, Operand::Integer { value, offset }] => {
            check_size(*value, MAX_ADDRESS as u64, *offset)?;
            Instruction::LoadIndex(*value as u16)
        }
        [Operand::Index, Operand::Label { name, offset }] => {
            let site = CallSite {
                offset: *offset,
                ..site
            };
            return codegen.defer(name, AddressKind::IndexLoad, site);
        }
        [Operand::DelayTimer, Operand::V(x)] => Instruction::SetDelayTimer(*x),
        _ => return Err(invalid_argument("=", args, site)),
    };

    codegen.write(ins.encode())
}

/// `(+ dst src)`
fn encode_add(codegen: &mut CodeGen, site: CallSite, args: &[Atom]) -> Result<(), CodeGenError> {
    let ins = match operands(args).as_slice() {
        [Operand::V(x), Operand::Integer { value, offset }] => Instruction::AddImmediate {
            x: *x,
            byte: immediate_byte(*value, *offset)?,
        },
        [Operand::V(x), Operand::V(y)] => Instruction::AddRegister { x: *x, y: *y },
        _ => return Err(invalid_argument("+", args, site)),
    };

    codegen.write(ins.encode())
}

/// `(draw x y rows)`
fn encode_draw(codegen: &mut CodeGen, site: CallSite, args: &[Atom]) -> Result<(), CodeGenError> {
    let ins = match operands(args).as_slice() {
        [Operand::V(x), Operand::V(y), Operand::Integer { value, offset }] => {
            check_size(*value, 7, *offset)?;
            Instruction::Draw {
                x: *x,
                y: *y,
                rows: *value as u8,
            }
        }
        _ => return Err(invalid_argument("draw", args, site)),
    };

    codegen.write(ins.encode())
}
