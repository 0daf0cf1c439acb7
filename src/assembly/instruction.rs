//! Decoded CIL instructions.
//!
//! An [`Instruction`] pairs an [`OpCode`] with an [`Operand`] whose kind is dictated by the
//! opcode. Unlike the raw byte encoding, operands are symbolic: field, method and type
//! operands carry descriptors instead of metadata tokens, and branch operands carry the index
//! of the target instruction within the method body instead of a byte offset. Both choices
//! let rewrite rules edit a body without recomputing tokens or jump distances by hand;
//! offsets are derived again by the layout pass before encoding.
//!
//! # Key Components
//!
//! - [`OperandType`] - The operand encoding an opcode expects
//! - [`FlowType`] - How an opcode affects control flow
//! - [`Immediate`] - Literal numeric operands
//! - [`Operand`] - The symbolic operand of a decoded instruction
//! - [`Instruction`] - Opcode, operand and byte offset

use std::fmt;

use crate::{
    assembly::OpCode,
    metadata::token::Token,
    symbols::{FieldRef, MethodRef, Symbol, TypeRef},
    Result,
};

/// The operand encoding an opcode expects (ECMA-335 III.1.9).
///
/// # Thread Safety
///
/// [`OperandType`] is [`std::marker::Send`] and [`std::marker::Sync`] as it only contains primitive data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer (`ldc.i4.s`)
    Int8,
    /// Unsigned 8-bit integer (`unaligned.`, `no.`)
    UInt8,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// 8-bit argument index
    ShortArgument,
    /// 16-bit argument index
    Argument,
    /// 8-bit local variable index
    ShortLocal,
    /// 16-bit local variable index
    Local,
    /// 8-bit signed branch displacement
    ShortBranch,
    /// 32-bit signed branch displacement
    Branch,
    /// Jump table
    Switch,
    /// Field token
    Field,
    /// Method token
    Method,
    /// Type token
    Type,
    /// User string token
    String,
    /// Type, field or method token (`ldtoken`)
    Symbol,
    /// Standalone signature token (`calli`)
    Signature,
}

impl OperandType {
    /// Returns the encoded size of this operand type in bytes.
    ///
    /// Returns `None` for [`OperandType::Switch`], whose size depends on the number of targets.
    #[must_use]
    pub const fn size(&self) -> Option<u32> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8
            | OperandType::UInt8
            | OperandType::ShortArgument
            | OperandType::ShortLocal
            | OperandType::ShortBranch => Some(1),
            OperandType::Argument | OperandType::Local => Some(2),
            OperandType::Int32
            | OperandType::Float32
            | OperandType::Branch
            | OperandType::Field
            | OperandType::Method
            | OperandType::Type
            | OperandType::String
            | OperandType::Symbol
            | OperandType::Signature => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// How an opcode affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Multi-way branch (switch statement)
    Switch,
    /// Exception throwing
    Throw,
    /// End of finally or filter block
    EndFinally,
    /// Leave protected region (try/catch/finally)
    Leave,
}

/// A literal numeric operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit value
    Int8(i8),
    /// Unsigned 8-bit value
    UInt8(u8),
    /// Signed 32-bit value
    Int32(i32),
    /// Signed 64-bit value
    Int64(i64),
    /// 32-bit floating point value
    Float32(f32),
    /// 64-bit floating point value
    Float64(f64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(v) => write!(f, "{v}"),
            Immediate::UInt8(v) => write!(f, "{v}"),
            Immediate::Int32(v) => write!(f, "{v}"),
            Immediate::Int64(v) => write!(f, "{v}"),
            Immediate::Float32(v) => write!(f, "{v}"),
            Immediate::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// The symbolic operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// A literal number
    Immediate(Immediate),
    /// A literal string (`ldstr`)
    String(String),
    /// Index of the branch target within the method body
    Target(usize),
    /// Indices of the `switch` targets within the method body
    Switch(Vec<usize>),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// A type reference
    Type(TypeRef),
    /// A field reference
    Field(FieldRef),
    /// A method reference
    Method(MethodRef),
    /// The symbol loaded by `ldtoken`
    Symbol(Symbol),
    /// An unresolved standalone signature (`calli`)
    Signature(Token),
}

impl Operand {
    /// Returns `true` if this operand is valid for an opcode expecting `expected`.
    #[must_use]
    pub fn fits(&self, expected: OperandType) -> bool {
        match (self, expected) {
            (Operand::None, OperandType::None)
            | (Operand::Immediate(Immediate::Int8(_)), OperandType::Int8)
            | (Operand::Immediate(Immediate::UInt8(_)), OperandType::UInt8)
            | (Operand::Immediate(Immediate::Int32(_)), OperandType::Int32)
            | (Operand::Immediate(Immediate::Int64(_)), OperandType::Int64)
            | (Operand::Immediate(Immediate::Float32(_)), OperandType::Float32)
            | (Operand::Immediate(Immediate::Float64(_)), OperandType::Float64)
            | (Operand::String(_), OperandType::String)
            | (Operand::Target(_), OperandType::ShortBranch | OperandType::Branch)
            | (Operand::Switch(_), OperandType::Switch)
            | (Operand::Local(_), OperandType::Local)
            | (Operand::Argument(_), OperandType::Argument)
            | (Operand::Type(_), OperandType::Type)
            | (Operand::Field(_), OperandType::Field)
            | (Operand::Method(_), OperandType::Method)
            | (Operand::Symbol(_), OperandType::Symbol)
            | (Operand::Signature(_), OperandType::Signature) => true,
            (Operand::Local(index), OperandType::ShortLocal)
            | (Operand::Argument(index), OperandType::ShortArgument) => *index <= u16::from(u8::MAX),
            _ => false,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, "{value}"),
            Operand::String(value) => write!(f, "\"{}\"", value.escape_default()),
            Operand::Target(index) => write!(f, "#{index}"),
            Operand::Switch(targets) => {
                f.write_str("(")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "#{target}")?;
                }
                f.write_str(")")
            }
            Operand::Local(index) => write!(f, "V_{index}"),
            Operand::Argument(index) => write!(f, "A_{index}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::Field(field) => write!(f, "{field}"),
            Operand::Method(method) => write!(f, "{method}"),
            Operand::Symbol(symbol) => write!(f, "{symbol}"),
            Operand::Signature(token) => write!(f, "{token}"),
        }
    }
}

/// A single decoded instruction.
///
/// # Thread Safety
///
/// [`Instruction`] is [`std::marker::Send`] and [`std::marker::Sync`]; it owns all of its data.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset within the method's code, valid after decoding or the last layout pass
    pub offset: u32,
    /// The opcode
    pub opcode: OpCode,
    /// The operand, matching the opcode's [`OperandType`]
    pub operand: Operand,
}

impl Instruction {
    /// Creates an instruction, checking that the operand kind matches the opcode.
    ///
    /// The offset is left at zero until the containing body is laid out.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if the opcode is not defined or the operand
    /// does not fit it.
    pub fn new(opcode: OpCode, operand: Operand) -> Result<Self> {
        let Some(expected) = opcode.operand_type() else {
            return Err(structural_error!("undefined opcode {:#06x}", opcode.value()));
        };
        if !operand.fits(expected) {
            return Err(structural_error!(
                "operand {:?} does not fit {} (expects {:?})",
                operand,
                opcode,
                expected
            ));
        }

        Ok(Instruction {
            offset: 0,
            opcode,
            operand,
        })
    }

    /// Creates an instruction without an operand.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if the opcode expects an operand.
    pub fn simple(opcode: OpCode) -> Result<Self> {
        Self::new(opcode, Operand::None)
    }

    /// Returns `true` if the operand still fits the opcode.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.opcode
            .operand_type()
            .is_some_and(|expected| self.operand.fits(expected))
    }

    /// Encoded size in bytes, including opcode and operand.
    #[must_use]
    pub fn size(&self) -> u32 {
        let operand_size = match (self.opcode.operand_type(), &self.operand) {
            (Some(OperandType::Switch), Operand::Switch(targets)) => {
                let count = u32::try_from(targets.len()).unwrap_or(u32::MAX);
                count.saturating_mul(4).saturating_add(4)
            }
            (Some(operand_type), _) => operand_type.size().unwrap_or(4),
            (None, _) => 0,
        };
        self.opcode.size() + operand_size
    }

    /// Control flow behaviour of the opcode.
    #[must_use]
    pub fn flow(&self) -> FlowType {
        self.opcode.flow().unwrap_or(FlowType::Sequential)
    }

    /// Returns `true` for branches encoded with an 8-bit displacement.
    #[must_use]
    pub fn is_short_branch(&self) -> bool {
        self.opcode.operand_type() == Some(OperandType::ShortBranch)
    }

    /// Indices of the instructions this instruction may jump to.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<usize> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }

    /// Applies `remap` to every branch target index.
    pub(crate) fn remap_targets(&mut self, remap: impl Fn(usize) -> usize) {
        match &mut self.operand {
            Operand::Target(target) => *target = remap(*target),
            Operand::Switch(targets) => {
                for target in targets.iter_mut() {
                    *target = remap(*target);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode)?;
        if !matches!(self.operand, Operand::None) {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}
