//! Decoding of raw CIL code into symbolic instructions.
//!
//! Decoding runs in two passes. The first walks the code bytes, recording every
//! instruction's offset and raw operand. The second resolves metadata tokens through a
//! [`SymbolResolver`] and converts branch displacements into instruction indices, which
//! requires knowing every instruction boundary up front. A branch landing between two
//! instructions, or outside the code, makes the body malformed.

use crate::{
    assembly::{Immediate, Instruction, OpCode, Operand, OperandType},
    file::parser::Parser,
    metadata::{scope::SymbolResolver, token::Token},
    Result,
};

/// An operand as it appears in the byte stream, before tokens and offsets are resolved.
enum RawOperand {
    None,
    Immediate(Immediate),
    Token(Token),
    Branch(i64),
    Switch(Vec<i64>),
    Local(u16),
    Argument(u16),
}

struct RawInstruction {
    offset: u32,
    opcode: OpCode,
    operand: RawOperand,
}

fn decode_raw(parser: &mut Parser) -> Result<RawInstruction> {
    let offset = u32::try_from(parser.pos()).map_err(|_| malformed_error!("Code offset exceeds 32 bits"))?;

    let first = parser.read_le::<u8>()?;
    let second = if first == crate::assembly::opcodes::FE_PREFIX {
        Some(parser.read_le::<u8>()?)
    } else {
        None
    };
    let Some(opcode) = OpCode::from_bytes(first, second) else {
        return Err(malformed_error!(
            "Invalid opcode {:#04x}{} at offset {:#x}",
            first,
            second.map(|b| format!(" {b:#04x}")).unwrap_or_default(),
            offset
        ));
    };
    let Some(operand_type) = opcode.operand_type() else {
        return Err(malformed_error!("Opcode without operand type - {}", opcode));
    };

    let operand = match operand_type {
        OperandType::None => RawOperand::None,
        OperandType::Int8 => RawOperand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => RawOperand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::Int32 => RawOperand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::Int64 => RawOperand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::Float32 => RawOperand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => RawOperand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::ShortArgument => RawOperand::Argument(u16::from(parser.read_le::<u8>()?)),
        OperandType::Argument => RawOperand::Argument(parser.read_le::<u16>()?),
        OperandType::ShortLocal => RawOperand::Local(u16::from(parser.read_le::<u8>()?)),
        OperandType::Local => RawOperand::Local(parser.read_le::<u16>()?),
        OperandType::ShortBranch => RawOperand::Branch(i64::from(parser.read_le::<i8>()?)),
        OperandType::Branch => RawOperand::Branch(i64::from(parser.read_le::<i32>()?)),
        OperandType::Switch => {
            let count = parser.read_le::<u32>()? as usize;
            // each target takes four bytes; reject counts the code cannot hold
            if count > parser.remaining() / 4 {
                return Err(malformed_error!(
                    "Switch at offset {:#x} declares {} targets but only {} bytes remain",
                    offset,
                    count,
                    parser.remaining()
                ));
            }
            let mut deltas = Vec::with_capacity(count);
            for _ in 0..count {
                deltas.push(i64::from(parser.read_le::<i32>()?));
            }
            RawOperand::Switch(deltas)
        }
        OperandType::Field
        | OperandType::Method
        | OperandType::Type
        | OperandType::String
        | OperandType::Symbol
        | OperandType::Signature => RawOperand::Token(Token::new(parser.read_le::<u32>()?)),
    };

    Ok(RawInstruction {
        offset,
        opcode,
        operand,
    })
}

/// Finds the index of the instruction starting at `offset`.
///
/// An offset equal to `code_size` maps to `instructions.len()`, the exclusive end used by
/// exception handler ranges. Any other offset not on an instruction boundary yields `None`.
#[must_use]
pub fn index_of_offset(instructions: &[Instruction], offset: u32, code_size: u32) -> Option<usize> {
    if offset == code_size {
        return Some(instructions.len());
    }
    instructions
        .binary_search_by_key(&offset, |instruction| instruction.offset)
        .ok()
}

fn resolve_operand(
    raw: RawOperand,
    operand_type: OperandType,
    resolver: &dyn SymbolResolver,
) -> Result<Operand> {
    Ok(match raw {
        RawOperand::None => Operand::None,
        RawOperand::Immediate(value) => Operand::Immediate(value),
        RawOperand::Local(index) => Operand::Local(index),
        RawOperand::Argument(index) => Operand::Argument(index),
        RawOperand::Token(token) => match operand_type {
            OperandType::Field => Operand::Field(resolver.resolve_field(token)?),
            OperandType::Method => Operand::Method(resolver.resolve_method(token)?),
            OperandType::Type => Operand::Type(resolver.resolve_type(token)?),
            OperandType::String => Operand::String(resolver.resolve_string(token)?),
            OperandType::Symbol => Operand::Symbol(resolver.resolve_symbol(token)?),
            _ => Operand::Signature(token),
        },
        // targets are resolved by the caller once all offsets are known
        RawOperand::Branch(_) | RawOperand::Switch(_) => Operand::None,
    })
}

/// Decodes a complete code stream into instructions.
///
/// # Arguments
/// * `code` - The method's code bytes, without header or exception sections
/// * `resolver` - Resolves field, method, type and string tokens to descriptors
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for undefined opcodes or branches that do not land on
/// an instruction boundary, [`crate::Error::OutOfBounds`] for truncated operands, and
/// [`crate::Error::UnresolvedToken`] for tokens the resolver does not know.
pub fn decode_stream(code: &[u8], resolver: &dyn SymbolResolver) -> Result<Vec<Instruction>> {
    let code_size = u32::try_from(code.len()).map_err(|_| malformed_error!("Code exceeds 32 bits"))?;

    let mut parser = Parser::new(code);
    let mut raw = Vec::new();
    let mut ends = Vec::new();
    while parser.has_more_data() {
        raw.push(decode_raw(&mut parser)?);
        ends.push(i64::try_from(parser.pos()).map_err(|_| malformed_error!("Code offset overflow"))?);
    }

    let offsets: Vec<u32> = raw.iter().map(|instruction| instruction.offset).collect();
    let target_index = |from: usize, delta: i64| -> Result<usize> {
        let target = ends[from] + delta;
        let found = u32::try_from(target)
            .ok()
            .filter(|target| *target < code_size)
            .and_then(|target| offsets.binary_search(&target).ok());
        found.ok_or_else(|| {
            malformed_error!(
                "Branch at offset {:#x} targets {:#x}, which is not an instruction boundary",
                offsets[from],
                target
            )
        })
    };

    let mut instructions = Vec::with_capacity(raw.len());
    for (index, instruction) in raw.into_iter().enumerate() {
        let operand_type = instruction
            .opcode
            .operand_type()
            .ok_or_else(|| malformed_error!("Undefined opcode - {}", instruction.opcode))?;

        let operand = match instruction.operand {
            RawOperand::Branch(delta) => Operand::Target(target_index(index, delta)?),
            RawOperand::Switch(deltas) => Operand::Switch(
                deltas
                    .into_iter()
                    .map(|delta| target_index(index, delta))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => resolve_operand(other, operand_type, resolver)?,
        };

        instructions.push(Instruction {
            offset: instruction.offset,
            opcode: instruction.opcode,
            operand,
        });
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{scope::ReferenceScope, token::TokenTable},
        symbols::{FieldRef, Symbol, TypeRef},
        Error,
    };

    #[test]
    fn decode_simple_stream() {
        let scope = ReferenceScope::new();
        let code = [
            0x02, // ldarg.0
            0x1F, 0xF6, // ldc.i4.s -10
            0x20, 0x00, 0x01, 0x00, 0x00, // ldc.i4 256
            0xFE, 0x01, // ceq
            0x2A, // ret
        ];

        let instructions = decode_stream(&code, &scope).unwrap();
        assert_eq!(instructions.len(), 5);
        assert_eq!(instructions[0].opcode, OpCode::LDARG_0);
        assert_eq!(instructions[1].operand, Operand::Immediate(Immediate::Int8(-10)));
        assert_eq!(instructions[2].operand, Operand::Immediate(Immediate::Int32(256)));
        assert_eq!(instructions[3].opcode, OpCode::CEQ);
        assert_eq!(instructions[3].offset, 8);
        assert_eq!(instructions[4].offset, 10);
    }

    #[test]
    fn decode_branches_to_indices() {
        let scope = ReferenceScope::new();
        let code = [
            0x16, // 0: ldc.i4.0
            0x2C, 0x02, // 1: brfalse.s +2 -> offset 5
            0x00, // 3: nop
            0x00, // 4: nop
            0x2B, 0xFC, // 5: br.s -4 -> offset 3
            0x2A, // 7: ret
        ];

        let instructions = decode_stream(&code, &scope).unwrap();
        assert_eq!(instructions[1].operand, Operand::Target(4));
        assert_eq!(instructions[4].operand, Operand::Target(2));
    }

    #[test]
    fn decode_switch() {
        let scope = ReferenceScope::new();
        let code = [
            0x45, 0x02, 0x00, 0x00, 0x00, // switch (2 targets)
            0x00, 0x00, 0x00, 0x00, // +0 -> 13
            0x01, 0x00, 0x00, 0x00, // +1 -> 14
            0x00, // 13: nop
            0x2A, // 14: ret
        ];

        let instructions = decode_stream(&code, &scope).unwrap();
        assert_eq!(instructions[0].operand, Operand::Switch(vec![1, 2]));
        assert_eq!(instructions[0].size(), 13);
    }

    #[test]
    fn decode_resolves_tokens() {
        let scope = ReferenceScope::new();
        let field = FieldRef::new(TypeRef::named("StardewValley", "Game1"), "player", TypeRef::named("StardewValley", "Farmer"));
        let field_token = Token::from_parts(TokenTable::MemberRef, 3);
        scope.define(field_token, Symbol::Field(field.clone()));
        let string_token = Token::from_parts(TokenTable::UserString, 1);
        scope.define_string(string_token, "summer");

        let mut code = vec![0x7E];
        code.extend_from_slice(&field_token.value().to_le_bytes());
        code.push(0x72);
        code.extend_from_slice(&string_token.value().to_le_bytes());
        code.push(0x2A);

        let instructions = decode_stream(&code, &scope).unwrap();
        assert_eq!(instructions[0].operand, Operand::Field(field));
        assert_eq!(instructions[1].operand, Operand::String("summer".into()));
    }

    #[test]
    fn decode_errors() {
        let scope = ReferenceScope::new();

        // branch into the middle of ldc.i4
        let code = [0x2B, 0x01, 0x20, 0x00, 0x00, 0x00, 0x00, 0x2A];
        assert!(matches!(decode_stream(&code, &scope), Err(Error::Malformed { .. })));

        // branch past the end
        let code = [0x2B, 0x01, 0x2A];
        assert!(matches!(decode_stream(&code, &scope), Err(Error::Malformed { .. })));

        // undefined opcode
        assert!(matches!(decode_stream(&[0x24], &scope), Err(Error::Malformed { .. })));

        // truncated operand
        assert!(matches!(decode_stream(&[0x20, 0x00], &scope), Err(Error::OutOfBounds)));

        // unknown token
        let code = [0x28, 0x01, 0x00, 0x00, 0x0A];
        assert!(matches!(decode_stream(&code, &scope), Err(Error::UnresolvedToken(_))));

        // switch with an absurd target count
        let code = [0x45, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(decode_stream(&code, &scope), Err(Error::Malformed { .. })));
    }

    #[test]
    fn offset_lookup() {
        let scope = ReferenceScope::new();
        let instructions = decode_stream(&[0x00, 0x1F, 0x05, 0x2A], &scope).unwrap();
        assert_eq!(index_of_offset(&instructions, 0, 4), Some(0));
        assert_eq!(index_of_offset(&instructions, 3, 4), Some(2));
        assert_eq!(index_of_offset(&instructions, 4, 4), Some(3));
        assert_eq!(index_of_offset(&instructions, 2, 4), None);
    }
}
