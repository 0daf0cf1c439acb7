//! Layout and encoding of symbolic instructions back into CIL code bytes.
//!
//! Rewrites change instruction sizes, so byte offsets are never trusted after an edit.
//! [`layout_stream`] recomputes offsets in one forward pass and widens every short-form
//! branch whose displacement no longer fits in a signed byte, repeating until a pass widens
//! nothing. Widening only ever grows instructions, so each short branch is widened at most
//! once and the loop terminates. [`encode_stream`] then emits bytes, turning descriptors
//! into tokens through a [`SymbolEmitter`].

use crate::{
    assembly::{codec::widen_branch, Immediate, Instruction, Operand, OperandType},
    file::io::write_le,
    metadata::scope::SymbolEmitter,
    symbols::Symbol,
    Result,
};

/// Computes the byte offset of every instruction, plus the total code size as a final entry.
///
/// # Errors
/// Returns [`crate::Error::StructuralDefect`] if the code would exceed 32 bits.
pub fn compute_offsets(instructions: &[Instruction]) -> Result<Vec<u32>> {
    let mut offsets = Vec::with_capacity(instructions.len() + 1);
    let mut offset = 0_u32;
    for instruction in instructions {
        offsets.push(offset);
        offset = offset
            .checked_add(instruction.size())
            .ok_or_else(|| structural_error!("method code exceeds 4 GiB"))?;
    }
    offsets.push(offset);
    Ok(offsets)
}

fn branch_delta(offsets: &[u32], index: usize, size: u32, target: usize) -> Result<i64> {
    if target + 1 >= offsets.len() {
        return Err(structural_error!(
            "instruction {} branches to #{}, outside a body of {} instructions",
            index,
            target,
            offsets.len() - 1
        ));
    }
    let next = i64::from(offsets[index]) + i64::from(size);
    Ok(i64::from(offsets[target]) - next)
}

/// Statistics of one [`layout_stream`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Number of forward passes performed
    pub passes: usize,
    /// Number of short branches converted to their long form
    pub widened: usize,
    /// Total code size after layout
    pub code_size: u32,
}

/// Recomputes offsets and widens out-of-range short branches until the layout is stable.
///
/// On success every instruction's `offset` is current and every branch displacement fits
/// its encoding.
///
/// # Errors
/// Returns [`crate::Error::StructuralDefect`] if a branch targets an index outside the body,
/// a displacement overflows even in long form, or the code exceeds 32 bits.
pub fn layout_stream(instructions: &mut [Instruction]) -> Result<LayoutStats> {
    let mut stats = LayoutStats::default();

    loop {
        stats.passes += 1;
        let offsets = compute_offsets(instructions)?;
        for (instruction, offset) in instructions.iter_mut().zip(&offsets) {
            instruction.offset = *offset;
        }

        let mut changed = false;
        for index in 0..instructions.len() {
            let instruction = &instructions[index];
            let size = instruction.size();
            let wide = match instruction.opcode.operand_type() {
                Some(OperandType::ShortBranch) => false,
                Some(OperandType::Branch | OperandType::Switch) => true,
                _ => continue,
            };

            let mut fits = true;
            for target in instruction.branch_targets() {
                let delta = branch_delta(&offsets, index, size, target)?;
                if wide {
                    if i32::try_from(delta).is_err() {
                        return Err(structural_error!(
                            "branch displacement {} at instruction {} overflows 32 bits",
                            delta,
                            index
                        ));
                    }
                } else if i8::try_from(delta).is_err() {
                    fits = false;
                }
            }

            if !fits {
                let opcode = instructions[index].opcode;
                let Some(long) = widen_branch(opcode) else {
                    return Err(structural_error!("{} at instruction {} cannot be widened", opcode, index));
                };
                instructions[index].opcode = long;
                stats.widened += 1;
                changed = true;
            }
        }

        if !changed {
            stats.code_size = offsets.last().copied().unwrap_or(0);
            return Ok(stats);
        }
    }
}

/// Encodes instructions into code bytes.
///
/// Offsets are recomputed from instruction sizes rather than read from the instructions, so
/// a stale layout cannot produce inconsistent branches. Short branches whose displacement
/// does not fit are not widened here; run [`layout_stream`] first.
///
/// # Errors
/// Returns [`crate::Error::StructuralDefect`] for operands that do not fit their opcode and
/// for branches that do not fit their encoding, plus any error of the emitter.
pub fn encode_stream(instructions: &[Instruction], emitter: &dyn SymbolEmitter) -> Result<Vec<u8>> {
    let offsets = compute_offsets(instructions)?;
    let mut code = Vec::with_capacity(offsets.last().copied().unwrap_or(0) as usize);

    for (index, instruction) in instructions.iter().enumerate() {
        if !instruction.is_well_formed() {
            return Err(structural_error!(
                "instruction {} ({}) has an operand of the wrong kind",
                index,
                instruction.opcode
            ));
        }

        instruction.opcode.write(&mut code);
        let size = instruction.size();
        match &instruction.operand {
            Operand::None => {}
            Operand::Immediate(value) => match value {
                Immediate::Int8(v) => write_le(&mut code, *v),
                Immediate::UInt8(v) => write_le(&mut code, *v),
                Immediate::Int32(v) => write_le(&mut code, *v),
                Immediate::Int64(v) => write_le(&mut code, *v),
                Immediate::Float32(v) => write_le(&mut code, *v),
                Immediate::Float64(v) => write_le(&mut code, *v),
            },
            Operand::Local(value) | Operand::Argument(value) => {
                match instruction.opcode.operand_type() {
                    Some(OperandType::ShortLocal | OperandType::ShortArgument) => {
                        let short = u8::try_from(*value)
                            .map_err(|_| structural_error!("index {} does not fit {}", value, instruction.opcode))?;
                        write_le(&mut code, short);
                    }
                    _ => write_le(&mut code, *value),
                }
            }
            Operand::Target(target) => {
                let delta = branch_delta(&offsets, index, size, *target)?;
                if instruction.is_short_branch() {
                    let short = i8::try_from(delta).map_err(|_| {
                        structural_error!(
                            "{} at instruction {} cannot reach #{} ({} bytes)",
                            instruction.opcode,
                            index,
                            target,
                            delta
                        )
                    })?;
                    write_le(&mut code, short);
                } else {
                    let long = i32::try_from(delta)
                        .map_err(|_| structural_error!("branch displacement {} overflows 32 bits", delta))?;
                    write_le(&mut code, long);
                }
            }
            Operand::Switch(targets) => {
                let count =
                    u32::try_from(targets.len()).map_err(|_| structural_error!("switch table too large"))?;
                write_le(&mut code, count);
                for target in targets {
                    let delta = branch_delta(&offsets, index, size, *target)?;
                    let long = i32::try_from(delta)
                        .map_err(|_| structural_error!("switch displacement {} overflows 32 bits", delta))?;
                    write_le(&mut code, long);
                }
            }
            Operand::String(value) => write_le(&mut code, emitter.string_token(value)?.value()),
            Operand::Type(ty) => write_le(&mut code, emitter.type_token(ty)?.value()),
            Operand::Field(field) => write_le(&mut code, emitter.field_token(field)?.value()),
            Operand::Method(method) => write_le(&mut code, emitter.method_token(method)?.value()),
            Operand::Symbol(symbol) => {
                let token = match symbol {
                    Symbol::Type(ty) => emitter.type_token(ty)?,
                    Symbol::Field(field) => emitter.field_token(field)?,
                    Symbol::Method(method) => emitter.method_token(method)?,
                };
                write_le(&mut code, token.value());
            }
            Operand::Signature(token) => write_le(&mut code, token.value()),
        }
    }

    Ok(code)
}
