//! Instruction classification and synthesis used by rewrite rules.
//!
//! These helpers answer the questions a rule asks about a single instruction (is it a field
//! access, is it a call) and build the replacement instructions a rule injects (constant
//! loads, long-form branches). All of them are pure; unsupported inputs yield `None`.

use crate::{
    assembly::{Immediate, Instruction, OpCode, Operand},
    host::HostValue,
    symbols::{FieldRef, MethodRef},
};

/// Short-form branch opcodes and their long-form counterparts.
const BRANCH_PAIRS: [(OpCode, OpCode); 14] = [
    (OpCode::BR_S, OpCode::BR),
    (OpCode::BRFALSE_S, OpCode::BRFALSE),
    (OpCode::BRTRUE_S, OpCode::BRTRUE),
    (OpCode::BEQ_S, OpCode::BEQ),
    (OpCode::BGE_S, OpCode::BGE),
    (OpCode::BGT_S, OpCode::BGT),
    (OpCode::BLE_S, OpCode::BLE),
    (OpCode::BLT_S, OpCode::BLT),
    (OpCode::BNE_UN_S, OpCode::BNE_UN),
    (OpCode::BGE_UN_S, OpCode::BGE_UN),
    (OpCode::BGT_UN_S, OpCode::BGT_UN),
    (OpCode::BLE_UN_S, OpCode::BLE_UN),
    (OpCode::BLT_UN_S, OpCode::BLT_UN),
    (OpCode::LEAVE_S, OpCode::LEAVE),
];

/// Returns the field referenced by `ldfld`, `ldsfld`, `stfld` or `stsfld`.
///
/// Address loads (`ldflda`, `ldsflda`) are not field accesses in this sense.
#[must_use]
pub fn classify_field_access(instruction: &Instruction) -> Option<&FieldRef> {
    match (instruction.opcode, &instruction.operand) {
        (OpCode::LDFLD | OpCode::LDSFLD | OpCode::STFLD | OpCode::STSFLD, Operand::Field(field)) => Some(field),
        _ => None,
    }
}

/// Returns the method invoked by `call`, `callvirt` or `newobj`.
#[must_use]
pub fn classify_method_invocation(instruction: &Instruction) -> Option<&MethodRef> {
    match (instruction.opcode, &instruction.operand) {
        (OpCode::CALL | OpCode::CALLVIRT | OpCode::NEWOBJ, Operand::Method(method)) => Some(method),
        _ => None,
    }
}

/// Returns `true` for `stfld` and `stsfld`.
#[must_use]
pub fn is_field_store(opcode: OpCode) -> bool {
    matches!(opcode, OpCode::STFLD | OpCode::STSFLD)
}

/// Returns `true` for `ldsfld`, `stsfld` and `ldsflda`.
#[must_use]
pub fn is_static_field_access(opcode: OpCode) -> bool {
    matches!(opcode, OpCode::LDSFLD | OpCode::STSFLD | OpCode::LDSFLDA)
}

/// Builds the narrowest instruction that pushes `value` onto the evaluation stack.
///
/// Supported kinds are null, booleans (as `ldc.i4.1` / `ldc.i4.0`), 32- and 64-bit integers,
/// 32- and 64-bit floats, and strings. Any other kind yields `None`.
///
/// # Examples
///
/// ```rust
/// use cilcompat::assembly::{codec::materialize_constant_load, OpCode};
/// use cilcompat::host::HostValue;
///
/// let load = materialize_constant_load(&HostValue::Boolean(true)).unwrap();
/// assert_eq!(load.opcode, OpCode::LDC_I4_1);
///
/// let load = materialize_constant_load(&HostValue::Int32(100)).unwrap();
/// assert_eq!(load.opcode, OpCode::LDC_I4_S);
///
/// assert!(materialize_constant_load(&HostValue::Char('x')).is_none());
/// ```
#[must_use]
pub fn materialize_constant_load(value: &HostValue) -> Option<Instruction> {
    let (opcode, operand) = match value {
        HostValue::Null => (OpCode::LDNULL, Operand::None),
        HostValue::Boolean(true) => (OpCode::LDC_I4_1, Operand::None),
        HostValue::Boolean(false) => (OpCode::LDC_I4_0, Operand::None),
        HostValue::Int32(value) => int32_load(*value),
        HostValue::Int64(value) => (OpCode::LDC_I8, Operand::Immediate(Immediate::Int64(*value))),
        HostValue::Float32(value) => (OpCode::LDC_R4, Operand::Immediate(Immediate::Float32(*value))),
        HostValue::Float64(value) => (OpCode::LDC_R8, Operand::Immediate(Immediate::Float64(*value))),
        HostValue::String(value) => (OpCode::LDSTR, Operand::String(value.clone())),
        _ => return None,
    };

    Instruction::new(opcode, operand).ok()
}

fn int32_load(value: i32) -> (OpCode, Operand) {
    let opcode = match value {
        -1 => OpCode::LDC_I4_M1,
        0 => OpCode::LDC_I4_0,
        1 => OpCode::LDC_I4_1,
        2 => OpCode::LDC_I4_2,
        3 => OpCode::LDC_I4_3,
        4 => OpCode::LDC_I4_4,
        5 => OpCode::LDC_I4_5,
        6 => OpCode::LDC_I4_6,
        7 => OpCode::LDC_I4_7,
        8 => OpCode::LDC_I4_8,
        _ => {
            return match i8::try_from(value) {
                Ok(short) => (OpCode::LDC_I4_S, Operand::Immediate(Immediate::Int8(short))),
                Err(_) => (OpCode::LDC_I4, Operand::Immediate(Immediate::Int32(value))),
            }
        }
    };
    (opcode, Operand::None)
}

/// Maps a short-form branch opcode to its long form.
///
/// Returns `None` for every other opcode, including long-form branches.
#[must_use]
pub fn widen_branch(opcode: OpCode) -> Option<OpCode> {
    BRANCH_PAIRS
        .iter()
        .find(|(short, _)| *short == opcode)
        .map(|(_, long)| *long)
}
