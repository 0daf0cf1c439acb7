//! CIL instruction model and the instruction-level codec.
//!
//! This module turns raw method code into editable, symbolic instructions and back:
//!
//! - [`crate::assembly::opcodes`] - the ECMA-335 opcode table
//! - [`crate::assembly::Instruction`] - opcode plus symbolic operand
//! - [`crate::assembly::codec`] - classification and synthesis helpers used by rewrite rules
//! - [`crate::assembly::decoder`] - bytes to instructions, tokens to descriptors
//! - [`crate::assembly::encoder`] - layout with branch widening, instructions to bytes
//!
//! # Examples
//!
//! ```rust
//! use cilcompat::assembly::{decoder::decode_stream, encoder::encode_stream, OpCode};
//! use cilcompat::metadata::scope::ReferenceScope;
//!
//! let scope = ReferenceScope::new();
//! let instructions = decode_stream(&[0x16, 0x2A], &scope)?;
//! assert_eq!(instructions[0].opcode, OpCode::LDC_I4_0);
//!
//! let code = encode_stream(&instructions, &scope)?;
//! assert_eq!(code, vec![0x16, 0x2A]);
//! # Ok::<(), cilcompat::Error>(())
//! ```

pub mod codec;
pub mod decoder;
pub mod encoder;
mod instruction;
pub mod opcodes;

pub use instruction::{FlowType, Immediate, Instruction, Operand, OperandType};
pub use opcodes::{OpCode, OpCodeInfo};
