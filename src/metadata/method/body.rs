//! Representation, parsing and encoding of CIL method bodies.
//!
//! A [`MethodBody`] holds the decoded header fields, the symbolic instruction stream and the
//! exception handler regions of one method. Rewrite rules edit it in place through
//! [`MethodBody::insert`], [`MethodBody::insert_before`], [`MethodBody::replace`] and
//! [`MethodBody::remove`], all of which keep branch targets and handler regions attached to
//! the right instructions. [`MethodBody::layout`] then recomputes offsets and widens short
//! branches, and [`MethodBody::encode`] picks the smallest header and exception section
//! format that fits.
//!
//! # Examples
//!
//! ```rust
//! use cilcompat::assembly::{Instruction, OpCode};
//! use cilcompat::metadata::{method::MethodBody, scope::ReferenceScope};
//!
//! let scope = ReferenceScope::new();
//! let mut body = MethodBody::decode(&[0x06, 0x2A], &scope)?;
//! assert_eq!(body.instructions.len(), 1);
//!
//! body.insert(0, Instruction::simple(OpCode::NOP)?)?;
//! body.layout()?;
//! assert_eq!(body.encode(&scope)?, vec![0x0A, 0x00, 0x2A]);
//! # Ok::<(), cilcompat::Error>(())
//! ```
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use crate::{
    assembly::{
        decoder::{decode_stream, index_of_offset},
        encoder::{compute_offsets, encode_stream, layout_stream, LayoutStats},
        Instruction,
    },
    file::io::{read_le, read_le_at, write_le, write_le_u24},
    metadata::{
        method::{
            types::{FAT_CLAUSE_SIZE, FAT_HEADER_SIZE, SMALL_CLAUSE_SIZE, TINY_MAX_CODE_SIZE, TINY_MAX_STACK},
            ExceptionHandler, ExceptionHandlerFlags, MethodBodyFlags, SectionFlags,
        },
        scope::{SymbolEmitter, SymbolResolver},
        token::Token,
    },
    Error::{Empty, OutOfBounds},
    Result,
};

/// An exception clause as encoded, with byte offsets.
struct RawClause {
    flags: ExceptionHandlerFlags,
    try_offset: u32,
    try_length: u32,
    handler_offset: u32,
    handler_length: u32,
    class_or_filter: u32,
}

/// Describes one method that has been compiled to CIL bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Maximum number of items on the operand stack
    pub max_stack: u16,
    /// Token of the signature describing the local variables; null if there are none
    pub local_var_sig_token: Token,
    /// Whether locals are zero-initialized
    pub init_locals: bool,
    /// The instruction stream
    pub instructions: Vec<Instruction>,
    /// Exception handling regions, in clause order
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Creates a body without locals or exception handlers.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        MethodBody {
            max_stack: TINY_MAX_STACK,
            local_var_sig_token: Token::new(0),
            init_locals: false,
            instructions,
            exception_handlers: Vec::new(),
        }
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the body has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Decodes a method body starting at its header.
    ///
    /// # Arguments
    /// * `data` - The bytes of the body, header first
    /// * `resolver` - Resolves operand and catch-type tokens
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::OutOfBounds`] if the
    /// header announces more data than provided, and [`crate::Error::Malformed`] for invalid
    /// headers, code, or exception regions not on instruction boundaries.
    pub fn decode(data: &[u8], resolver: &dyn SymbolResolver) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(Empty);
        }

        let first_byte = read_le::<u8>(data)?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_00000011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                let code = data.get(1..=size_code).ok_or(OutOfBounds)?;

                Ok(MethodBody::new(decode_stream(code, resolver)?))
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < FAT_HEADER_SIZE {
                    return Err(OutOfBounds);
                }

                let mut cursor = 0_usize;
                let first_duo = read_le_at::<u16>(data, &mut cursor)?;
                let max_stack = read_le_at::<u16>(data, &mut cursor)?;
                let size_code = read_le_at::<u32>(data, &mut cursor)? as usize;
                let local_var_sig_token = Token::new(read_le_at::<u32>(data, &mut cursor)?);

                let size_header = usize::from(first_duo >> 12) * 4;
                if size_header < FAT_HEADER_SIZE {
                    return Err(malformed_error!("Fat header declares {} bytes", size_header));
                }
                let code_end = size_header.checked_add(size_code).ok_or(OutOfBounds)?;
                let code = data.get(size_header..code_end).ok_or(OutOfBounds)?;
                let instructions = decode_stream(code, resolver)?;

                let flags_header = MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000111111111111_u16);

                // Exception Handling -> II.25.4.6
                let mut exception_handlers = Vec::new();
                if flags_header.contains(MethodBodyFlags::MORE_SECTS) {
                    let clauses = read_sections(data, (code_end + 3) & !3)?;
                    let code_size =
                        u32::try_from(size_code).map_err(|_| malformed_error!("Code size exceeds 32 bits"))?;
                    for clause in clauses {
                        exception_handlers.push(resolve_clause(&clause, &instructions, code_size, resolver)?);
                    }
                }

                Ok(MethodBody {
                    max_stack,
                    local_var_sig_token,
                    init_locals: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    instructions,
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Returns `true` if the body can be encoded with a one-byte tiny header.
    fn fits_tiny_header(&self, code_size: usize) -> bool {
        code_size <= TINY_MAX_CODE_SIZE
            && self.max_stack <= TINY_MAX_STACK
            && self.local_var_sig_token.is_null()
            && !self.init_locals
            && self.exception_handlers.is_empty()
    }

    /// Encodes the body, header first.
    ///
    /// A tiny header is used whenever the body qualifies; exception clauses use the small
    /// format when every clause fits it. Branch displacements must already fit their
    /// encoding, so call [`MethodBody::layout`] after editing.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if [`MethodBody::validate`] fails or a branch
    /// does not fit, plus any error of the emitter.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self, emitter: &dyn SymbolEmitter) -> Result<Vec<u8>> {
        self.validate()?;

        let code = encode_stream(&self.instructions, emitter)?;
        if self.fits_tiny_header(code.len()) {
            let mut data = Vec::with_capacity(code.len() + 1);
            // code.len() <= 63, checked by fits_tiny_header
            data.push(((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8);
            data.extend_from_slice(&code);
            return Ok(data);
        }

        let mut flags = MethodBodyFlags::FAT_FORMAT;
        if self.init_locals {
            flags |= MethodBodyFlags::INIT_LOCALS;
        }
        if !self.exception_handlers.is_empty() {
            flags |= MethodBodyFlags::MORE_SECTS;
        }

        let size_code = u32::try_from(code.len()).map_err(|_| structural_error!("method code exceeds 4 GiB"))?;
        let mut data = Vec::with_capacity(FAT_HEADER_SIZE + code.len());
        write_le(&mut data, flags.bits() | (3 << 12));
        write_le(&mut data, self.max_stack);
        write_le(&mut data, size_code);
        write_le(&mut data, self.local_var_sig_token.value());
        data.extend_from_slice(&code);

        if !self.exception_handlers.is_empty() {
            while data.len() % 4 != 0 {
                data.push(0);
            }
            self.write_exception_section(&mut data, emitter)?;
        }

        Ok(data)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_exception_section(&self, data: &mut Vec<u8>, emitter: &dyn SymbolEmitter) -> Result<()> {
        let offsets = compute_offsets(&self.instructions)?;
        let mut clauses = Vec::with_capacity(self.exception_handlers.len());
        for handler in &self.exception_handlers {
            let class_or_filter = if handler.flags.contains(ExceptionHandlerFlags::FILTER) {
                handler.filter_start.map_or(0, |start| offsets[start])
            } else if handler.flags == ExceptionHandlerFlags::EXCEPTION {
                match &handler.catch_type {
                    Some(catch_type) => emitter.type_token(catch_type)?.value(),
                    None => return Err(structural_error!("typed exception clause without a catch type")),
                }
            } else {
                0
            };

            clauses.push(RawClause {
                flags: handler.flags,
                try_offset: offsets[handler.try_start],
                try_length: offsets[handler.try_end] - offsets[handler.try_start],
                handler_offset: offsets[handler.handler_start],
                handler_length: offsets[handler.handler_end] - offsets[handler.handler_start],
                class_or_filter,
            });
        }

        let small_size = 4 + clauses.len() * SMALL_CLAUSE_SIZE;
        let fits_small = small_size <= usize::from(u8::MAX)
            && clauses.iter().all(|clause| {
                clause.try_offset <= u32::from(u16::MAX)
                    && clause.try_length <= u32::from(u8::MAX)
                    && clause.handler_offset <= u32::from(u16::MAX)
                    && clause.handler_length <= u32::from(u8::MAX)
            });

        // the truncating casts below are guarded by fits_small
        if fits_small {
            data.push(SectionFlags::EHTABLE.bits());
            data.push(small_size as u8);
            write_le(data, 0_u16);
            for clause in &clauses {
                write_le(data, clause.flags.bits());
                write_le(data, clause.try_offset as u16);
                write_le(data, clause.try_length as u8);
                write_le(data, clause.handler_offset as u16);
                write_le(data, clause.handler_length as u8);
                write_le(data, clause.class_or_filter);
            }
        } else {
            let fat_size = u32::try_from(4 + clauses.len() * FAT_CLAUSE_SIZE)
                .ok()
                .filter(|size| *size <= 0x00FF_FFFF)
                .ok_or_else(|| structural_error!("too many exception clauses"))?;
            data.push((SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits());
            write_le_u24(data, fat_size);
            for clause in &clauses {
                write_le(data, u32::from(clause.flags.bits()));
                write_le(data, clause.try_offset);
                write_le(data, clause.try_length);
                write_le(data, clause.handler_offset);
                write_le(data, clause.handler_length);
                write_le(data, clause.class_or_filter);
            }
        }

        Ok(())
    }

    /// Checks that every operand fits its opcode and every branch and region stays inside
    /// the body.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let len = self.instructions.len();
        for (index, instruction) in self.instructions.iter().enumerate() {
            if !instruction.is_well_formed() {
                return Err(structural_error!(
                    "instruction {} ({}) has an operand of the wrong kind: {:?}",
                    index,
                    instruction.opcode,
                    instruction.operand
                ));
            }
            if let Some(target) = instruction.branch_targets().into_iter().find(|target| *target >= len) {
                return Err(structural_error!(
                    "instruction {} ({}) branches to #{}, outside a body of {} instructions",
                    index,
                    instruction.opcode,
                    target,
                    len
                ));
            }
        }

        for (index, handler) in self.exception_handlers.iter().enumerate() {
            let valid = handler.try_start < handler.try_end
                && handler.try_end <= len
                && handler.handler_start < handler.handler_end
                && handler.handler_end <= len
                && handler.filter_start.map_or(true, |start| start < len);
            if !valid {
                return Err(structural_error!("exception clause {} has an invalid region: {:?}", index, handler));
            }
            if handler.flags.contains(ExceptionHandlerFlags::FILTER) && handler.filter_start.is_none() {
                return Err(structural_error!("filter clause {} has no filter", index));
            }
        }

        Ok(())
    }

    /// Recomputes instruction offsets and widens short branches that no longer reach.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if a branch cannot be encoded at all.
    pub fn layout(&mut self) -> Result<LayoutStats> {
        layout_stream(&mut self.instructions)
    }

    fn check_insertable(&self, instruction: &Instruction) -> Result<()> {
        if instruction.is_well_formed() {
            Ok(())
        } else {
            Err(structural_error!(
                "cannot insert {} with operand {:?}",
                instruction.opcode,
                instruction.operand
            ))
        }
    }

    /// Inserts `instruction` at `index`, shifting later instructions.
    ///
    /// Branches and regions keep referring to the instructions they referred to before, so a
    /// branch to the old instruction at `index` skips the inserted one.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if `index` is past the end or the instruction
    /// is not well formed.
    pub fn insert(&mut self, index: usize, instruction: Instruction) -> Result<()> {
        if index > self.instructions.len() {
            return Err(structural_error!("insert at #{} past the end of the body", index));
        }
        self.check_insertable(&instruction)?;

        let shift = |i: usize| if i >= index { i + 1 } else { i };
        for existing in &mut self.instructions {
            existing.remap_targets(shift);
        }
        for handler in &mut self.exception_handlers {
            handler.remap(shift, |end| if end > index { end + 1 } else { end });
        }

        self.instructions.insert(index, instruction);
        Ok(())
    }

    /// Inserts `instruction` in front of the instruction at `index`, taking over its role as
    /// branch target.
    ///
    /// Branches to `index`, and regions starting at `index`, now begin with the inserted
    /// instruction. This is how code injected in front of a call site (such as argument
    /// loads) stays on every path reaching the call.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if there is no instruction at `index` or
    /// the instruction is not well formed.
    pub fn insert_before(&mut self, index: usize, instruction: Instruction) -> Result<()> {
        if index >= self.instructions.len() {
            return Err(structural_error!("no instruction at #{} to insert before", index));
        }
        self.check_insertable(&instruction)?;

        let shift = |i: usize| if i > index { i + 1 } else { i };
        for existing in &mut self.instructions {
            existing.remap_targets(shift);
        }
        for handler in &mut self.exception_handlers {
            handler.remap(shift, shift);
        }

        self.instructions.insert(index, instruction);
        Ok(())
    }

    /// Replaces the instruction at `index`, returning the old one.
    ///
    /// Branches to `index` now reach the replacement.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if there is no instruction at `index` or
    /// the replacement is not well formed.
    pub fn replace(&mut self, index: usize, instruction: Instruction) -> Result<Instruction> {
        self.check_insertable(&instruction)?;
        let Some(slot) = self.instructions.get_mut(index) else {
            return Err(structural_error!("no instruction at #{} to replace", index));
        };

        let mut instruction = instruction;
        instruction.offset = slot.offset;
        Ok(std::mem::replace(slot, instruction))
    }

    /// Removes the instruction at `index`, returning it.
    ///
    /// Branches to the removed instruction fall through to its successor.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if there is no instruction at `index`, if
    /// the last instruction is removed while something branches to it, or if a region would
    /// become empty.
    pub fn remove(&mut self, index: usize) -> Result<Instruction> {
        let len = self.instructions.len();
        if index >= len {
            return Err(structural_error!("no instruction at #{} to remove", index));
        }

        let is_last = index + 1 == len;
        if is_last
            && self
                .instructions
                .iter()
                .any(|instruction| instruction.branch_targets().contains(&index))
        {
            return Err(structural_error!("cannot remove the last instruction while it is a branch target"));
        }
        for handler in &self.exception_handlers {
            let empties_try = handler.try_start == index && handler.try_end == index + 1;
            let empties_handler = handler.handler_start == index && handler.handler_end == index + 1;
            let loses_filter = is_last && handler.filter_start == Some(index);
            if empties_try || empties_handler || loses_filter {
                return Err(structural_error!("removing #{} would empty an exception region", index));
            }
        }

        let shift = |i: usize| if i > index { i - 1 } else { i };
        for existing in &mut self.instructions {
            existing.remap_targets(shift);
        }
        for handler in &mut self.exception_handlers {
            handler.remap(shift, shift);
        }

        Ok(self.instructions.remove(index))
    }
}

fn read_sections(data: &[u8], start: usize) -> Result<Vec<RawClause>> {
    let mut clauses = Vec::new();
    let mut cursor = start;

    loop {
        let section_flags = SectionFlags::from_bits_truncate(read_le::<u8>(data.get(cursor..).ok_or(OutOfBounds)?)?);
        if !section_flags.contains(SectionFlags::EHTABLE) {
            break;
        }

        if section_flags.contains(SectionFlags::FAT_FORMAT) {
            let size = (read_le::<u32>(&data[cursor..])? >> 8) as usize;
            if size < 4 || data.len() < cursor + size {
                return Err(OutOfBounds);
            }
            let mut at = cursor + 4;
            for _ in 0..(size - 4) / FAT_CLAUSE_SIZE {
                // flags occupy the low 16 bits of a 32-bit field
                #[allow(clippy::cast_possible_truncation)]
                let flags = ExceptionHandlerFlags::from_bits_truncate(read_le_at::<u32>(data, &mut at)? as u16);
                clauses.push(RawClause {
                    flags,
                    try_offset: read_le_at::<u32>(data, &mut at)?,
                    try_length: read_le_at::<u32>(data, &mut at)?,
                    handler_offset: read_le_at::<u32>(data, &mut at)?,
                    handler_length: read_le_at::<u32>(data, &mut at)?,
                    class_or_filter: read_le_at::<u32>(data, &mut at)?,
                });
            }
            cursor += size;
        } else {
            let size = usize::from(read_le::<u8>(data.get(cursor + 1..).ok_or(OutOfBounds)?)?);
            if size < 4 || data.len() < cursor + size {
                return Err(OutOfBounds);
            }
            let mut at = cursor + 4;
            for _ in 0..(size - 4) / SMALL_CLAUSE_SIZE {
                clauses.push(RawClause {
                    flags: ExceptionHandlerFlags::from_bits_truncate(read_le_at::<u16>(data, &mut at)?),
                    try_offset: u32::from(read_le_at::<u16>(data, &mut at)?),
                    try_length: u32::from(read_le_at::<u8>(data, &mut at)?),
                    handler_offset: u32::from(read_le_at::<u16>(data, &mut at)?),
                    handler_length: u32::from(read_le_at::<u8>(data, &mut at)?),
                    class_or_filter: read_le_at::<u32>(data, &mut at)?,
                });
            }
            cursor += size;
        }

        if !section_flags.contains(SectionFlags::MORE_SECTS) {
            break;
        }
        cursor = (cursor + 3) & !3;
    }

    Ok(clauses)
}

fn resolve_clause(
    clause: &RawClause,
    instructions: &[Instruction],
    code_size: u32,
    resolver: &dyn SymbolResolver,
) -> Result<ExceptionHandler> {
    let index = |offset: u32| {
        index_of_offset(instructions, offset, code_size).ok_or_else(|| {
            malformed_error!("Exception region boundary {:#x} is not an instruction boundary", offset)
        })
    };
    let end = |offset: u32, length: u32| {
        offset
            .checked_add(length)
            .ok_or_else(|| malformed_error!("Exception region overflows"))
            .and_then(index)
    };

    let catch_type = if clause.flags == ExceptionHandlerFlags::EXCEPTION {
        Some(resolver.resolve_type(Token::new(clause.class_or_filter))?)
    } else {
        None
    };
    let filter_start = if clause.flags.contains(ExceptionHandlerFlags::FILTER) {
        Some(index(clause.class_or_filter)?)
    } else {
        None
    };

    Ok(ExceptionHandler {
        flags: clause.flags,
        try_start: index(clause.try_offset)?,
        try_end: end(clause.try_offset, clause.try_length)?,
        handler_start: index(clause.handler_offset)?,
        handler_end: end(clause.handler_offset, clause.handler_length)?,
        catch_type,
        filter_start,
    })
}
