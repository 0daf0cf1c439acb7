//! Method body header and section flags (ECMA-335 II.25.4).

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method body header flags
    pub struct MethodBodyFlags: u16 {
        /// Tiny method header (code size in the upper six bits)
        const TINY_FORMAT = 0x2;
        /// Fat method header
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Zero-initialize all locals
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method data section flags
    pub struct SectionFlags: u8 {
        /// Exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Fat format, with 24-bit data size
        const FAT_FORMAT = 0x40;
        /// Another data section follows this one
        const MORE_SECTS = 0x80;
    }
}

/// Size of a fat method header in bytes.
pub const FAT_HEADER_SIZE: usize = 12;

/// Largest code size a tiny header can describe.
pub const TINY_MAX_CODE_SIZE: usize = 63;

/// Stack depth implied by a tiny header.
pub const TINY_MAX_STACK: u16 = 8;

/// Size of a small exception clause in bytes.
pub const SMALL_CLAUSE_SIZE: usize = 12;

/// Size of a fat exception clause in bytes.
pub const FAT_CLAUSE_SIZE: usize = 24;
