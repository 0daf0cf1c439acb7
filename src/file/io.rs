//! Little-endian, bounds-checked reading and writing of primitive values.
//!
//! Method bodies are encoded little-endian throughout (ECMA-335 II.25.4), so this module only
//! carries the little-endian half of a byte-order toolkit. Reads never panic: running off the
//! end of a buffer yields [`crate::Error::OutOfBounds`]. Writes append to an owned buffer,
//! which is how the encoder builds a fresh body instead of patching bytes in place.
//!
//! # Key Components
//!
//! - [`crate::file::io::CilIO`] - Conversion between primitives and their byte arrays
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::write_le`] - Append a value to a byte buffer
//!
//! # Examples
//!
//! ```rust,ignore
//! use cilcompat::file::io::{read_le_at, write_le};
//!
//! let mut buffer = Vec::new();
//! write_le(&mut buffer, 0x1234_u16);
//! write_le(&mut buffer, -1_i32);
//!
//! let mut offset = 0;
//! assert_eq!(read_le_at::<u16>(&buffer, &mut offset)?, 0x1234);
//! assert_eq!(read_le_at::<i32>(&buffer, &mut offset)?, -1);
//! assert_eq!(offset, 6);
//! # Ok::<(), cilcompat::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitives that can be read from and written to little-endian byte buffers.
///
/// # Thread Safety
///
/// All implementations are pure conversions without shared state.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`.
///
/// The offset is advanced by the number of bytes read.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Appends `value` to `buffer` in little-endian byte order.
pub fn write_le<T: CilIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends the low 24 bits of `value` to `buffer`, as used by fat section headers.
pub fn write_le_u24(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes()[..3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn read_le_primitives() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

        assert_eq!(read_le::<u8>(&data).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&data).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&data).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&data).unwrap(), 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_le_at_advances() {
        let data = [0xFF, 0x7F, 0x00, 0x00, 0x80, 0x3F];
        let mut offset = 0;

        assert_eq!(read_le_at::<i8>(&data, &mut offset).unwrap(), -1);
        assert_eq!(offset, 1);
        assert_eq!(read_le_at::<u8>(&data, &mut offset).unwrap(), 0x7F);

        let mut offset = 2;
        assert_eq!(read_le_at::<f32>(&data, &mut offset).unwrap(), 1.0);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_le_out_of_bounds() {
        let data = [0x01, 0x02, 0x03];
        assert!(matches!(read_le::<u32>(&data), Err(Error::OutOfBounds)));

        let mut offset = 2;
        assert!(matches!(
            read_le_at::<u16>(&data, &mut offset),
            Err(Error::OutOfBounds)
        ));
        // a failed read leaves the offset untouched
        assert_eq!(offset, 2);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&data, &mut offset).is_err());
    }

    #[test]
    fn write_le_appends() {
        let mut buffer = vec![0xAA];
        write_le(&mut buffer, 0x0102_u16);
        write_le(&mut buffer, -2_i32);
        write_le(&mut buffer, 2.5_f64);

        assert_eq!(&buffer[..7], &[0xAA, 0x02, 0x01, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(buffer.len(), 15);

        let mut offset = 7;
        assert_eq!(read_le_at::<f64>(&buffer, &mut offset).unwrap(), 2.5);
    }

    #[test]
    fn write_le_u24_truncates() {
        let mut buffer = Vec::new();
        write_le_u24(&mut buffer, 0xAABB_CCDD);
        assert_eq!(buffer, vec![0xDD, 0xCC, 0xBB]);
    }
}
