//! Cursor over a borrowed byte slice.
//!
//! The [`Parser`] is the decoder's view of a method body's code bytes. It tracks a position,
//! reads little-endian primitives through [`crate::file::io`] and reports
//! [`crate::Error::OutOfBounds`] instead of panicking when the code is truncated.

use crate::{
    file::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// A position-tracking reader over a byte slice.
///
/// # Examples
///
/// ```rust
/// use cilcompat::Parser;
///
/// let data = [0x20, 0x2A, 0x00, 0x00, 0x00];
/// let mut parser = Parser::new(&data);
///
/// assert_eq!(parser.read_le::<u8>()?, 0x20);
/// assert_eq!(parser.read_le::<i32>()?, 42);
/// assert!(!parser.has_more_data());
/// # Ok::<(), cilcompat::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the buffer is allowed; reading from there is not.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn parser_reads_and_tracks_position() {
        let data = [0x01, 0x02, 0x00, 0x03];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.len(), 4);
        assert!(!parser.is_empty());
        assert_eq!(parser.read_le::<u8>().unwrap(), 0x01);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0002);
        assert_eq!(parser.pos(), 3);
        assert_eq!(parser.remaining(), 1);
        assert!(parser.has_more_data());
    }

    #[test]
    fn parser_seek_bounds() {
        let data = [0x00, 0x01];
        let mut parser = Parser::new(&data);

        parser.seek(2).unwrap();
        assert!(!parser.has_more_data());
        assert!(matches!(parser.read_le::<u8>(), Err(Error::OutOfBounds)));
        assert!(matches!(parser.seek(3), Err(Error::OutOfBounds)));

        parser.seek(1).unwrap();
        assert_eq!(parser.read_le::<u8>().unwrap(), 0x01);
    }

    #[test]
    fn parser_empty() {
        let parser = Parser::new(&[]);
        assert!(parser.is_empty());
        assert!(!parser.has_more_data());
        assert_eq!(parser.remaining(), 0);
    }
}
