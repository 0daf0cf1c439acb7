use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! structural_error {
    ($fmt:expr) => {
        crate::Error::StructuralDefect($fmt.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::StructuralDefect(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Expected "no match" outcomes are never errors: the matcher answers `false` and the codec
/// answers `None`. This enum is reserved for the conditions that make a method body (or the
/// whole mod binary) unusable, and for contract violations.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid method body bytes
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::UnresolvedToken`] - A metadata token could not be resolved to a symbol
///
/// ## Rewrite Errors
/// - [`Error::StructuralDefect`] - The instruction stream is inconsistent and cannot be patched
/// - [`Error::Incompatible`] - The binary references host symbols that no rule could fix
///
/// ## Facade Errors
/// - [`Error::FacadeConstructed`] - A facade's declared constructor was invoked
/// - [`Error::FacadeMismatch`] - A facade member was dispatched on the wrong receiver or arguments
///
/// # Examples
///
/// ```rust
/// use cilcompat::{facades::{RewriteFacade, WorldDateFacade}, Error};
///
/// match WorldDateFacade::new() {
///     Err(Error::FacadeConstructed(name)) => println!("{name} is a rewrite target only"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The method body is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a method body.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// A metadata token did not resolve to a symbol of the kind its opcode requires.
    #[error("Failed to resolve token - {0}")]
    UnresolvedToken(Token),

    /// The instruction stream cannot be patched safely.
    ///
    /// Raised when an operand does not match its opcode, a branch points outside the body,
    /// or a branch offset overflows even after widening. A binary containing such a body
    /// must be rejected as a whole rather than loaded partially patched.
    #[error("Structural defect - {0}")]
    StructuralDefect(String),

    /// The declared constructor of a facade type was invoked.
    ///
    /// Facades only exist as link targets injected by the rewriter; their instances are
    /// always created by substitution over an existing host object.
    #[error("The constructor of {0} is only intended for the rewriter and should never be called at runtime")]
    FacadeConstructed(&'static str),

    /// A facade member was dispatched with a receiver or arguments it does not accept.
    #[error("{0}")]
    FacadeMismatch(String),

    /// The binary references host symbols which no rewrite rule could adapt.
    #[error("Incompatible - {0}")]
    Incompatible(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
