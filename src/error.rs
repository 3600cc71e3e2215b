use thiserror::Error;

use crate::machine::{Register, VarId};

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

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors are only produced while building or verifying the machine representation of a
/// function. The history calculation itself treats a broken instruction stream as a contract
/// violation and panics instead; a tripped invariant there points at a bug in an earlier
/// compiler pass, not at bad input that a caller could recover from.
///
/// # Error Categories
///
/// ## Representation Errors
/// - [`Error::Malformed`] - The function or a computed history violates a structural rule
/// - [`Error::RegisterOutOfRange`] - An operand names a register the target does not know
/// - [`Error::UnknownVariable`] - A debug value refers to a variable that was never declared
/// - [`Error::NoBlock`] - An instruction was emitted before any block was started
///
/// # Examples
///
/// ```rust
/// use dbghistory::{Error, machine::FunctionBuilder};
///
/// let mut builder = FunctionBuilder::new("broken");
/// match builder.op("nop", &[]) {
///     Err(Error::NoBlock) => println!("start a block first"),
///     Err(e) => println!("other error: {}", e),
///     Ok(_) => println!("appended"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The function or history is structurally invalid.
    ///
    /// The error includes the source location where the problem was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A register id is not covered by the target's register info.
    #[error("Register {register} is out of range (target has {num_regs} registers)")]
    RegisterOutOfRange {
        /// The offending register
        register: Register,
        /// Number of registers the target describes
        num_regs: usize,
    },

    /// A debug value refers to a variable missing from the function's variable table.
    #[error("Unknown debug variable - {0}")]
    UnknownVariable(VarId),

    /// An instruction was appended before any block was started.
    #[error("No block to append the instruction to")]
    NoBlock,
}
