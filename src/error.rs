use std::path::PathBuf;

use thiserror::Error;

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

macro_rules! unresolved_error {
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::UnresolvedSymbol(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into two groups. The first group describes problems with the raw data this
/// crate reads (disk images, method bodies, instruction streams). The second group is the
/// hot-swap taxonomy: every failure a patch pass can run into while pairing, relinking and
/// activating a single function.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond buffer boundaries
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from goblin crate
///
/// ## Patch Pass Errors
/// - [`Error::ModuleParse`] - A disk module could not be opened or decoded
/// - [`Error::UnresolvedSymbol`] - A symbolic reference has no live counterpart
/// - [`Error::SignatureMismatch`] - A disk function has no matching live function
/// - [`Error::ActivationFailure`] - The redirection primitive refused a replacement
/// - [`Error::HostState`] - The host cannot support a pass at all
/// - [`Error::PassInProgress`] - A pass was requested while another one is running
///
/// # Examples
///
/// ```rust
/// use dotswap::Error;
///
/// fn describe(error: &Error) -> &'static str {
///     match error {
///         Error::UnresolvedSymbol(_) | Error::SignatureMismatch { .. } => "fix the source and retry",
///         Error::ModuleParse { .. } => "rebuild the module",
///         _ => "unexpected",
///     }
/// }
///
/// assert_eq!(describe(&Error::UnresolvedSymbol("Foo::Bar".into())), "fix the source and retry");
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // File parsing Errors
    /// The data is damaged and could not be parsed.
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

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    // Patch pass errors
    /// A disk module could not be read or decoded.
    ///
    /// Aborts the scan of that one module; the other modules of the pass proceed.
    #[error("Failed to parse module {path}: {source}")]
    ModuleParse {
        /// Path of the module file that failed
        path: PathBuf,
        /// The underlying failure
        source: Box<Error>,
    },

    /// A field, method or type reference has no live counterpart.
    ///
    /// Aborts relinking of the function that contains the reference.
    #[error("Unresolved symbol - {0}")]
    UnresolvedSymbol(String),

    /// A disk function has no structurally matching live function.
    #[error("No live counterpart for {type_name}::{method}")]
    SignatureMismatch {
        /// Full name of the declaring type
        type_name: String,
        /// Name of the disk function
        method: String,
    },

    /// The redirection primitive refused the replacement.
    #[error("Activation failed - {0}")]
    ActivationFailure(String),

    /// The host is in a state where no pass can run.
    #[error("Invalid host state - {0}")]
    HostState(String),

    /// A pass was requested while another pass is still running.
    #[error("A hot-swap pass is already in progress")]
    PassInProgress,
}

impl Error {
    /// Returns `true` for failures that only affect a single function.
    ///
    /// The orchestrator logs these and keeps scanning.
    #[must_use]
    pub fn is_function_local(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedSymbol(_)
                | Error::SignatureMismatch { .. }
                | Error::ActivationFailure(_)
                | Error::Malformed { .. }
                | Error::OutOfBounds
        )
    }
}
