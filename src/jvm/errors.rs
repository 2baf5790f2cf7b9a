use std::fmt;

/// Errors produced while building or encoding a class
///
/// The categories matter to callers: numeric errors point at a literal that does not fit in its
/// field (so diagnostics can highlight the literal), while internal errors mean the assembler
/// itself was driven incorrectly and no amount of fixing the input will help.
#[derive(Debug)]
pub enum Error {
    /// Wrong operand shape, directive out of context, undefined or duplicate label, etc.
    Structural(String),

    /// An immediate, index, offset, or count exceeds the width of its field
    Numeric(String),

    /// Invariant of the assembler violated (eg. pool index requested before finalization)
    Internal(String),

    IoError(std::io::Error),
}

impl Error {
    pub fn structural<S: Into<String>>(message: S) -> Error {
        Error::Structural(message.into())
    }

    pub fn numeric<S: Into<String>>(message: S) -> Error {
        Error::Numeric(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Error {
        Error::Internal(message.into())
    }

    /// Does this error come from a value that doesn't fit in its field?
    pub fn is_numeric(&self) -> bool {
        matches!(self, Error::Numeric(_))
    }

    /// Is this error a bug in whatever is driving the assembler?
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

/// Check that the number of items in a table fits in its `u2` count
pub(crate) fn u16_count(len: usize, what: &str) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::numeric(format!("too many {} ({})", what, len)))
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Structural(msg) => f.write_str(msg),
            Error::Numeric(msg) => write!(f, "value out of range: {}", msg),
            Error::Internal(msg) => write!(f, "internal assembler error: {}", msg),
            Error::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
