use crate::jvm;
use std::fmt;

/// Error recorded while assembling, along with the source line that caused it
#[derive(Debug)]
pub struct Diagnostic {
    /// `None` for errors that only come up once the whole class is being serialized
    pub line: Option<usize>,
    pub error: jvm::Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// Every error found in the directives (there is always at least one)
    Assembly(Vec<Diagnostic>),
    BytecodeGen(jvm::Error),
    IoError(std::io::Error),
}

impl Error {
    /// Number of distinct errors reported
    pub fn error_count(&self) -> usize {
        match self {
            Error::Assembly(diagnostics) => diagnostics.len(),
            _ => 1,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Assembly(diagnostics) => {
                for (i, diagnostic) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", diagnostic)?;
                }
                Ok(())
            }
            Error::BytecodeGen(err) => err.fmt(f),
            Error::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        match err {
            jvm::Error::IoError(err) => Error::IoError(err),
            err => Error::BytecodeGen(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
