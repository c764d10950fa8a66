//! Centralized error handling for the generator. Every failure mode in the
//! pipeline maps onto one variant of [`Error`]; all of them are fatal to the
//! current `generate` call and none are retried.

use crate::Id;
use thiserror::Error;

/// Alias for results produced by the generator.
pub type UcodeResult<T = ()> = Result<T, Error>;

/// An error raised while building or emitting a machine description.
#[derive(Error, Debug)]
pub enum Error {
    /// The description used a name that is not defined.
    #[error("undefined {kind} `{name}`")]
    Undefined { name: Id, kind: &'static str },

    /// The description bound the same name twice.
    #[error("{kind} `{name}` is already defined")]
    AlreadyBound { name: Id, kind: &'static str },

    /// A bus constant does not fit on the 8-bit system bus.
    #[error("constant {0} does not fit on the 8-bit system bus")]
    InvalidConstant(u64),

    /// A name cannot be used as a VHDL identifier.
    #[error("`{0}` is not a valid VHDL identifier")]
    InvalidIdentifier(Id),

    /// The in-memory machine description violates an invariant of the
    /// generator itself. Seeing this is a bug in the generator, not in the
    /// machine description.
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    /// Failure while writing an output artifact. Partially written files
    /// must be considered invalid.
    #[error("write error: {0}")]
    WriteError(String),

    /// A miscellaneous error with no structured information.
    #[error("{0}")]
    Misc(String),
}

impl Error {
    pub fn undefined(name: Id, kind: &'static str) -> Self {
        Error::Undefined { name, kind }
    }

    pub fn already_bound(name: Id, kind: &'static str) -> Self {
        Error::AlreadyBound { name, kind }
    }

    pub fn invalid_constant(value: u64) -> Self {
        Error::InvalidConstant(value)
    }

    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Error::MalformedStructure(msg.to_string())
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Error::WriteError(msg.to_string())
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Error::Misc(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::WriteError(err.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::WriteError(err.to_string())
    }
}
