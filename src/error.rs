use std::{error, fmt};

use crate::source::ShapeError;

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by phonate.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    InvalidParameter(String),
    InvalidPreset(String),
    SourceModelNotFound(String),
    FormantNotFound(usize),
    NumericDomainError(String),
    SendError(String),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(str) => write!(f, "Invalid parameter: {str}"),
            Self::InvalidPreset(str) => write!(f, "Invalid preset: {str}"),
            Self::SourceModelNotFound(name) => {
                write!(f, "Glottal source model '{name}' not found")
            }
            Self::FormantNotFound(index) => write!(f, "Formant with index {index} not found"),
            Self::NumericDomainError(str) => write!(f, "Numeric domain error: {str}"),
            Self::SendError(str) => write!(f, "Failed to send channel message: {str}"),
        }
    }
}

impl From<ShapeError> for Error {
    fn from(err: ShapeError) -> Self {
        Error::NumericDomainError(err.to_string())
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for Error {
    fn from(err: crossbeam_channel::SendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}

impl<T> From<crossbeam_channel::TrySendError<T>> for Error {
    fn from(err: crossbeam_channel::TrySendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}
