// Domain Error Types

use std::num::ParseIntError;
use thiserror::Error;

/// Why a single mount table line could not be turned into a `MountEntry`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Too few fields ({count}) in mount table line {line:?}")]
    TooFewFields { count: usize, line: String },

    #[error("Too many fields ({count}) in mount table line {line:?}")]
    TooManyFields { count: usize, line: String },

    #[error("Invalid {field} {value:?}: expected an unsigned decimal number")]
    InvalidNumber {
        field: &'static str,
        value: String,
        /// Absent when the text was rejected before integer parsing (signs, blanks)
        #[source]
        source: Option<ParseIntError>,
    },
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid mount spec: {0}")]
    InvalidMountSpec(String),

    #[error("Mount table parse error: {0}")]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, DomainError>;
