// File: ./src/error.rs
// Domain errors raised by the occurrence and role modules.
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A role machine value outside the closed enumeration.
    #[error("invalid role: '{0}'")]
    InvalidRole(String),

    /// Query window whose start is after its end.
    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Stored role value that is not a JSON array of strings.
    #[error("invalid role encoding: {0}")]
    InvalidEncoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
