pub mod annotation;
pub mod detect;
pub mod fasta;
pub mod ipg;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Malformed XML: {0}")]
    Xml(String),
}

/// Kind of body returned by an E-utilities request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Fasta,
    IpgXml,
    ErrorMessage,
    Empty,
    Unknown,
}
