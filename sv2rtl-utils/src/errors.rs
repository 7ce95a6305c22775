//! Errors generated by the compiler.
use crate::{Id, SourceLoc};
use thiserror::Error;

/// Convenience wrapper to represent success or meaningful compiler error.
pub type Sv2RtlResult<T> = std::result::Result<T, Error>;

/// Errors generated by the compiler. The kind is boxed to keep results small.
pub struct Error {
    kind: Box<ErrorKind>,
    loc: Option<SourceLoc>,
}

/// The kinds of errors the compiler can report.
#[derive(Error, Debug)]
pub enum ErrorKind {
    /// The design cannot be lowered any further.
    #[error("{0}")]
    Fatal(String),
    /// A name that must be defined was not.
    #[error("undefined {typ} `{name}`")]
    Undefined { name: Id, typ: String },
    /// The input design violates a structural assumption.
    #[error("malformed design: {0}")]
    MalformedDesign(String),
    /// Could not read or parse an input file.
    #[error("invalid file: {0}")]
    InvalidFile(String),
    /// Could not write the output.
    #[error("failed to write output: {0}")]
    WriteError(String),
    #[error("{0}")]
    Misc(String),
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            loc: None,
        }
    }

    pub fn with_loc(mut self, loc: Option<&SourceLoc>) -> Self {
        if self.loc.is_none() {
            self.loc = loc.cloned();
        }
        self
    }

    pub fn fatal<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Fatal(msg.to_string()))
    }

    pub fn undefined<S: ToString>(name: Id, typ: S) -> Self {
        Self::new(ErrorKind::Undefined {
            name,
            typ: typ.to_string(),
        })
    }

    pub fn malformed_design<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::MalformedDesign(msg.to_string()))
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidFile(msg.to_string()))
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::WriteError(msg.to_string()))
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Misc(msg.to_string()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&SourceLoc> {
        self.loc.as_ref()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{}: {}", loc, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Print errors the same way in `main`'s result as everywhere else.
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::write_error(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::write_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_file(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_prefixes_message() {
        let err = Error::fatal("no clock").with_loc(Some(&SourceLoc::new(
            "a.sv", 3, 1,
        )));
        assert_eq!(err.to_string(), "a.sv:3.1-3.1: no clock");
        assert!(matches!(err.kind(), ErrorKind::Fatal(_)));
    }

    #[test]
    fn first_location_wins() {
        let err = Error::misc("x")
            .with_loc(Some(&SourceLoc::new("a.sv", 1, 1)))
            .with_loc(Some(&SourceLoc::new("b.sv", 2, 2)));
        assert_eq!(err.location().map(|l| l.file), Some(Id::from("a.sv")));
    }
}
