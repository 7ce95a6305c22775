//! Shared utilities for the sv2rtl compiler.
mod errors;
mod id;
mod namegenerator;
mod out_file;
mod position;

mod math;

pub use errors::{Error, ErrorKind, Sv2RtlResult};
pub use id::{GetName, Id};
pub use math::{bits_needed_for, clog2};
pub use namegenerator::NameGenerator;
pub use out_file::OutputFile;
pub use position::{SourceLoc, WithLoc};
