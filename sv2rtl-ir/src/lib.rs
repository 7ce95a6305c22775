//! Internal representation of the lowered design.
//!
//! Modules are made of wires, cells, memories and processes that refer to
//! each other through `RRC` pointers. Bit-level values are expressed as
//! [`SigSpec`]s.

// Modules defining internal structures.
mod attribute;
mod common;
mod module;
mod process;
mod sigspec;
mod structure;

// Utilities
mod builder;
mod printer;

pub use attribute::{Attribute, Attributes, GetAttributes};
pub use builder::Builder;
pub use common::{RRC, rrc};
pub use module::{Design, IdList, Module};
pub use printer::Printer;
pub use process::{
    Action, CaseRule, Process, SwitchRule, SyncRule, SyncType,
};
pub use sigspec::{Const, ConstFlags, SigBit, SigChunk, SigMap, SigSpec, State};
pub use structure::{Cell, CellKind, Memory, Wire};

pub use sv2rtl_utils::{GetName, Id};
