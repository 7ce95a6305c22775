//! Lowering of elaborated designs into the RTLIL representation.
//!
//! The entry point is [lower_design]. Every module definition is lowered by
//! a [Lowerer] that owns the target module being built together with the
//! name table and the scope state threaded through expression and
//! statement lowering.
mod align;
mod call_graph;
mod clocking;
mod conf;
mod const_decode;
mod const_eval;
mod context;
mod design;
mod expr;
mod function;
mod import;
mod names;
mod packages;
mod stmt;
mod struct_path;
mod width;

pub use align::{Value, align, align_pair};
pub use call_graph::CallGraph;
pub use clocking::{ClockingContext, SensitivityRule};
pub use conf::LowerConf;
pub use const_decode::decode_constant;
pub use const_eval::{FunctionTable, Interpreter, Limits};
pub use context::{Lowerer, ScopeGuard};
pub use design::{find_top, lower_design, lower_module};
pub use names::{Resolved, SignalTable};
pub use packages::PackageTables;
pub use struct_path::struct_member_slice;
pub use width::{TypeInfo, WIDTH_BUNDLE, resolve_type, type_info, type_width};
