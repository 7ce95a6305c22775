//! Frontend AST representation.
//!
//! Defines the source AST of an elaborated design together with the
//! elaboration-time helpers lowering relies on: literal decoding, constant
//! folding and hierarchical name decoding.

pub mod ast;
pub mod eval;
pub mod expr;
pub mod hier;
pub mod literal;

mod workspace;

pub use ast::{Design, ModuleDef, Stmt, TypeSpec};
pub use eval::{ConstEnv, Folded};
pub use expr::{Expr, OpKind};
