//! Expressions of the source design.
use crate::ast::TypeSpec;
use serde::Deserialize;
use strum_macros::Display;
use sv2rtl_utils::Id;

/// What a simple reference was bound to by the elaborator, when known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    #[default]
    Unknown,
    Net,
    Param,
    Interface,
}

/// Operators. The display form is the operator's source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    #[strum(serialize = "!")]
    LogicNot,
    #[strum(serialize = "~")]
    BitNeg,
    #[strum(serialize = "unary -")]
    Minus,
    #[strum(serialize = "unary +")]
    Plus,
    #[strum(serialize = "unary &")]
    ReductionAnd,
    #[strum(serialize = "unary ~&")]
    ReductionNand,
    #[strum(serialize = "unary |")]
    ReductionOr,
    #[strum(serialize = "unary ~|")]
    ReductionNor,
    #[strum(serialize = "unary ^")]
    ReductionXor,
    #[strum(serialize = "unary ~^")]
    ReductionXnor,
    #[strum(serialize = "&&")]
    LogicAnd,
    #[strum(serialize = "||")]
    LogicOr,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "~^")]
    BitXnor,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mult,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "**")]
    Power,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Neq,
    #[strum(serialize = "===")]
    CaseEq,
    #[strum(serialize = "!==")]
    CaseNeq,
    #[strum(serialize = "==?")]
    WildEq,
    #[strum(serialize = "!=?")]
    WildNeq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<<")]
    LShift,
    #[strum(serialize = ">>")]
    RShift,
    #[strum(serialize = "<<<")]
    ArithLShift,
    #[strum(serialize = ">>>")]
    ArithRShift,
    #[strum(serialize = "{}")]
    Concat,
    #[strum(serialize = "{{}}")]
    MultiConcat,
    #[strum(serialize = "?:")]
    Conditional,
}

impl OpKind {
    /// Number of operands the operator takes. `None` for variadic ones.
    pub fn arity(&self) -> Option<usize> {
        use OpKind::*;
        match self {
            LogicNot | BitNeg | Minus | Plus | ReductionAnd | ReductionNand
            | ReductionOr | ReductionNor | ReductionXor | ReductionXnor => {
                Some(1)
            }
            Conditional => Some(3),
            Concat | MultiConcat => None,
            _ => Some(2),
        }
    }

    /// Operators whose result is a single bit.
    pub fn is_boolean(&self) -> bool {
        use OpKind::*;
        matches!(
            self,
            LogicNot
                | LogicAnd
                | LogicOr
                | ReductionAnd
                | ReductionNand
                | ReductionOr
                | ReductionNor
                | ReductionXor
                | ReductionXnor
                | Eq
                | Neq
                | CaseEq
                | CaseNeq
                | WildEq
                | WildNeq
                | Lt
                | Le
                | Gt
                | Ge
        )
    }
}

/// Target of a cast expression.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CastTarget {
    /// `w'(e)`
    Width { width: Box<Expr> },
    /// `T'(e)`
    Type { typespec: TypeSpec },
    Signed,
    Unsigned,
}

/// Expression nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// A literal in `TAG:digits` form. `size` is the declared width, `0`
    /// for the natural width and `-1` for unsized literals.
    Constant {
        value: String,
        #[serde(default)]
        size: i64,
    },
    Ref {
        name: Id,
        #[serde(default)]
        actual: RefKind,
    },
    /// Dotted access such as `s.field` or `bus.data`.
    HierPath { name: Id },
    BitSelect { name: Id, index: Box<Expr> },
    PartSelect {
        name: Id,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `name[base +: width]` or `name[base -: width]`
    IndexedPartSelect {
        name: Id,
        base: Box<Expr>,
        width: Box<Expr>,
        #[serde(default)]
        descending: bool,
    },
    Operation { op: OpKind, operands: Vec<Expr> },
    Cast {
        target: CastTarget,
        operand: Box<Expr>,
    },
    SysFuncCall {
        name: Id,
        #[serde(default)]
        args: Vec<Expr>,
    },
    FuncCall {
        name: Id,
        #[serde(default)]
        package: Option<Id>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// A valid expression that lowering does not handle.
    Unsupported { what: String },
}

impl Expr {
    /// A sized signed integer literal.
    pub fn int(value: i64) -> Expr {
        Expr::Constant {
            value: format!("INT:{}", value),
            size: 0,
        }
    }

    pub fn reference<S: Into<Id>>(name: S) -> Expr {
        Expr::Ref {
            name: name.into(),
            actual: RefKind::Unknown,
        }
    }

    /// Name of the object this expression selects from, if any.
    pub fn base_name(&self) -> Option<Id> {
        match self {
            Expr::Ref { name, .. }
            | Expr::HierPath { name }
            | Expr::BitSelect { name, .. }
            | Expr::PartSelect { name, .. }
            | Expr::IndexedPartSelect { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::Constant { value, .. } => value.clone(),
            Expr::Ref { name, .. } | Expr::HierPath { name } => {
                name.to_string()
            }
            Expr::BitSelect { name, .. } => format!("{}[..]", name),
            Expr::PartSelect { name, .. }
            | Expr::IndexedPartSelect { name, .. } => {
                format!("{}[..:..]", name)
            }
            Expr::Operation { op, .. } => format!("operation `{}`", op),
            Expr::Cast { .. } => "cast".to_string(),
            Expr::SysFuncCall { name, .. } | Expr::FuncCall { name, .. } => {
                format!("call to `{}`", name)
            }
            Expr::Unsupported { what } => what.clone(),
        }
    }
}
