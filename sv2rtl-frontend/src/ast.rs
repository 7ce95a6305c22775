//! Abstract Syntax Tree for elaborated SystemVerilog designs.
//!
//! The tree is produced by an external parser/elaborator and read from its
//! JSON serialization. Node kinds are tagged with a `kind` field.
use crate::expr::{Expr, OpKind};
use serde::Deserialize;
use sv2rtl_utils::{Id, SourceLoc, WithLoc};

/// A complete elaborated design.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Design {
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub modules: Vec<ModuleDef>,
    /// Name of the top-level module, when the elaborator knows it.
    #[serde(default)]
    pub top: Option<Id>,
}

impl Design {
    pub fn find_module(&self, name: Id) -> Option<&ModuleDef> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn find_package(&self, name: Id) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Find an interface definition by name.
    pub fn find_interface(&self, name: Id) -> Option<&ModuleDef> {
        self.find_module(name)
            .filter(|m| m.kind == ModuleKind::Interface)
    }
}

/// Package scope: parameters, types and functions shared between modules.
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub name: Id,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub typedefs: Vec<TypedefDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    #[default]
    Module,
    Interface,
}

/// Definition of a module or an interface.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDef {
    pub name: Id,
    #[serde(default)]
    pub kind: ModuleKind,
    #[serde(default)]
    pub ports: Vec<PortDecl>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub typedefs: Vec<TypedefDecl>,
    #[serde(default)]
    pub nets: Vec<NetDecl>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub gen_scopes: Vec<GenScope>,
    #[serde(default)]
    pub cont_assigns: Vec<ContAssign>,
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

impl ModuleDef {
    pub fn find_port(&self, name: Id) -> Option<&PortDecl> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn find_net(&self, name: Id) -> Option<&NetDecl> {
        self.nets.iter().find(|n| n.name == name)
    }

    pub fn find_instance(&self, name: Id) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn find_function(&self, name: Id) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Type of a port or net declared directly in this module.
    pub fn member_type(&self, name: Id) -> Option<&TypeSpec> {
        self.find_port(name)
            .map(|p| &p.typespec)
            .or_else(|| self.find_net(name).map(|n| &n.typespec))
    }
}

impl WithLoc for ModuleDef {
    fn loc(&self) -> Option<&SourceLoc> {
        self.loc.as_ref()
    }
}

/// A named generate block. Its contents are visible under `name.` from the
/// enclosing scope.
#[derive(Debug, Clone, Deserialize)]
pub struct GenScope {
    pub name: Id,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub nets: Vec<NetDecl>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub gen_scopes: Vec<GenScope>,
    #[serde(default)]
    pub cont_assigns: Vec<ContAssign>,
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
    Inout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortDecl {
    pub name: Id,
    pub direction: Direction,
    #[serde(default)]
    pub typespec: TypeSpec,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetKind {
    Wire,
    #[default]
    Logic,
    Reg,
}

/// A net or variable. Unpacked dimensions make it a memory.
#[derive(Debug, Clone, Deserialize)]
pub struct NetDecl {
    pub name: Id,
    #[serde(default)]
    pub kind: NetKind,
    #[serde(default)]
    pub typespec: TypeSpec,
    #[serde(default)]
    pub unpacked: Vec<Range>,
    #[serde(default)]
    pub init: Option<Expr>,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamDecl {
    pub name: Id,
    pub value: Expr,
    #[serde(default)]
    pub typespec: Option<TypeSpec>,
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypedefDecl {
    pub name: Id,
    pub typespec: TypeSpec,
}

/// A `left:right` range. Bounds are expressions folded during lowering.
#[derive(Debug, Clone, Deserialize)]
pub struct Range {
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntKind {
    Bit,
    Byte,
    Shortint,
    Int,
    Longint,
    Integer,
}

impl IntKind {
    pub fn width(&self) -> u64 {
        match self {
            IntKind::Bit => 1,
            IntKind::Byte => 8,
            IntKind::Shortint => 16,
            IntKind::Int | IntKind::Integer => 32,
            IntKind::Longint => 64,
        }
    }
}

/// Type descriptors.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpec {
    /// `logic`, `reg`, `wire` or `bit` with packed dimensions.
    Logic {
        #[serde(default)]
        ranges: Vec<Range>,
        #[serde(default)]
        signed: bool,
    },
    /// Built-in integer atom types.
    Int {
        int_kind: IntKind,
        #[serde(default)]
        unsigned: bool,
    },
    Struct {
        members: Vec<StructMember>,
        #[serde(default = "yes")]
        packed: bool,
    },
    Enum {
        #[serde(default = "TypeSpec::int")]
        base: Box<TypeSpec>,
        items: Vec<EnumItem>,
    },
    /// An interface instance or interface port.
    Interface {
        name: Id,
        #[serde(default)]
        modport: Option<Id>,
    },
    /// A reference to a named type. `actual` is the direct link when the
    /// elaborator resolved it; otherwise the name is looked up in the
    /// package and module type tables.
    Alias {
        name: Id,
        #[serde(default)]
        package: Option<Id>,
        #[serde(default)]
        actual: Option<Box<TypeSpec>>,
    },
}

fn yes() -> bool {
    true
}

impl Default for TypeSpec {
    fn default() -> Self {
        TypeSpec::Logic {
            ranges: vec![],
            signed: false,
        }
    }
}

impl TypeSpec {
    /// The `int` type.
    pub fn int() -> Box<TypeSpec> {
        Box::new(TypeSpec::Int {
            int_kind: IntKind::Int,
            unsigned: false,
        })
    }

    /// A `logic [width-1:0]` vector.
    pub fn vector(width: u64) -> TypeSpec {
        TypeSpec::Logic {
            ranges: vec![Range {
                left: Expr::int(width as i64 - 1),
                right: Expr::int(0),
            }],
            signed: false,
        }
    }

    /// Declared signedness, without following aliases.
    pub fn is_signed(&self) -> bool {
        match self {
            TypeSpec::Logic { signed, .. } => *signed,
            TypeSpec::Int { int_kind, unsigned } => {
                !unsigned && *int_kind != IntKind::Bit
            }
            TypeSpec::Enum { base, .. } => base.is_signed(),
            TypeSpec::Alias {
                actual: Some(actual),
                ..
            } => actual.is_signed(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructMember {
    pub name: Id,
    pub typespec: TypeSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumItem {
    pub name: Id,
    #[serde(default)]
    pub value: Option<Expr>,
}

/// Module or interface instantiation.
#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    pub name: Id,
    pub module: Id,
    #[serde(default)]
    pub params: Vec<ParamAssign>,
    #[serde(default)]
    pub connections: Vec<PortConn>,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamAssign {
    pub name: Id,
    pub value: Expr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortConn {
    pub port: Id,
    #[serde(default)]
    pub expr: Option<Expr>,
}

/// `assign lhs = rhs;`
#[derive(Debug, Clone, Deserialize)]
pub struct ContAssign {
    pub lhs: Expr,
    pub rhs: Expr,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Always,
    AlwaysComb,
    AlwaysFf,
    AlwaysLatch,
    Initial,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Process {
    pub kind: ProcessKind,
    pub body: Stmt,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

impl WithLoc for Process {
    fn loc(&self) -> Option<&SourceLoc> {
        self.loc.as_ref()
    }
}

/// A variable declaration inside a function or block.
#[derive(Debug, Clone, Deserialize)]
pub struct VarDecl {
    pub name: Id,
    #[serde(default)]
    pub typespec: TypeSpec,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IoDecl {
    pub name: Id,
    pub direction: Direction,
    #[serde(default)]
    pub typespec: TypeSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDef {
    pub name: Id,
    #[serde(default)]
    pub return_type: TypeSpec,
    #[serde(default)]
    pub io: Vec<IoDecl>,
    #[serde(default)]
    pub variables: Vec<VarDecl>,
    pub body: Stmt,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    #[default]
    Case,
    Casez,
    Casex,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseItem {
    /// Labels of this item. No labels means `default`.
    #[serde(default)]
    pub exprs: Vec<Expr>,
    pub body: Stmt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    #[default]
    Level,
    Posedge,
    Negedge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventEntry {
    #[serde(default)]
    pub edge: Edge,
    pub expr: Expr,
}

/// Procedural statements.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    /// Blocking (`=`) or non-blocking (`<=`) assignment. `op` is set for
    /// compound assignments such as `+=`.
    Assign {
        lhs: Expr,
        rhs: Expr,
        #[serde(default)]
        op: Option<OpKind>,
        #[serde(default = "yes")]
        blocking: bool,
    },
    Begin {
        #[serde(default)]
        name: Option<Id>,
        #[serde(default)]
        decls: Vec<VarDecl>,
        #[serde(default)]
        stmts: Vec<Stmt>,
    },
    If {
        cond: Expr,
        then_stmt: Box<Stmt>,
        #[serde(default)]
        else_stmt: Option<Box<Stmt>>,
    },
    Case {
        #[serde(default)]
        case_kind: CaseKind,
        cond: Expr,
        items: Vec<CaseItem>,
    },
    For {
        #[serde(default)]
        decls: Vec<VarDecl>,
        #[serde(default)]
        init: Vec<Stmt>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        incr: Vec<Stmt>,
        body: Box<Stmt>,
    },
    /// `@(...) body`
    EventControl {
        sensitivity: Vec<EventEntry>,
        body: Box<Stmt>,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    Null,
    /// A valid statement that lowering does not handle.
    Unsupported { what: String },
}

impl Stmt {
    /// Visit this statement and every statement nested in it, pre-order.
    pub fn walk<'s, F>(&'s self, f: &mut F)
    where
        F: FnMut(&'s Stmt),
    {
        f(self);
        match self {
            Stmt::Begin { stmts, .. } => {
                stmts.iter().for_each(|s| s.walk(f));
            }
            Stmt::If {
                then_stmt,
                else_stmt,
                ..
            } => {
                then_stmt.walk(f);
                if let Some(e) = else_stmt {
                    e.walk(f);
                }
            }
            Stmt::Case { items, .. } => {
                items.iter().for_each(|i| i.body.walk(f));
            }
            Stmt::For {
                init, incr, body, ..
            } => {
                init.iter().for_each(|s| s.walk(f));
                body.walk(f);
                incr.iter().for_each(|s| s.walk(f));
            }
            Stmt::EventControl { body, .. } => body.walk(f),
            Stmt::Assign { .. }
            | Stmt::Return { .. }
            | Stmt::Null
            | Stmt::Unsupported { .. } => {}
        }
    }
}
