//! State threaded through the lowering of one module.
use crate::LowerConf;
use crate::align::Value;
use crate::call_graph::CallGraph;
use crate::const_eval::{FunctionTable, Interpreter, Limits};
use crate::names::{Resolved, SignalTable};
use crate::packages::PackageTables;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use sv2rtl_frontend::ast::{self, FunctionDef, ModuleDef, TypeSpec};
use sv2rtl_frontend::eval::reduce_expr;
use sv2rtl_frontend::{ConstEnv, Expr, Folded};
use sv2rtl_ir::{self as ir, Builder, SigMap};
use sv2rtl_utils::{Error, Id, SourceLoc};

/// Bindings that are saved and restored around nested scopes.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeState {
    /// Enclosing generate blocks, outermost first.
    pub gen_path: Vec<Id>,
    /// Module, generate-scope and loop-variable parameters.
    pub params: HashMap<Id, Folded>,
    /// Variables of active function calls, innermost last.
    pub locals: Vec<HashMap<Id, Value>>,
    pub call_depth: usize,
    /// Location of the construct being lowered.
    pub loc: Option<SourceLoc>,
}

/// Lowers the contents of one module definition into an [ir::Module].
pub struct Lowerer<'a> {
    pub(crate) design: &'a ast::Design,
    pub(crate) def: &'a ModuleDef,
    pub(crate) packages: &'a PackageTables<'a>,
    pub(crate) conf: &'a LowerConf,
    pub(crate) module: ir::Module,
    pub(crate) signals: SignalTable,
    pub(crate) scope: ScopeState,
    /// Values of signals assigned by blocking assignments earlier in the
    /// current process.
    pub(crate) rvalue: SigMap,
    /// Module-level typedefs.
    pub(crate) typedefs: HashMap<Id, TypeSpec>,
    pub(crate) calls: CallGraph,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        design: &'a ast::Design,
        def: &'a ModuleDef,
        packages: &'a PackageTables<'a>,
        conf: &'a LowerConf,
    ) -> Self {
        Self {
            design,
            def,
            packages,
            conf,
            module: ir::Module::new(def.name),
            signals: SignalTable::default(),
            scope: ScopeState::default(),
            rvalue: SigMap::default(),
            typedefs: HashMap::new(),
            calls: CallGraph::build(design, def),
        }
    }

    /// Save the scope state. It is restored when the guard is dropped.
    pub fn enter_scope(&mut self) -> ScopeGuard<'_, 'a> {
        let saved = self.scope.clone();
        ScopeGuard {
            lowerer: self,
            saved: Some(saved),
        }
    }

    /// Record the location of the construct being lowered.
    pub(crate) fn set_loc(&mut self, loc: Option<&SourceLoc>) {
        if let Some(loc) = loc {
            self.scope.loc = Some(loc.clone());
        }
    }

    pub(crate) fn src(&self) -> Option<&SourceLoc> {
        if self.conf.keep_src {
            self.scope.loc.as_ref()
        } else {
            None
        }
    }

    /// Builder for cells at the current location.
    pub(crate) fn builder(&mut self) -> Builder<'_> {
        let src = if self.conf.keep_src {
            self.scope.loc.clone()
        } else {
            None
        };
        Builder::new(&mut self.module).with_src(src.as_ref())
    }

    /// Warn about the construct being lowered.
    pub(crate) fn warn<S: std::fmt::Display>(&self, msg: S) {
        match &self.scope.loc {
            Some(loc) => log::warn!("{}: {}", loc, msg),
            None => log::warn!("{}", msg),
        }
    }

    /// Fatal error at the current location.
    pub(crate) fn fatal<S: ToString>(&self, msg: S) -> Error {
        Error::fatal(msg).with_loc(self.scope.loc.as_ref())
    }

    pub(crate) fn fold(&self, expr: &Expr) -> Option<Folded> {
        reduce_expr(expr, self)
    }

    pub(crate) fn fold_int(&self, expr: &Expr) -> Option<i64> {
        self.fold(expr).map(|v| v.value)
    }

    pub(crate) fn limits(&self) -> Limits {
        Limits::from(self.conf)
    }

    pub(crate) fn is_local(&self, name: Id) -> bool {
        self.scope.locals.iter().any(|frame| frame.contains_key(&name))
    }

    /// Function visible under `name`: module functions first, then
    /// package functions.
    pub(crate) fn find_function(
        &self,
        name: Id,
        package: Option<Id>,
    ) -> Option<&'a FunctionDef> {
        match package {
            Some(_) => self.packages.function(name, package),
            None => self
                .def
                .find_function(name)
                .or_else(|| self.packages.function(name, None)),
        }
    }

    /// Consume the lowerer and return the finished module.
    pub fn finish(mut self) -> ir::Module {
        self.module.fixup_ports();
        self.module
    }
}

impl ConstEnv for Lowerer<'_> {
    fn lookup(&self, name: Id) -> Option<Folded> {
        if self.is_local(name) {
            return None;
        }
        self.scope
            .params
            .get(&name)
            .copied()
            .or_else(|| self.packages.param(name))
    }

    fn call(
        &self,
        name: Id,
        package: Option<Id>,
        args: &[Folded],
    ) -> Option<Folded> {
        let func = self.find_function(name, package)?;
        Interpreter::new(self, self, self.limits())
            .at_depth(self.scope.call_depth)
            .call(func, args)
    }

    fn typedef(&self, name: Id, package: Option<Id>) -> Option<TypeSpec> {
        if package.is_none() {
            if let Some(ts) = self.typedefs.get(&name) {
                return Some(ts.clone());
            }
        }
        self.packages.typedef(name, package).cloned()
    }

    fn width_of(&self, name: Id) -> Option<u64> {
        match self.lookup_name(name)? {
            Resolved::Wire(w) => Some(w.borrow().width as u64),
            Resolved::Value(v) => Some(v.width() as u64),
            Resolved::Memory(m) => {
                let m = m.borrow();
                Some(m.width as u64 * m.size as u64)
            }
        }
    }
}

impl FunctionTable for Lowerer<'_> {
    fn function(&self, name: Id, package: Option<Id>) -> Option<&FunctionDef> {
        self.find_function(name, package)
    }
}

/// Restores the scope state of a [Lowerer] when dropped.
pub struct ScopeGuard<'l, 'a> {
    lowerer: &'l mut Lowerer<'a>,
    saved: Option<ScopeState>,
}

impl<'a> Deref for ScopeGuard<'_, 'a> {
    type Target = Lowerer<'a>;

    fn deref(&self) -> &Self::Target {
        self.lowerer
    }
}

impl DerefMut for ScopeGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.lowerer
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.lowerer.scope = saved;
        }
    }
}
