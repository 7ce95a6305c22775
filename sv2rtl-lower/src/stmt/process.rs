//! `always` and `initial` blocks.
use super::{ProcState, written};
use crate::align::{Value, align};
use crate::clocking::{ClockingContext, SensitivityRule};
use crate::context::Lowerer;
use crate::expr::folded_value;
use crate::names::Resolved;
use crate::width::{TypeInfo, type_info};
use std::collections::HashMap;
use std::mem;
use sv2rtl_frontend::Expr;
use sv2rtl_frontend::ast::{self, Edge, ProcessKind, Stmt, VarDecl};
use sv2rtl_ir::{
    Attribute, CaseRule, Const, SigMap, SigSpec, State, SyncRule, SyncType,
};
use sv2rtl_utils::{Id, Sv2RtlResult};

/// First statement executed by `stmt`.
fn leading_stmt(stmt: &Stmt) -> Option<&Stmt> {
    match stmt {
        Stmt::Begin { stmts, .. } => stmts.first().and_then(leading_stmt),
        s => Some(s),
    }
}

fn flatten<'s>(stmt: &'s Stmt, out: &mut Vec<&'s Stmt>) {
    match stmt {
        Stmt::Begin { stmts, .. } => stmts.iter().for_each(|s| flatten(s, out)),
        s => out.push(s),
    }
}

impl Lowerer<'_> {
    /// Declare the variables of the blocks in `body`. Inside a function
    /// (`prefix` set) they become temporaries of the call, otherwise wires
    /// named after their block.
    pub(crate) fn declare_block_vars(
        &mut self,
        body: &Stmt,
        st: &mut ProcState,
        prefix: Option<Id>,
    ) -> HashMap<Id, Value> {
        let mut decls: Vec<(Option<Id>, &VarDecl)> = vec![];
        body.walk(&mut |s| {
            if let Stmt::Begin { name, decls: d, .. } = s {
                decls.extend(d.iter().map(|v| (*name, v)));
            }
        });
        let mut vars = HashMap::with_capacity(decls.len());
        for (block, decl) in decls {
            let info = type_info(&decl.typespec, &*self).unwrap_or(TypeInfo::vector(1));
            let sig = match prefix {
                Some(prefix) => {
                    self.temp_wire(st, format!("{}$\\{}", prefix, decl.name), &info)
                }
                None => {
                    let name = match block {
                        Some(block) => Id::from(format!("{}.{}", block, decl.name)),
                        None => decl.name,
                    };
                    let name = self.qualify(name);
                    SigSpec::from_wire(&self.declare_wire(name, &info, Some(&decl.typespec)))
                }
            };
            vars.insert(decl.name, Value::new(sig, info.signed));
        }
        vars
    }

    /// Value of a constant expression fitted to `width` bits.
    pub(crate) fn constant_of(&mut self, expr: &Expr, width: u32) -> Option<Const> {
        let v = match expr {
            Expr::Constant { .. } => self.lower_value(expr).ok()?,
            e => folded_value(self.fold(e)?),
        };
        align(&v, width).as_const()
    }

    /// Reset value of `q`: a constant assigned to it in the leading
    /// `if` of the block, x otherwise.
    fn reset_value(&mut self, body: &Stmt, q: &SigSpec) -> Const {
        let width = q.width();
        let undefined = Const::repeat(State::Sx, width);
        let Some(Stmt::If { then_stmt, .. }) = leading_stmt(body) else {
            return undefined;
        };
        let mut assigns = vec![];
        then_stmt.walk(&mut |s| {
            if let Stmt::Assign {
                lhs: lhs @ (Expr::Ref { .. } | Expr::HierPath { .. }),
                rhs,
                op: None,
                ..
            } = s
            {
                assigns.push((lhs, rhs));
            }
        });
        for (lhs, rhs) in assigns {
            let Some(name) = lhs.base_name() else {
                continue;
            };
            match self.lookup_name(name) {
                Some(Resolved::Wire(wire)) if q.is_wire(&wire) => {}
                _ => continue,
            }
            if let Some(c) = self.constant_of(rhs, width) {
                return c;
            }
        }
        undefined
    }

    /// Lower an `always` block into a process. Every written signal gets a
    /// `$0\` temporary that starts from the signal's current value and is
    /// copied back by the sync rules.
    pub(crate) fn lower_process(&mut self, proc: &ast::Process) -> Sv2RtlResult<()> {
        let mut g = self.enter_scope();
        g.set_loc(proc.loc.as_ref());
        if proc.kind == ProcessKind::Initial {
            return g.lower_initial(&proc.body);
        }

        let (sensitivity, body) = match &proc.body {
            Stmt::EventControl { sensitivity, body } => (sensitivity.as_slice(), body.as_ref()),
            body => (&[][..], body),
        };
        let mut edges = Vec::with_capacity(sensitivity.len());
        for entry in sensitivity {
            let sig = g.lower_expr(&entry.expr)?;
            edges.push((entry.edge, sig));
        }
        let clocked = edges.iter().any(|(edge, _)| *edge != Edge::Level);
        if proc.kind == ProcessKind::AlwaysFf && !clocked {
            g.warn("`always_ff` without an edge is lowered as combinational logic");
        }

        let mut st = ProcState::new(clocked.then(|| ClockingContext::analyze(&edges)));
        let vars = g.declare_block_vars(body, &mut st, None);
        g.scope.locals.push(vars);
        g.rvalue = SigMap::default();

        let mut names = vec![];
        let mut returns = false;
        written(body, false, &mut names, &mut returns);
        let targets = g.target_wires(&names, false, &st);
        let mut updates = Vec::with_capacity(targets.len());
        for wire in &targets {
            let sig = SigSpec::from_wire(wire);
            let name = format!("$0\\{}", wire.borrow().name);
            let temp = g.temp_wire(&mut st, name, &TypeInfo::vector(sig.width()));
            st.root_init.push((temp.clone(), sig.clone()));
            st.subst_lvalue.add(&sig, &temp);
            updates.push((sig, temp));
        }

        let mut root = CaseRule::default();
        g.compile_stmt(body, &mut root, &mut st)?;
        let mut actions = mem::take(&mut st.root_init);
        actions.append(&mut root.actions);
        root.actions = actions;

        let mut syncs = vec![];
        match &st.clocking {
            None => {
                let mut sync = SyncRule::always();
                sync.actions = updates;
                syncs.push(sync);
            }
            Some(ctx) => {
                for wire in &targets {
                    wire.borrow_mut().attributes.set_bool(Attribute::Reg);
                }
                if g.conf.register_cells {
                    for (q, d) in &updates {
                        if ctx.has_reset() {
                            let value = g.reset_value(body, q);
                            g.add_adff(ctx, d, q, value)?;
                        } else {
                            g.add_dff(ctx, d, q)?;
                        }
                    }
                } else {
                    for ((edge, sig), rule) in edges.iter().zip(&ctx.applied) {
                        let ty = match (edge, rule) {
                            (Edge::Posedge, _) => SyncType::Posedge,
                            (Edge::Negedge, _) => SyncType::Negedge,
                            (Edge::Level, Some(SensitivityRule::LevelReset)) => SyncType::High,
                            (Edge::Level, _) => {
                                g.warn("level entry in an edge-sensitive list is ignored");
                                continue;
                            }
                        };
                        let mut sync = SyncRule::new(ty, sig.clone());
                        sync.actions = updates.clone();
                        syncs.push(sync);
                    }
                }
            }
        }

        let name = g.module.auto_name("proc");
        let process = g.module.add_process(name);
        {
            let mut p = process.borrow_mut();
            p.attributes.set_src(g.src());
            p.root_case = root;
            p.syncs = syncs;
        }
        g.rvalue = SigMap::default();
        Ok(())
    }

    /// `initial` blocks only set power-on values of whole signals.
    fn lower_initial(&mut self, body: &Stmt) -> Sv2RtlResult<()> {
        let mut stmts = vec![];
        flatten(body, &mut stmts);
        for stmt in stmts {
            match stmt {
                Stmt::Assign {
                    lhs: Expr::Ref { name, .. } | Expr::HierPath { name },
                    rhs,
                    op: None,
                    ..
                } => {
                    let Resolved::Wire(wire) = self.resolve_name(*name) else {
                        self.warn(format!("initial value of `{}` is ignored", name));
                        continue;
                    };
                    let width = wire.borrow().width;
                    match self.constant_of(rhs, width) {
                        Some(c) => wire.borrow_mut().attributes.insert(Attribute::Init, c),
                        None => {
                            self.warn(format!("initial value of `{}` is not constant", name))
                        }
                    }
                }
                Stmt::Null => {}
                _ => self.warn("unsupported statement in initial block"),
            }
        }
        Ok(())
    }
}
