//! Which functions call which.
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;
use sv2rtl_frontend::ast::{self, FunctionDef, ModuleDef, Stmt};
use sv2rtl_frontend::expr::CastTarget;
use sv2rtl_frontend::Expr;
use sv2rtl_utils::Id;

/// Call graph over the functions visible from one module. Used to name
/// recursive functions in diagnostics.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraphMap<Id, ()>,
    recursive: HashSet<Id>,
}

impl CallGraph {
    /// Build the graph over the functions of `def` and of every package.
    pub fn build(design: &ast::Design, def: &ModuleDef) -> Self {
        let funcs = design
            .packages
            .iter()
            .flat_map(|p| p.functions.iter())
            .chain(def.functions.iter());
        Self::from_functions(funcs)
    }

    pub fn from_functions<'a, I>(funcs: I) -> Self
    where
        I: IntoIterator<Item = &'a FunctionDef>,
    {
        let mut graph = DiGraphMap::new();
        for func in funcs {
            graph.add_node(func.name);
            let mut callees = vec![];
            func.variables
                .iter()
                .filter_map(|v| v.init.as_ref())
                .for_each(|e| calls_in_expr(e, &mut callees));
            calls_in_stmt(&func.body, &mut callees);
            for callee in callees {
                graph.add_edge(func.name, callee, ());
            }
        }

        let mut recursive = HashSet::new();
        for scc in tarjan_scc(&graph) {
            if scc.len() > 1 || graph.contains_edge(scc[0], scc[0]) {
                recursive.extend(scc);
            }
        }
        Self { graph, recursive }
    }

    /// Is `name` part of a call cycle?
    pub fn is_recursive(&self, name: Id) -> bool {
        self.recursive.contains(&name)
    }

    /// Functions called directly by `name`.
    pub fn callees(&self, name: Id) -> Vec<Id> {
        if !self.graph.contains_node(name) {
            return vec![];
        }
        self.graph.neighbors(name).collect()
    }
}

fn calls_in_stmt(stmt: &Stmt, out: &mut Vec<Id>) {
    stmt.walk(&mut |s| match s {
        Stmt::Assign { lhs, rhs, .. } => {
            calls_in_expr(lhs, out);
            calls_in_expr(rhs, out);
        }
        Stmt::Begin { decls, .. } => decls
            .iter()
            .filter_map(|d| d.init.as_ref())
            .for_each(|e| calls_in_expr(e, out)),
        Stmt::If { cond, .. } => calls_in_expr(cond, out),
        Stmt::Case { cond, items, .. } => {
            calls_in_expr(cond, out);
            items
                .iter()
                .flat_map(|i| i.exprs.iter())
                .for_each(|e| calls_in_expr(e, out));
        }
        Stmt::For { decls, cond, .. } => {
            decls
                .iter()
                .filter_map(|d| d.init.as_ref())
                .for_each(|e| calls_in_expr(e, out));
            if let Some(c) = cond {
                calls_in_expr(c, out);
            }
        }
        Stmt::Return { value: Some(v) } => calls_in_expr(v, out),
        Stmt::EventControl { .. }
        | Stmt::Return { value: None }
        | Stmt::Null
        | Stmt::Unsupported { .. } => (),
    });
}

fn calls_in_expr(expr: &Expr, out: &mut Vec<Id>) {
    match expr {
        Expr::FuncCall { name, args, .. } => {
            out.push(*name);
            args.iter().for_each(|a| calls_in_expr(a, out));
        }
        Expr::SysFuncCall { args, .. } => {
            args.iter().for_each(|a| calls_in_expr(a, out))
        }
        Expr::Operation { operands, .. } => {
            operands.iter().for_each(|a| calls_in_expr(a, out))
        }
        Expr::Cast { target, operand } => {
            if let CastTarget::Width { width } = target {
                calls_in_expr(width, out);
            }
            calls_in_expr(operand, out);
        }
        Expr::BitSelect { index, .. } => calls_in_expr(index, out),
        Expr::PartSelect { left, right, .. } => {
            calls_in_expr(left, out);
            calls_in_expr(right, out);
        }
        Expr::IndexedPartSelect { base, width, .. } => {
            calls_in_expr(base, out);
            calls_in_expr(width, out);
        }
        Expr::Constant { .. }
        | Expr::Ref { .. }
        | Expr::HierPath { .. }
        | Expr::Unsupported { .. } => (),
    }
}
