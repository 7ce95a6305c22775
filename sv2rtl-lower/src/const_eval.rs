//! Compile-time evaluation of function calls.
//!
//! Functions are interpreted over a map from variable names to folded
//! integers. The return value lives in the variable named after the
//! function. Anything that cannot be evaluated makes the whole call fail so
//! that the caller falls back to generating logic.
use crate::LowerConf;
use crate::width::resolve_type;
use std::collections::HashMap;
use sv2rtl_frontend::ast::{Direction, FunctionDef, Stmt, TypeSpec, VarDecl};
use sv2rtl_frontend::eval::{indexed_range, reduce_expr, size_of};
use sv2rtl_frontend::{ConstEnv, Expr, Folded};
use sv2rtl_utils::Id;

/// Function definitions visible to a call.
pub trait FunctionTable {
    fn function(&self, name: Id, package: Option<Id>) -> Option<&FunctionDef>;
}

/// Bounds on interpretation.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_iterations: u64,
    pub max_depth: usize,
}

impl From<&LowerConf> for Limits {
    fn from(conf: &LowerConf) -> Self {
        Self {
            max_iterations: conf.max_loop_iterations,
            max_depth: conf.max_call_depth,
        }
    }
}

/// Evaluates calls against an outer environment of parameters and types.
#[derive(Clone, Copy)]
pub struct Interpreter<'e> {
    env: &'e dyn ConstEnv,
    funcs: &'e dyn FunctionTable,
    limits: Limits,
    depth: usize,
}

impl<'e> Interpreter<'e> {
    pub fn new(
        env: &'e dyn ConstEnv,
        funcs: &'e dyn FunctionTable,
        limits: Limits,
    ) -> Self {
        Self {
            env,
            funcs,
            limits,
            depth: 0,
        }
    }

    /// Start counting nested calls from `depth`.
    pub fn at_depth(self, depth: usize) -> Self {
        Self { depth, ..self }
    }

    /// Evaluate `func` applied to `args`. Returns `None` when the call does
    /// not fold.
    pub fn call(&self, func: &FunctionDef, args: &[Folded]) -> Option<Folded> {
        if self.depth >= self.limits.max_depth {
            log::warn!(
                "call depth limit of {} reached while evaluating `{}`",
                self.limits.max_depth,
                func.name
            );
            return None;
        }
        // Functions with outputs have side effects on the caller.
        if func.io.iter().any(|io| io.direction != Direction::Input) {
            return None;
        }
        if func.io.len() != args.len() {
            log::debug!(
                "`{}` expects {} arguments, got {}",
                func.name,
                func.io.len(),
                args.len()
            );
            return None;
        }

        let mut frame = Frame {
            interp: self,
            func: func.name,
            vars: HashMap::new(),
            widths: HashMap::new(),
        };
        let (width, signed) = frame.declare(func.name, &func.return_type);
        for (io, arg) in func.io.iter().zip(args) {
            frame.declare(io.name, &io.typespec);
            frame.set(io.name, *arg);
        }
        for var in &func.variables {
            frame.declare_var(var)?;
        }
        frame.exec(&func.body)?;
        let result = frame.vars.get(&func.name)?;
        Some(result.resize(width).with_sign(signed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Return,
}

/// Saved state of a shadowed variable.
type Shadowed = (Id, Option<Folded>, Option<(u32, bool)>);

/// Variables of one active call.
struct Frame<'i, 'e> {
    interp: &'i Interpreter<'e>,
    func: Id,
    vars: HashMap<Id, Folded>,
    widths: HashMap<Id, (u32, bool)>,
}

impl Frame<'_, '_> {
    /// Record the declared width and sign of `name`. Two-state integer
    /// types start out as zero.
    fn declare(&mut self, name: Id, ts: &TypeSpec) -> (u32, bool) {
        let resolved = resolve_type(ts, &*self);
        let width = size_of(&resolved, &*self).unwrap_or(32).clamp(1, 64) as u32;
        let signed = resolved.is_signed();
        self.widths.insert(name, (width, signed));
        self.vars.remove(&name);
        if let TypeSpec::Int { .. } = resolved {
            self.vars.insert(name, Folded::new(0, width, signed));
        }
        (width, signed)
    }

    fn declare_var(&mut self, var: &VarDecl) -> Option<()> {
        self.declare(var.name, &var.typespec);
        if let Some(init) = &var.init {
            let v = reduce_expr(init, &*self)?;
            self.set(var.name, v);
        }
        Some(())
    }

    fn set(&mut self, name: Id, value: Folded) {
        let value = match self.widths.get(&name) {
            Some((w, s)) => value.resize(*w).with_sign(*s),
            None => value,
        };
        self.vars.insert(name, value);
    }

    /// Current value of a variable for a partial update. Unassigned
    /// variables read as zero.
    fn current(&self, name: Id) -> Option<Folded> {
        self.vars.get(&name).copied().or_else(|| {
            self.widths.get(&name).map(|(w, s)| Folded::new(0, *w, *s))
        })
    }

    fn shadow(&mut self, decls: &[VarDecl]) -> Option<Vec<Shadowed>> {
        let mut saved = Vec::with_capacity(decls.len());
        for d in decls {
            saved.push((
                d.name,
                self.vars.get(&d.name).copied(),
                self.widths.get(&d.name).copied(),
            ));
            self.declare_var(d)?;
        }
        Some(saved)
    }

    fn restore(&mut self, saved: Vec<Shadowed>) {
        for (name, value, width) in saved.into_iter().rev() {
            match value {
                Some(v) => self.vars.insert(name, v),
                None => self.vars.remove(&name),
            };
            match width {
                Some(w) => self.widths.insert(name, w),
                None => self.widths.remove(&name),
            };
        }
    }

    fn exec(&mut self, stmt: &Stmt) -> Option<Flow> {
        match stmt {
            Stmt::Assign { lhs, rhs, op, .. } => {
                let value = match op {
                    Some(op) => {
                        let expr = Expr::Operation {
                            op: *op,
                            operands: vec![lhs.clone(), rhs.clone()],
                        };
                        reduce_expr(&expr, &*self)?
                    }
                    None => reduce_expr(rhs, &*self)?,
                };
                self.assign(lhs, value)?;
                Some(Flow::Next)
            }
            Stmt::Begin { decls, stmts, .. } => {
                let saved = self.shadow(decls)?;
                let mut flow = Some(Flow::Next);
                for s in stmts {
                    flow = self.exec(s);
                    if flow != Some(Flow::Next) {
                        break;
                    }
                }
                self.restore(saved);
                flow
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                if reduce_expr(cond, &*self)?.is_true() {
                    self.exec(then_stmt)
                } else if let Some(e) = else_stmt {
                    self.exec(e)
                } else {
                    Some(Flow::Next)
                }
            }
            Stmt::Case { cond, items, .. } => {
                let subject = reduce_expr(cond, &*self)?;
                let labels = items
                    .iter()
                    .map(|item| {
                        item.exprs
                            .iter()
                            .map(|e| reduce_expr(e, &*self))
                            .collect::<Option<Vec<_>>>()
                    })
                    .collect::<Option<Vec<_>>>()?;
                // Subject and labels compare at their common width and sign.
                let all = || labels.iter().flatten().chain([&subject]);
                let width = all().map(|v| v.width).max().unwrap_or(1);
                let signed = all().all(|v| v.signed);
                let key = |v: &Folded| v.with_sign(signed).resize(width).bits();
                let value = key(&subject);
                let mut default = None;
                for (item, labels) in items.iter().zip(&labels) {
                    if item.exprs.is_empty() {
                        default = Some(&item.body);
                        continue;
                    }
                    if labels.iter().any(|l| key(l) == value) {
                        return self.exec(&item.body);
                    }
                }
                match default {
                    Some(body) => self.exec(body),
                    None => Some(Flow::Next),
                }
            }
            Stmt::For {
                decls,
                init,
                cond,
                incr,
                body,
            } => {
                let saved = self.shadow(decls)?;
                let flow = self.run_loop(init, cond.as_ref(), incr, body);
                self.restore(saved);
                flow
            }
            Stmt::Return { value } => {
                if let Some(value) = value {
                    let v = reduce_expr(value, &*self)?;
                    self.set(self.func, v);
                }
                Some(Flow::Return)
            }
            Stmt::Null => Some(Flow::Next),
            Stmt::EventControl { .. } | Stmt::Unsupported { .. } => None,
        }
    }

    fn run_loop(
        &mut self,
        init: &[Stmt],
        cond: Option<&Expr>,
        incr: &[Stmt],
        body: &Stmt,
    ) -> Option<Flow> {
        for s in init {
            self.exec(s)?;
        }
        let mut iterations = 0u64;
        loop {
            if let Some(cond) = cond {
                if !reduce_expr(cond, &*self)?.is_true() {
                    return Some(Flow::Next);
                }
            }
            if iterations >= self.interp.limits.max_iterations {
                log::warn!(
                    "loop in `{}` exceeded {} iterations",
                    self.func,
                    self.interp.limits.max_iterations
                );
                return None;
            }
            iterations += 1;
            if self.exec(body)? == Flow::Return {
                return Some(Flow::Return);
            }
            for s in incr {
                self.exec(s)?;
            }
        }
    }

    fn assign(&mut self, lhs: &Expr, value: Folded) -> Option<()> {
        let (name, lo, width) = match lhs {
            Expr::Ref { name, .. } => {
                self.set(*name, value);
                return Some(());
            }
            Expr::BitSelect { name, index } => {
                (*name, reduce_expr(index, &*self)?.value, 1)
            }
            Expr::PartSelect { name, left, right } => {
                let l = reduce_expr(left, &*self)?.value;
                let r = reduce_expr(right, &*self)?.value;
                (*name, l.min(r), l.abs_diff(r).checked_add(1)?)
            }
            Expr::IndexedPartSelect {
                name,
                base,
                width,
                descending,
            } => {
                let b = reduce_expr(base, &*self)?.value;
                let w = reduce_expr(width, &*self)?.value;
                let (lo, _) = indexed_range(b, w, *descending)?;
                (*name, lo, w as u64)
            }
            _ => return None,
        };
        let cur = self.current(name)?;
        if lo < 0 || (lo as u64).checked_add(width)? > cur.width as u64 {
            return None;
        }
        let mask = if width >= 64 { u64::MAX } else { (1 << width) - 1 };
        let bits = (cur.bits() & !(mask << lo)) | ((value.bits() & mask) << lo);
        self.set(name, Folded::new(bits as i64, cur.width, cur.signed));
        Some(())
    }
}

impl ConstEnv for Frame<'_, '_> {
    /// Locals hide parameters of the same name, even before they are
    /// assigned.
    fn lookup(&self, name: Id) -> Option<Folded> {
        if self.widths.contains_key(&name) {
            return self.vars.get(&name).copied();
        }
        self.interp.env.lookup(name)
    }

    fn call(
        &self,
        name: Id,
        package: Option<Id>,
        args: &[Folded],
    ) -> Option<Folded> {
        let func = self.interp.funcs.function(name, package)?;
        self.interp.at_depth(self.interp.depth + 1).call(func, args)
    }

    fn typedef(&self, name: Id, package: Option<Id>) -> Option<TypeSpec> {
        self.interp.env.typedef(name, package)
    }

    fn width_of(&self, name: Id) -> Option<u64> {
        self.widths
            .get(&name)
            .map(|(w, _)| *w as u64)
            .or_else(|| self.interp.env.width_of(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as Json, json};

    struct Funcs(Vec<FunctionDef>);

    impl ConstEnv for Funcs {
        fn lookup(&self, _name: Id) -> Option<Folded> {
            None
        }
    }

    impl FunctionTable for Funcs {
        fn function(&self, name: Id, _package: Option<Id>) -> Option<&FunctionDef> {
            self.0.iter().find(|f| f.name == name)
        }
    }

    fn lit(v: i64) -> Json {
        json!({ "kind": "constant", "value": format!("INT:{}", v) })
    }

    fn r(name: &str) -> Json {
        json!({ "kind": "ref", "name": name })
    }

    fn op(op: &str, a: Json, b: Json) -> Json {
        json!({ "kind": "operation", "op": op, "operands": [a, b] })
    }

    fn assign(lhs: Json, rhs: Json) -> Json {
        json!({ "kind": "assign", "lhs": lhs, "rhs": rhs })
    }

    fn int() -> Json {
        json!({ "kind": "int", "int_kind": "int" })
    }

    fn func(value: Json) -> FunctionDef {
        serde_json::from_value(value).unwrap()
    }

    fn limits() -> Limits {
        Limits {
            max_iterations: 100,
            max_depth: 16,
        }
    }

    fn eval(funcs: &Funcs, args: &[i64]) -> Option<Folded> {
        let args = args.iter().map(|a| Folded::int(*a)).collect::<Vec<_>>();
        Interpreter::new(funcs, funcs, limits()).call(&funcs.0[0], &args)
    }

    fn factorial() -> FunctionDef {
        func(json!({
            "name": "fact",
            "return_type": int(),
            "io": [{ "name": "n", "direction": "input", "typespec": int() }],
            "body": {
                "kind": "if",
                "cond": op("le", r("n"), lit(1)),
                "then_stmt": { "kind": "return", "value": lit(1) },
                "else_stmt": { "kind": "return", "value": op("mult", r("n"),
                    json!({ "kind": "func_call", "name": "fact",
                            "args": [op("sub", r("n"), lit(1))] })) }
            }
        }))
    }

    #[test]
    fn recursive_calls_fold() {
        let funcs = Funcs(vec![factorial()]);
        assert_eq!(eval(&funcs, &[5]).map(|v| v.value), Some(120));
        assert_eq!(eval(&funcs, &[1]).map(|v| v.value), Some(1));
    }

    #[test]
    fn loops_and_locals() {
        // acc = 0; for (int i = 0; i < n; i++) acc += i; sum = acc;
        let funcs = Funcs(vec![func(json!({
            "name": "sum",
            "return_type": int(),
            "io": [{ "name": "n", "direction": "input", "typespec": int() }],
            "variables": [{ "name": "acc", "typespec": int() }],
            "body": { "kind": "begin", "stmts": [
                assign(r("acc"), lit(0)),
                { "kind": "for",
                  "decls": [{ "name": "i", "typespec": int(), "init": lit(0) }],
                  "cond": op("lt", r("i"), r("n")),
                  "incr": [assign(r("i"), op("add", r("i"), lit(1)))],
                  "body": { "kind": "assign", "lhs": r("acc"), "rhs": r("i"), "op": "add" } },
                assign(r("sum"), r("acc"))
            ] }
        }))]);
        assert_eq!(eval(&funcs, &[5]).map(|v| v.value), Some(10));
    }

    #[test]
    fn loop_cap_stops_evaluation() {
        let funcs = Funcs(vec![func(json!({
            "name": "spin",
            "return_type": int(),
            "body": { "kind": "for", "cond": lit(1), "body": { "kind": "null" } }
        }))]);
        assert_eq!(eval(&funcs, &[]), None);
    }

    #[test]
    fn depth_limit_stops_recursion() {
        let funcs = Funcs(vec![func(json!({
            "name": "forever",
            "return_type": int(),
            "io": [{ "name": "n", "direction": "input", "typespec": int() }],
            "body": { "kind": "return", "value": { "kind": "func_call", "name": "forever",
                      "args": [op("add", r("n"), lit(1))] } }
        }))]);
        assert_eq!(eval(&funcs, &[0]), None);
    }

    #[test]
    fn selects_and_return_width() {
        // logic [7:0] r; r[3] = 1; r[1:0] = 2'b11; f = r + 16;  f returns logic [3:0]
        let funcs = Funcs(vec![func(json!({
            "name": "f",
            "return_type": { "kind": "logic", "ranges": [{ "left": lit(3), "right": lit(0) }] },
            "variables": [{ "name": "r", "typespec": { "kind": "logic",
                "ranges": [{ "left": lit(7), "right": lit(0) }] } }],
            "body": { "kind": "begin", "stmts": [
                assign(r("r"), lit(0)),
                assign(json!({ "kind": "bit_select", "name": "r", "index": lit(3) }), lit(1)),
                assign(json!({ "kind": "part_select", "name": "r", "left": lit(1), "right": lit(0) }),
                       lit(3)),
                assign(r("f"), op("add", r("r"), lit(16)))
            ] }
        }))]);
        let v = eval(&funcs, &[]).unwrap();
        assert_eq!(v.width, 4);
        assert_eq!(v.value, 11);
    }

    /// Parameter `P = 5`.
    struct WithParam;

    impl ConstEnv for WithParam {
        fn lookup(&self, name: Id) -> Option<Folded> {
            (name == Id::from("P")).then(|| Folded::int(5))
        }
    }

    #[test]
    fn locals_hide_parameters() {
        let logic = json!({ "kind": "logic", "ranges": [{ "left": lit(7), "right": lit(0) }] });
        let read_local = |typespec: Json| {
            Funcs(vec![func(json!({
                "name": "f",
                "return_type": int(),
                "variables": [{ "name": "P", "typespec": typespec }],
                "body": assign(r("f"), r("P"))
            }))])
        };
        let call = |funcs: &Funcs| Interpreter::new(&WithParam, funcs, limits()).call(&funcs.0[0], &[]);
        // an unassigned four-state local is unknown
        assert_eq!(call(&read_local(logic)), None);
        // two-state locals start at zero
        assert_eq!(call(&read_local(int())).map(|v| v.value), Some(0));

        let read_param = Funcs(vec![func(json!({
            "name": "f", "return_type": int(), "body": assign(r("f"), r("P"))
        }))]);
        assert_eq!(call(&read_param).map(|v| v.value), Some(5));
    }

    #[test]
    fn case_labels_compare_at_a_common_width() {
        // f(input logic signed [3:0] x): case (x) 4'b1111: f = 1; -1: f = 2; default: f = 3;
        let select = |labels: Vec<Json>| {
            Funcs(vec![func(json!({
                "name": "f",
                "return_type": int(),
                "io": [{ "name": "x", "direction": "input", "typespec": { "kind": "logic",
                    "signed": true, "ranges": [{ "left": lit(3), "right": lit(0) }] } }],
                "body": { "kind": "case", "cond": r("x"), "items": [
                    { "exprs": labels, "body": assign(r("f"), lit(1)) },
                    { "exprs": [lit(-1)], "body": assign(r("f"), lit(2)) },
                    { "body": assign(r("f"), lit(3)) }
                ] }
            }))])
        };
        let nibble = json!({ "kind": "constant", "value": "BIN:1111", "size": 4 });
        // the unsigned label makes the whole case unsigned: x matches 4'b1111
        let funcs = select(vec![nibble]);
        assert_eq!(eval(&funcs, &[-1]).map(|v| v.value), Some(1));
        assert_eq!(eval(&funcs, &[7]).map(|v| v.value), Some(3));
        // all signed: x sign-extends and matches -1
        let funcs = select(vec![lit(6)]);
        assert_eq!(eval(&funcs, &[-1]).map(|v| v.value), Some(2));
        assert_eq!(eval(&funcs, &[6]).map(|v| v.value), Some(1));
    }
}
