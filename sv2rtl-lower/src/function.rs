//! Calls that do not fold become processes of their own.
//!
//! Every call site gets a fresh combinational process computing the result
//! from `nosync` temporaries. The result is exposed through a
//! `<call>$result` wire.
use crate::align::{Value, align};
use crate::context::Lowerer;
use crate::stmt::{FuncFrame, Lvalue, ProcState};
use crate::width::{TypeInfo, type_info};
use std::collections::{HashMap, HashSet};
use std::mem;
use sv2rtl_frontend::Expr;
use sv2rtl_frontend::ast::{Direction, FunctionDef, IntKind, Stmt, TypeSpec};
use sv2rtl_ir::{CaseRule, SigSpec, State, SyncRule};
use sv2rtl_utils::{Id, Sv2RtlResult};

/// How an argument reaches the function body.
enum Binding {
    /// Copied into a temporary when the call starts.
    Input(Value),
    /// Outputs write the caller's signal directly.
    Alias(SigSpec),
}

/// Variables that are only returned or assigned to the function name.
/// They share the result temporary.
fn result_aliases(func: &FunctionDef) -> HashSet<Id> {
    let mut aliases = HashSet::new();
    func.body.walk(&mut |s| match s {
        Stmt::Assign {
            lhs: Expr::Ref { name: lhs, .. },
            rhs: Expr::Ref { name: rhs, .. },
            op: None,
            ..
        } if *lhs == func.name => {
            aliases.insert(*rhs);
        }
        Stmt::Return {
            value: Some(Expr::Ref { name, .. }),
        } => {
            aliases.insert(*name);
        }
        _ => {}
    });
    aliases
}

fn is_two_state(ts: &TypeSpec) -> bool {
    matches!(ts, TypeSpec::Int { int_kind, .. } if *int_kind != IntKind::Integer)
}

impl<'a> Lowerer<'a> {
    /// Generate the logic of a call to `func` with `args`.
    pub(crate) fn generate_call(
        &mut self,
        func: &'a FunctionDef,
        args: &[Expr],
    ) -> Sv2RtlResult<Value> {
        let ret = type_info(&func.return_type, &*self).unwrap_or(TypeInfo::vector(1));
        let undefined = Value::new(SigSpec::from_state(State::Sx, ret.width), ret.signed);
        let max_depth = self.conf.max_call_depth;
        if self.scope.call_depth >= max_depth {
            if self.calls.is_recursive(func.name) {
                self.warn(format!(
                    "recursion of `{}` exceeds the call depth limit of {}",
                    func.name, max_depth
                ));
            } else {
                self.warn(format!(
                    "call of `{}` exceeds the call depth limit of {}",
                    func.name, max_depth
                ));
            }
            return Ok(undefined);
        }
        if args.len() != func.io.len() {
            self.warn(format!(
                "`{}` expects {} arguments, got {}",
                func.name,
                func.io.len(),
                args.len()
            ));
            return Ok(undefined);
        }

        // Arguments are evaluated in the caller's scope.
        let mut bindings = Vec::with_capacity(args.len());
        for (io, arg) in func.io.iter().zip(args) {
            let binding = match io.direction {
                Direction::Input => Binding::Input(self.lower_value(arg)?),
                Direction::Output | Direction::Inout => match self.lower_lvalue(arg)? {
                    Lvalue::Signal(sig) => Binding::Alias(sig),
                    _ => {
                        self.warn(format!(
                            "argument for output `{}` of `{}` is not a signal",
                            io.name, func.name
                        ));
                        return Ok(undefined);
                    }
                },
            };
            bindings.push(binding);
        }

        let base = self.module.auto_name(&format!("func${}", func.name));
        let mut st = ProcState {
            nosync: true,
            ..Default::default()
        };
        let mut root = CaseRule::default();
        let mut frame = HashMap::new();

        // The result is copied out, so it is not among the forced temporaries.
        let result = self.temp_wire(&mut st, format!("{}$\\{}", base, func.name), &ret);
        st.temps.pop();
        root.actions
            .push((result.clone(), SigSpec::from_state(State::Sx, ret.width)));
        frame.insert(func.name, Value::new(result.clone(), ret.signed));

        for (io, binding) in func.io.iter().zip(bindings) {
            match binding {
                Binding::Input(v) => {
                    let info = type_info(&io.typespec, &*self).unwrap_or(TypeInfo::vector(1));
                    let t = self.temp_wire(&mut st, format!("{}$\\{}", base, io.name), &info);
                    root.actions.push((t.clone(), align(&v, info.width)));
                    frame.insert(io.name, Value::new(t, info.signed));
                }
                Binding::Alias(sig) => {
                    frame.insert(io.name, Value::new(sig, io.typespec.is_signed()));
                }
            }
        }

        let aliases = result_aliases(func);
        for var in &func.variables {
            let info = type_info(&var.typespec, &*self).unwrap_or(TypeInfo::vector(1));
            if aliases.contains(&var.name) && info.width == ret.width {
                frame.insert(var.name, Value::new(result.clone(), info.signed));
                continue;
            }
            let t = self.temp_wire(&mut st, format!("{}$\\{}", base, var.name), &info);
            let state = if is_two_state(&var.typespec) { State::S0 } else { State::Sx };
            root.actions.push((t.clone(), SigSpec::from_state(state, info.width)));
            frame.insert(var.name, Value::new(t, info.signed));
        }

        let returned = self.temp_wire(
            &mut st,
            format!("{}$returned", base),
            &TypeInfo::vector(1),
        );
        root.actions.push((returned.clone(), SigSpec::from_bool(false)));
        st.func = Some(FuncFrame {
            name: func.name,
            returned,
        });

        let compiled = {
            let mut g = self.enter_scope();
            g.set_loc(func.loc.as_ref());
            g.scope.locals = vec![frame];
            g.scope.call_depth += 1;
            let vars = g.declare_block_vars(&func.body, &mut st, Some(base));
            g.scope.locals.push(vars);
            let saved = mem::take(&mut g.rvalue);
            let compiled = g.compile_function_body(func, &mut root, &mut st);
            g.rvalue = saved;
            compiled
        };
        compiled?;

        let mut actions = mem::take(&mut st.root_init);
        actions.append(&mut root.actions);
        root.actions = actions;

        let out = self.module.add_wire(format!("{}$result", base), ret.width);
        {
            let mut w = out.borrow_mut();
            w.signed = ret.signed;
            w.attributes.set_src(self.src());
        }
        let out = SigSpec::from_wire(&out);
        let mut sync = SyncRule::always();
        sync.actions.push((out.clone(), result));
        for t in &st.temps {
            sync.actions
                .push((t.clone(), SigSpec::from_state(State::Sx, t.width())));
        }

        let process = self.module.add_process(base);
        {
            let mut p = process.borrow_mut();
            p.attributes.set_src(self.src());
            p.root_case = root;
            p.syncs.push(sync);
        }
        Ok(Value::new(out, ret.signed))
    }

    fn compile_function_body(
        &mut self,
        func: &FunctionDef,
        root: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        for var in &func.variables {
            if let Some(init) = &var.init {
                self.compile_assign(&Expr::reference(var.name), init, None, true, root, st)?;
            }
        }
        self.compile_stmt(&func.body, root, st)
    }
}
