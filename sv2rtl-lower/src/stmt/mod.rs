//! Compilation of procedural statements into process decision trees.
//!
//! Statements are compiled into a tree of [CaseRule]s. Assignments become
//! actions on the case being filled; `if` and `case` become switches. Every
//! signal written inside a switch by a blocking assignment gets a fresh
//! temporary so later statements read the merged value.
mod assign;
mod process;

pub(crate) use assign::Lvalue;

use crate::align::{Value, align};
use crate::clocking::ClockingContext;
use crate::context::Lowerer;
use crate::names::Resolved;
use crate::packages::typed_param;
use crate::width::{TypeInfo, type_info};
use smallvec::{SmallVec, smallvec};
use std::borrow::Cow;
use std::rc::Rc;
use sv2rtl_frontend::ast::{CaseItem, CaseKind, Stmt, VarDecl};
use sv2rtl_frontend::expr::OpKind;
use sv2rtl_frontend::{Expr, Folded};
use sv2rtl_ir::{
    Action, Attribute, CaseRule, RRC, SigBit, SigMap, SigSpec, State, SwitchRule,
    Wire,
};
use sv2rtl_utils::{Id, Sv2RtlResult};

/// Whether control can leave a function body at the current point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Flow {
    #[default]
    Continues,
    MayReturn,
    Returns,
}

/// The function whose body is being compiled.
#[derive(Debug, Clone)]
pub(crate) struct FuncFrame {
    pub name: Id,
    /// One-bit temporary set by `return`.
    pub returned: SigSpec,
}

/// Per-process compilation state.
#[derive(Debug, Default)]
pub(crate) struct ProcState {
    /// Where assignments to a signal actually land.
    pub subst_lvalue: SigMap,
    /// Clock and reset of an edge-triggered process.
    pub clocking: Option<ClockingContext>,
    /// Actions placed first in the root case.
    pub root_init: Vec<Action>,
    /// Counter for switch temporaries.
    pub temp_idx: usize,
    pub flow: Flow,
    pub func: Option<FuncFrame>,
    /// Temporaries are marked `nosync` and collected in `temps`.
    pub nosync: bool,
    pub temps: Vec<SigSpec>,
}

impl ProcState {
    pub fn new(clocking: Option<ClockingContext>) -> Self {
        Self {
            clocking,
            ..Default::default()
        }
    }
}

/// A loop being unrolled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Loop<'s> {
    cond: &'s Expr,
    incr: &'s [Stmt],
    body: &'s Stmt,
    count: u64,
}

/// What a switch case executes.
pub(crate) enum Body<'s> {
    Stmts(Vec<&'s Stmt>),
    Write {
        target: SigSpec,
        value: Value,
        blocking: bool,
    },
}

pub(crate) struct Branch<'s> {
    /// Empty for the default case.
    pub compare: SmallVec<[SigSpec; 1]>,
    pub body: Body<'s>,
}

/// The case new actions are appended to: `case` itself until it has a
/// switch, then a trailing sequencing switch. Sequencing cases only hold
/// actions; later switches are siblings in `case`.
pub(crate) fn tail_case(case: &mut CaseRule) -> &mut CaseRule {
    let open = |sw: &SwitchRule| sw.is_sequencing() && sw.cases[0].switches.is_empty();
    if case.switches.is_empty() {
        return case;
    }
    if !case.switches.last().is_some_and(open) {
        case.switches.push(SwitchRule::sequencing());
    }
    let last = case.switches.len() - 1;
    &mut case.switches[last].cases[0]
}

/// Base names written by an assignment target.
fn lhs_names(lhs: &Expr, out: &mut Vec<Id>) {
    match lhs {
        Expr::Operation {
            op: OpKind::Concat,
            operands,
        } => operands.iter().for_each(|e| lhs_names(e, out)),
        e => out.extend(e.base_name()),
    }
}

/// Names written by `stmt`, outside of loop headers. `returns` is set when
/// the statement contains a `return`.
pub(crate) fn written(stmt: &Stmt, blocking_only: bool, out: &mut Vec<Id>, returns: &mut bool) {
    match stmt {
        Stmt::Assign { lhs, blocking, .. } => {
            if *blocking || !blocking_only {
                lhs_names(lhs, out)
            }
        }
        Stmt::Begin { decls, stmts, .. } => {
            out.extend(decls.iter().filter(|d| d.init.is_some()).map(|d| d.name));
            stmts
                .iter()
                .for_each(|s| written(s, blocking_only, out, returns));
        }
        Stmt::If {
            then_stmt,
            else_stmt,
            ..
        } => {
            written(then_stmt, blocking_only, out, returns);
            if let Some(e) = else_stmt {
                written(e, blocking_only, out, returns);
            }
        }
        Stmt::Case { items, .. } => items
            .iter()
            .for_each(|i| written(&i.body, blocking_only, out, returns)),
        Stmt::For { body, .. } | Stmt::EventControl { body, .. } => {
            written(body, blocking_only, out, returns)
        }
        Stmt::Return { .. } => *returns = true,
        Stmt::Null | Stmt::Unsupported { .. } => {}
    }
}

fn push_unique(wires: &mut Vec<RRC<Wire>>, wire: RRC<Wire>) {
    if !wires.iter().any(|w| Rc::ptr_eq(w, &wire)) {
        wires.push(wire);
    }
}

/// Replace don't-care digits of a `casez`/`casex` label.
fn wildcards(sig: SigSpec, kind: CaseKind) -> SigSpec {
    let dont_care = |s: State| match kind {
        CaseKind::Case => false,
        CaseKind::Casez => s == State::Sz,
        CaseKind::Casex => matches!(s, State::Sz | State::Sx),
    };
    SigSpec::from_bits(
        sig.into_bits()
            .into_iter()
            .map(|b| match b {
                SigBit::Const(s) if dont_care(s) => SigBit::Const(State::Sa),
                b => b,
            })
            .collect(),
    )
}

impl Lowerer<'_> {
    /// A wire used only inside a process.
    pub(crate) fn temp_wire(&mut self, st: &mut ProcState, name: String, info: &TypeInfo) -> SigSpec {
        let wire = self.module.add_wire(name, info.width);
        {
            let mut w = wire.borrow_mut();
            w.start_offset = info.start_offset;
            w.upto = info.upto;
            w.signed = info.signed;
            w.attributes.set_src(self.src());
            if st.nosync {
                w.attributes.set_bool(Attribute::NoSync);
            }
        }
        let sig = SigSpec::from_wire(&wire);
        if st.nosync {
            st.temps.push(sig.clone());
        }
        sig
    }

    fn switch_temp(&mut self, st: &mut ProcState, wire: &RRC<Wire>) -> SigSpec {
        st.temp_idx += 1;
        let (name, info) = {
            let w = wire.borrow();
            let info = TypeInfo {
                width: w.width,
                start_offset: w.start_offset,
                upto: w.upto,
                signed: w.signed,
            };
            (format!("${}\\{}", st.temp_idx, w.name), info)
        };
        self.temp_wire(st, name, &info)
    }

    /// Wires behind the written `names`. Memories and constants are
    /// skipped. With `returns`, the result and return flag of the current
    /// function are included.
    pub(crate) fn target_wires(&mut self, names: &[Id], returns: bool, st: &ProcState) -> Vec<RRC<Wire>> {
        let mut wires = vec![];
        let add = |wires: &mut Vec<RRC<Wire>>, sig: &SigSpec| {
            sig.wires().into_iter().for_each(|w| push_unique(wires, w));
        };
        for name in names {
            match self.resolve_name(*name) {
                Resolved::Wire(wire) => push_unique(&mut wires, wire),
                Resolved::Value(v) => add(&mut wires, &v.sig),
                Resolved::Memory(_) => {}
            }
        }
        if returns {
            if let Some(func) = &st.func {
                if let Some(Resolved::Value(v)) = self.lookup_name(func.name) {
                    add(&mut wires, &v.sig);
                }
                add(&mut wires, &func.returned);
            }
        }
        wires
    }

    fn branch_lvalues(&mut self, branches: &[Branch<'_>], st: &ProcState) -> Vec<RRC<Wire>> {
        let mut names = vec![];
        let mut returns = false;
        let mut extra = vec![];
        for branch in branches {
            match &branch.body {
                Body::Stmts(stmts) => stmts
                    .iter()
                    .for_each(|s| written(s, true, &mut names, &mut returns)),
                Body::Write {
                    target,
                    blocking: true,
                    ..
                } => extra.extend(target.wires()),
                Body::Write { .. } => {}
            }
        }
        let mut wires = self.target_wires(&names, returns, st);
        for wire in extra {
            push_unique(&mut wires, wire);
        }
        wires
    }

    /// Compile `stmt` into `case`.
    pub(crate) fn compile_stmt(
        &mut self,
        stmt: &Stmt,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        match stmt {
            Stmt::Assign {
                lhs,
                rhs,
                op,
                blocking,
            } => self.compile_assign(lhs, rhs, *op, *blocking, case, st),
            Stmt::Begin { decls, stmts, .. } => {
                for decl in decls {
                    if let Some(init) = &decl.init {
                        let lhs = Expr::reference(decl.name);
                        self.compile_assign(&lhs, init, None, true, case, st)?;
                    }
                }
                let stmts = stmts.iter().collect::<Vec<_>>();
                self.compile_block(&stmts, case, st)
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => self.compile_if(cond, then_stmt, else_stmt.as_deref(), case, st),
            Stmt::Case {
                case_kind,
                cond,
                items,
            } => self.compile_case(*case_kind, cond, items, case, st),
            Stmt::For {
                decls,
                init,
                cond,
                incr,
                body,
            } => self.compile_for(decls, init, cond.as_ref(), incr, body, case, st),
            Stmt::Return { value } => self.compile_return(value.as_ref(), case, st),
            Stmt::EventControl { body, .. } => {
                self.warn("nested event control is ignored");
                self.compile_stmt(body, case, st)
            }
            Stmt::Null => Ok(()),
            Stmt::Unsupported { what } => {
                self.warn(format!("unsupported statement: {}", what));
                Ok(())
            }
        }
    }

    /// Compile a statement sequence. After a statement that may return,
    /// the rest only runs while the return flag is clear.
    pub(crate) fn compile_block(
        &mut self,
        stmts: &[&Stmt],
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        for (idx, stmt) in stmts.iter().enumerate() {
            self.compile_stmt(stmt, case, st)?;
            let rest = &stmts[idx + 1..];
            match st.flow {
                Flow::Continues => {}
                Flow::Returns => {
                    if !rest.is_empty() {
                        self.warn("statements after `return` are ignored");
                    }
                    return Ok(());
                }
                Flow::MayReturn => {
                    if !rest.is_empty() {
                        self.unless_returned(Body::Stmts(rest.to_vec()), case, st)?;
                    }
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn unless_returned(
        &mut self,
        body: Body<'_>,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let Some(flag) = st.func.as_ref().map(|f| f.returned.clone()) else {
            return Ok(());
        };
        let signal = self.rvalue.apply(&flag);
        let branch = Branch {
            compare: smallvec![SigSpec::from_bool(false)],
            body,
        };
        self.compile_switch(signal, vec![branch], case, st)?;
        st.flow = Flow::MayReturn;
        Ok(())
    }

    fn compile_body(
        &mut self,
        body: Body<'_>,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        match body {
            Body::Stmts(stmts) => self.compile_block(&stmts, case, st),
            Body::Write {
                target,
                value,
                blocking,
            } => {
                self.assign_signal(&target, &value, blocking, case, st);
                Ok(())
            }
        }
    }

    /// Emit a switch over `signal`. Blocking targets of the branches are
    /// redirected to temporaries that start from the current value and are
    /// copied back after the switch.
    pub(crate) fn compile_switch(
        &mut self,
        signal: SigSpec,
        branches: Vec<Branch<'_>>,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let lvalues = self.branch_lvalues(&branches, st);
        let mut ltemps = Vec::with_capacity(lvalues.len());
        for wire in &lvalues {
            let l = SigSpec::from_wire(wire);
            let t = self.switch_temp(st, wire);
            let current = self.rvalue.apply(&l);
            tail_case(case).actions.push((t.clone(), current));
            ltemps.push((l, t));
        }

        let saved_subst = st.subst_lvalue.clone();
        for (l, t) in &ltemps {
            st.subst_lvalue.add(l, t);
        }
        let branch_subst = st.subst_lvalue.clone();
        let saved_rvalue = self.rvalue.clone();

        let mut sw = SwitchRule::new(signal);
        let mut flows = Vec::with_capacity(branches.len());
        let mut has_default = false;
        for branch in branches {
            st.subst_lvalue = branch_subst.clone();
            self.rvalue = saved_rvalue.clone();
            st.flow = Flow::Continues;
            has_default |= branch.compare.is_empty();
            let mut c = CaseRule::with_compare(branch.compare);
            self.compile_body(branch.body, &mut c, st)?;
            flows.push(st.flow);
            sw.cases.push(c);
        }
        st.subst_lvalue = saved_subst;
        self.rvalue = saved_rvalue;
        case.switches.push(sw);

        for (l, t) in ltemps {
            let lhs = st.subst_lvalue.apply(&l);
            tail_case(case).actions.push((lhs, t.clone()));
            self.rvalue.add(&l, &t);
        }

        st.flow = if has_default && flows.iter().all(|f| *f == Flow::Returns) {
            Flow::Returns
        } else if flows.iter().any(|f| *f != Flow::Continues) {
            Flow::MayReturn
        } else {
            Flow::Continues
        };
        Ok(())
    }

    fn compile_if(
        &mut self,
        cond: &Expr,
        then_stmt: &Stmt,
        else_stmt: Option<&Stmt>,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        if let Some(c) = self.fold(cond) {
            return match (c.is_true(), else_stmt) {
                (true, _) => self.compile_stmt(then_stmt, case, st),
                (false, Some(e)) => self.compile_stmt(e, case, st),
                (false, None) => Ok(()),
            };
        }
        let c = self.lower_value(cond)?;
        let signal = self.reduce_bool(c);
        let branches = vec![
            Branch {
                compare: smallvec![SigSpec::from_bool(true)],
                body: Body::Stmts(vec![then_stmt]),
            },
            Branch {
                compare: SmallVec::new(),
                body: Body::Stmts(else_stmt.into_iter().collect()),
            },
        ];
        self.compile_switch(signal, branches, case, st)
    }

    /// `case`, `casez` and `casex`. The subject and all labels are brought
    /// to a common width; the default item always comes last.
    fn compile_case(
        &mut self,
        kind: CaseKind,
        cond: &Expr,
        items: &[CaseItem],
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let subject = self.lower_value(cond)?;
        let mut labels = Vec::with_capacity(items.len());
        for item in items {
            let mut values = Vec::with_capacity(item.exprs.len());
            for e in &item.exprs {
                values.push(self.lower_value(e)?);
            }
            labels.push(values);
        }
        let width = labels
            .iter()
            .flatten()
            .map(Value::width)
            .fold(subject.width(), u32::max);
        let signed = subject.signed && labels.iter().flatten().all(|v| v.signed);
        let fit = |v: &Value| {
            align(
                &Value {
                    signed,
                    ..v.clone()
                },
                width,
            )
        };

        let mut branches = Vec::with_capacity(items.len());
        let mut default = None;
        for (item, values) in items.iter().zip(&labels) {
            if item.exprs.is_empty() {
                if default.is_some() {
                    self.warn("multiple default items in case statement");
                } else {
                    default = Some(&item.body);
                }
                continue;
            }
            branches.push(Branch {
                compare: values.iter().map(|v| wildcards(fit(v), kind)).collect(),
                body: Body::Stmts(vec![&item.body]),
            });
        }
        if let Some(body) = default {
            branches.push(Branch {
                compare: SmallVec::new(),
                body: Body::Stmts(vec![body]),
            });
        }
        self.compile_switch(fit(&subject), branches, case, st)
    }

    /// Initial value of a loop variable.
    fn loop_var(&self, decl: &VarDecl) -> Option<Folded> {
        match &decl.init {
            Some(init) => typed_param(init, Some(&decl.typespec), self),
            None => {
                let info = type_info(&decl.typespec, self)?;
                Some(Folded::new(0, info.width.clamp(1, 64), info.signed))
            }
        }
    }

    /// Bind a loop variable for the rest of the loop. Loop variables shadow
    /// block variables of the same name.
    fn bind_loop_var(&mut self, name: Id, value: Folded) {
        for frame in &mut self.scope.locals {
            frame.remove(&name);
        }
        let value = match self.scope.params.get(&name) {
            Some(old) => value.resize(old.width).with_sign(old.signed),
            None => value,
        };
        self.scope.params.insert(name, value);
    }

    /// Apply one assignment of a loop header.
    fn step_loop_var(&mut self, stmt: &Stmt) -> bool {
        let Stmt::Assign {
            lhs: Expr::Ref { name, .. },
            rhs,
            op,
            ..
        } = stmt
        else {
            self.warn("unsupported statement in loop header");
            return false;
        };
        let rhs = match op {
            Some(op) => Cow::Owned(Expr::Operation {
                op: *op,
                operands: vec![Expr::reference(*name), rhs.clone()],
            }),
            None => Cow::Borrowed(rhs),
        };
        match self.fold(&rhs) {
            Some(v) => {
                self.bind_loop_var(*name, v);
                true
            }
            None => {
                self.warn(format!("loop variable `{}` does not stay constant", name));
                false
            }
        }
    }

    /// `for` loops are unrolled with the loop variables bound as constants.
    #[allow(clippy::too_many_arguments)]
    fn compile_for(
        &mut self,
        decls: &[VarDecl],
        init: &[Stmt],
        cond: Option<&Expr>,
        incr: &[Stmt],
        body: &Stmt,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let mut g = self.enter_scope();
        for decl in decls {
            let Some(v) = g.loop_var(decl) else {
                g.warn(format!("loop variable `{}` has no constant initial value", decl.name));
                return Ok(());
            };
            g.bind_loop_var(decl.name, v);
        }
        for stmt in init {
            if !g.step_loop_var(stmt) {
                return Ok(());
            }
        }
        let Some(cond) = cond else {
            g.warn("loop without a condition is not unrolled");
            return Ok(());
        };
        g.unroll(
            Loop {
                cond,
                incr,
                body,
                count: 0,
            },
            case,
            st,
        )
    }

    /// Once an iteration may have returned, every later iteration runs in
    /// its own switch on the return flag, next to the previous ones.
    fn unroll(
        &mut self,
        mut l: Loop<'_>,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let max = self.conf.max_loop_iterations;
        let mut guarded = false;
        loop {
            match self.fold(l.cond) {
                Some(c) if !c.is_true() => return Ok(()),
                Some(_) => {}
                None => {
                    self.warn("loop condition is not constant, loop is not unrolled");
                    return Ok(());
                }
            }
            if l.count >= max {
                self.warn(format!("loop exceeds {} iterations, unrolling stops", max));
                return Ok(());
            }
            l.count += 1;
            if guarded {
                self.unless_returned(Body::Stmts(vec![l.body]), case, st)?;
            } else {
                self.compile_stmt(l.body, case, st)?;
            }
            for stmt in l.incr {
                if !self.step_loop_var(stmt) {
                    return Ok(());
                }
            }
            match st.flow {
                Flow::Continues => {}
                Flow::Returns => return Ok(()),
                Flow::MayReturn => guarded = true,
            }
        }
    }

    fn compile_return(
        &mut self,
        value: Option<&Expr>,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let Some(func) = st.func.clone() else {
            self.warn("`return` outside of a function is ignored");
            return Ok(());
        };
        if let Some(v) = value {
            self.compile_assign(&Expr::reference(func.name), v, None, true, case, st)?;
        }
        let one = Value::unsigned(SigSpec::from_bool(true));
        self.assign_signal(&func.returned, &one, true, case, st);
        st.flow = Flow::Returns;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_case_sequences_after_switches() {
        let mut root = CaseRule::default();
        assert!(tail_case(&mut root).switches.is_empty());
        root.switches.push(SwitchRule::new(SigSpec::from_bool(true)));
        tail_case(&mut root).actions.push((SigSpec::new(), SigSpec::new()));
        assert_eq!(root.switches.len(), 2);
        assert!(root.switches[1].is_sequencing());
        assert_eq!(root.switches[1].cases[0].actions.len(), 1);
        // A second action lands in the same sequencing case.
        tail_case(&mut root).actions.push((SigSpec::new(), SigSpec::new()));
        assert_eq!(root.switches.len(), 2);
        assert_eq!(root.switches[1].cases[0].actions.len(), 2);
    }

    #[test]
    fn later_switches_are_siblings() {
        let mut root = CaseRule::default();
        for _ in 0..3 {
            root.switches.push(SwitchRule::new(SigSpec::from_bool(true)));
            tail_case(&mut root).actions.push((SigSpec::new(), SigSpec::new()));
        }
        assert_eq!(root.switches.len(), 6);
        assert!(root.switches.iter().all(|sw| sw.cases.iter().all(|c| c.switches.is_empty())));

        // A default-only switch over an empty signal that holds switches is
        // not a place for new actions.
        let mut root = CaseRule::default();
        let mut sw = SwitchRule::new(SigSpec::new());
        let mut c = CaseRule::default();
        c.switches.push(SwitchRule::new(SigSpec::from_bool(true)));
        sw.cases.push(c);
        root.switches.push(sw);
        tail_case(&mut root).actions.push((SigSpec::new(), SigSpec::new()));
        assert_eq!(root.switches.len(), 2);
        assert_eq!(root.switches[1].cases[0].actions.len(), 1);
    }

    #[test]
    fn casez_digits_become_dont_care() {
        let label = SigSpec::from_bits(vec![
            SigBit::Const(State::Sz),
            SigBit::Const(State::S1),
            SigBit::Const(State::Sx),
        ]);
        let z = wildcards(label.clone(), CaseKind::Casez);
        assert_eq!(z.bits()[0], SigBit::Const(State::Sa));
        assert_eq!(z.bits()[2], SigBit::Const(State::Sx));
        let x = wildcards(label.clone(), CaseKind::Casex);
        assert_eq!(x.bits()[2], SigBit::Const(State::Sa));
        assert_eq!(wildcards(label.clone(), CaseKind::Case), label);
    }
}
