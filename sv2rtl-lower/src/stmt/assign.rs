//! Assignment targets and the actions that write them.
use super::{Body, Branch, ProcState, tail_case};
use crate::align::{Value, align};
use crate::context::Lowerer;
use crate::expr::SelectBase;
use crate::names::Resolved;
use crate::width::TypeInfo;
use smallvec::smallvec;
use sv2rtl_frontend::Expr;
use sv2rtl_frontend::eval::indexed_range;
use sv2rtl_frontend::expr::OpKind;
use sv2rtl_ir::{CaseRule, Const, Memory, RRC, SigSpec, State};
use sv2rtl_utils::{Id, Sv2RtlResult};

/// A lowered assignment target.
pub(crate) enum Lvalue {
    /// Fixed bits of one or more wires.
    Signal(SigSpec),
    /// A memory word.
    Memory { mem: RRC<Memory>, addr: Value },
    /// A bit selected by a run-time index.
    Dynamic { base: SelectBase, index: Value },
    /// Nothing to write; a warning has been issued.
    None,
}

/// Whether `v` is representable in an index of `width` bits.
fn fits(v: i64, width: u32, signed: bool) -> bool {
    match width {
        0 => v == 0,
        64.. => true,
        w if signed => {
            let half = 1i64 << (w - 1);
            (-half..half).contains(&v)
        }
        w => (0..1i64 << w).contains(&v),
    }
}

impl Lowerer<'_> {
    fn lvalue_slice(&mut self, name: Id, base: &SelectBase, lo: i64, hi: i64) -> Lvalue {
        if base.storage(lo).is_none() || base.storage(hi).is_none() {
            self.warn(format!(
                "write to `{}[{}:{}]` lies outside the declared range and is ignored",
                name, hi, lo
            ));
            return Lvalue::None;
        }
        Lvalue::Signal(base.declared_slice(lo, hi))
    }

    /// Lower the target of an assignment.
    pub(crate) fn lower_lvalue(&mut self, lhs: &Expr) -> Sv2RtlResult<Lvalue> {
        match lhs {
            Expr::Operation {
                op: OpKind::Concat,
                operands,
            } => {
                let mut sig = SigSpec::new();
                for e in operands.iter().rev() {
                    match self.lower_lvalue(e)? {
                        Lvalue::Signal(s) => sig.append(&s),
                        Lvalue::None => return Ok(Lvalue::None),
                        _ => {
                            self.warn(format!(
                                "unsupported target {} in concatenation",
                                e.describe()
                            ));
                            return Ok(Lvalue::None);
                        }
                    }
                }
                Ok(Lvalue::Signal(sig))
            }
            Expr::Ref { name, .. } | Expr::HierPath { name } => {
                Ok(match self.resolve_name(*name) {
                    Resolved::Wire(wire) => Lvalue::Signal(SigSpec::from_wire(&wire)),
                    Resolved::Value(v) if !v.sig.is_fully_const() => Lvalue::Signal(v.sig),
                    Resolved::Value(_) => {
                        self.warn(format!("cannot assign to constant `{}`", name));
                        Lvalue::None
                    }
                    Resolved::Memory(_) => {
                        self.warn(format!("assignment to the whole memory `{}`", name));
                        Lvalue::None
                    }
                })
            }
            Expr::BitSelect { name, index } => {
                let resolved = self.resolve_name(*name);
                if let Resolved::Memory(mem) = resolved {
                    let addr = self.lower_value(index)?;
                    return Ok(Lvalue::Memory { mem, addr });
                }
                let Some(base) = self.lvalue_base(&resolved) else {
                    return Ok(Lvalue::None);
                };
                match self.fold_int(index) {
                    Some(idx) => Ok(self.lvalue_slice(*name, &base, idx, idx)),
                    None => {
                        let index = self.lower_value(index)?;
                        Ok(Lvalue::Dynamic { base, index })
                    }
                }
            }
            Expr::PartSelect { name, left, right } => {
                let (Some(l), Some(r)) = (self.fold_int(left), self.fold_int(right)) else {
                    self.warn(format!("non-constant part-select of `{}` as target", name));
                    return Ok(Lvalue::None);
                };
                let resolved = self.resolve_name(*name);
                let Some(base) = self.lvalue_base(&resolved) else {
                    self.warn(format!("part-select of memory `{}` as target", name));
                    return Ok(Lvalue::None);
                };
                Ok(self.lvalue_slice(*name, &base, l.min(r), l.max(r)))
            }
            Expr::IndexedPartSelect {
                name,
                base,
                width,
                descending,
            } => {
                let (Some(b), Some(w)) = (self.fold_int(base), self.fold_int(width)) else {
                    self.warn(format!("non-constant indexed part-select of `{}` as target", name));
                    return Ok(Lvalue::None);
                };
                let Some((lo, hi)) = indexed_range(b, w, *descending) else {
                    self.warn(format!(
                        "indexed part-select of `{}` is out of range ({}, {})",
                        name, b, w
                    ));
                    return Ok(Lvalue::None);
                };
                let resolved = self.resolve_name(*name);
                let Some(sel) = self.lvalue_base(&resolved) else {
                    self.warn(format!("part-select of memory `{}` as target", name));
                    return Ok(Lvalue::None);
                };
                Ok(self.lvalue_slice(*name, &sel, lo, hi))
            }
            other => {
                self.warn(format!("unsupported assignment target {}", other.describe()));
                Ok(Lvalue::None)
            }
        }
    }

    /// Compile `lhs = rhs`, or `lhs op= rhs` when `op` is set.
    pub(crate) fn compile_assign(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        op: Option<OpKind>,
        blocking: bool,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let value = match op {
            Some(op) => self.lower_value(&Expr::Operation {
                op,
                operands: vec![lhs.clone(), rhs.clone()],
            })?,
            None => self.lower_value(rhs)?,
        };
        match self.lower_lvalue(lhs)? {
            Lvalue::Signal(target) => self.assign_signal(&target, &value, blocking, case, st),
            Lvalue::Dynamic { base, index } => {
                self.assign_dynamic(base, index, value, blocking, case, st)?
            }
            Lvalue::Memory { mem, addr } => self.assign_memory(&mem, addr, value, case, st)?,
            Lvalue::None => {}
        }
        Ok(())
    }

    /// Append `target = value` to the tail of `case`. Blocking assignments
    /// are seen by later reads of `target`.
    pub(crate) fn assign_signal(
        &mut self,
        target: &SigSpec,
        value: &Value,
        blocking: bool,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) {
        let rhs = align(value, target.width());
        let lhs = st.subst_lvalue.apply(target);
        tail_case(case).actions.push((lhs, rhs.clone()));
        if blocking {
            self.rvalue.add(target, &rhs);
        }
    }

    /// `base[index] = value` with a run-time index: a switch with one case
    /// per addressable bit.
    fn assign_dynamic(
        &mut self,
        base: SelectBase,
        index: Value,
        value: Value,
        blocking: bool,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let width = base.sig.width() as i64;
        let index_width = index.width();
        let bit = Value::unsigned(align(&value, 1));
        let mut branches = Vec::with_capacity(width as usize);
        for offset in 0..width {
            let idx = if base.upto {
                base.start_offset + width - 1 - offset
            } else {
                base.start_offset + offset
            };
            if !fits(idx, index_width, index.signed) {
                continue;
            }
            branches.push(Branch {
                compare: smallvec![SigSpec::from(Const::from_int(idx, index_width))],
                body: Body::Write {
                    target: base.sig.extract(offset as u32, 1),
                    value: bit.clone(),
                    blocking,
                },
            });
        }
        self.compile_switch(index.sig, branches, case, st)
    }

    /// A memory write becomes a `$memwr` cell whose address, data and enable
    /// are driven from the process.
    fn assign_memory(
        &mut self,
        mem: &RRC<Memory>,
        addr: Value,
        value: Value,
        case: &mut CaseRule,
        st: &mut ProcState,
    ) -> Sv2RtlResult<()> {
        let (name, width, abits) = {
            let m = mem.borrow();
            (m.name, m.width, m.abits())
        };
        let Some(clk) = st.clocking.as_ref().and_then(|c| c.clock.clone()) else {
            self.warn(format!(
                "memory `{}` is written outside of a clocked process, write dropped",
                name
            ));
            return Ok(());
        };
        let polarity = st.clocking.as_ref().is_some_and(|c| c.clock_polarity);
        let addr = self.memory_address(mem, addr);

        let tag = self.module.auto_name(&format!("memwr${}", name));
        let addr_t = self.temp_wire(st, format!("{}_ADDR", tag), &TypeInfo::vector(abits));
        let data_t = self.temp_wire(st, format!("{}_DATA", tag), &TypeInfo::vector(width));
        let en_t = self.temp_wire(st, format!("{}_EN", tag), &TypeInfo::vector(width));
        st.root_init.extend([
            (addr_t.clone(), SigSpec::from_state(State::Sx, abits)),
            (data_t.clone(), SigSpec::from_state(State::Sx, width)),
            (en_t.clone(), SigSpec::from_state(State::S0, width)),
        ]);
        let tail = tail_case(case);
        tail.actions.push((addr_t.clone(), addr.extend_u0(abits, false)));
        tail.actions.push((data_t.clone(), align(&value, width)));
        tail.actions.push((en_t.clone(), SigSpec::from_state(State::S1, width)));

        self.builder()
            .memwr(mem, (&clk, polarity), &addr_t, &data_t, &en_t);
        Ok(())
    }
}
