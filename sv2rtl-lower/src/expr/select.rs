//! Bit, part and indexed part selects.
use crate::align::Value;
use crate::context::Lowerer;
use crate::names::Resolved;
use sv2rtl_frontend::Expr;
use sv2rtl_frontend::eval::indexed_range;
use sv2rtl_ir::{CellKind, Const, Memory, RRC, SigBit, SigSpec, State};
use sv2rtl_utils::{Id, Sv2RtlResult};

/// The signal a select reads from, with its declared packed range.
#[derive(Debug, Clone)]
pub(crate) struct SelectBase {
    pub sig: SigSpec,
    pub start_offset: i64,
    pub upto: bool,
}

impl SelectBase {
    /// Storage offset of a declared index.
    pub fn storage(&self, index: i64) -> Option<u32> {
        let width = self.sig.width() as i64;
        let offset = if self.upto {
            self.start_offset + width - 1 - index
        } else {
            index - self.start_offset
        };
        (0..width).contains(&offset).then_some(offset as u32)
    }

    /// Bits of the declared indices `lo..=hi`, least significant first.
    /// Indices outside the declared range read as x.
    pub fn declared_slice(&self, lo: i64, hi: i64) -> SigSpec {
        let bit = |idx: i64| match self.storage(idx) {
            Some(offset) => self.sig.bits()[offset as usize].clone(),
            None => SigBit::Const(State::Sx),
        };
        let bits = if self.upto {
            (lo..=hi).rev().map(bit).collect()
        } else {
            (lo..=hi).map(bit).collect()
        };
        SigSpec::from_bits(bits)
    }
}

impl Lowerer<'_> {
    /// Select base for an already resolved name, read through earlier
    /// blocking assignments. `None` for memories.
    pub(crate) fn select_base(&self, resolved: &Resolved) -> Option<SelectBase> {
        let mut base = self.lvalue_base(resolved)?;
        base.sig = self.rvalue.apply(&base.sig);
        Some(base)
    }

    /// Select base for the target of an assignment.
    pub(crate) fn lvalue_base(&self, resolved: &Resolved) -> Option<SelectBase> {
        match resolved {
            Resolved::Wire(wire) => {
                let w = wire.borrow();
                Some(SelectBase {
                    sig: SigSpec::from_wire(wire),
                    start_offset: w.start_offset,
                    upto: w.upto,
                })
            }
            Resolved::Value(v) => {
                // Locals that are a whole temporary keep its declared range.
                let range = match v.sig.wires().as_slice() {
                    [wire] if v.sig.is_wire(wire) => {
                        let w = wire.borrow();
                        (w.start_offset, w.upto)
                    }
                    _ => (0, false),
                };
                Some(SelectBase {
                    sig: v.sig.clone(),
                    start_offset: range.0,
                    upto: range.1,
                })
            }
            Resolved::Memory(_) => None,
        }
    }

    /// Word address of a memory: `addr` minus the first declared index.
    pub(crate) fn memory_address(&mut self, mem: &RRC<Memory>, addr: Value) -> SigSpec {
        let start = mem.borrow().start_offset;
        if start == 0 {
            return addr.sig;
        }
        let width = addr.width().max(32) + 1;
        let a = addr.sig.extend_u0(width, addr.signed);
        let b = SigSpec::from(Const::from_int(start, width));
        self.builder().binary(CellKind::Sub, (&a, true), (&b, true), width)
    }

    /// Storage offset computed at run time for a dynamic index.
    fn storage_offset(&mut self, base: &SelectBase, index: Value) -> Value {
        if !base.upto && base.start_offset == 0 {
            return index;
        }
        let width = index.width().max(32) + 1;
        let idx = index.sig.extend_u0(width, index.signed);
        let (a, b) = if base.upto {
            let msb = base.start_offset + base.sig.width() as i64 - 1;
            (SigSpec::from(Const::from_int(msb, width)), idx)
        } else {
            (idx, SigSpec::from(Const::from_int(base.start_offset, width)))
        };
        let y = self.builder().binary(CellKind::Sub, (&a, true), (&b, true), width);
        Value::new(y, true)
    }

    /// `name[index]`. Memories are read through an asynchronous `$memrd`
    /// port. Constant indices must lie in the declared range; dynamic ones
    /// use a `$shiftx`.
    pub(crate) fn lower_bit_select(&mut self, name: Id, index: &Expr) -> Sv2RtlResult<Value> {
        let resolved = self.resolve_name(name);
        if let Resolved::Memory(mem) = &resolved {
            let addr = self.lower_value(index)?;
            let addr = self.memory_address(mem, addr);
            let data = self.builder().memrd(mem, &addr);
            return Ok(Value::unsigned(data));
        }
        let Some(base) = self.select_base(&resolved) else {
            return Ok(Value::default());
        };
        if base.sig.is_empty() {
            return Ok(Value::default());
        }
        if let Some(idx) = self.fold_int(index) {
            return match base.storage(idx) {
                Some(offset) => Ok(Value::unsigned(base.sig.extract(offset, 1))),
                None => Err(self.fatal(format!(
                    "index {} is out of range for `{}`",
                    idx, name
                ))),
            };
        }
        let index = self.lower_value(index)?;
        let offset = self.storage_offset(&base, index);
        let y = self
            .builder()
            .shiftx(&base.sig, &offset.sig, offset.signed, 1);
        Ok(Value::unsigned(y))
    }

    /// `name[left:right]` with constant bounds.
    pub(crate) fn lower_part_select(
        &mut self,
        name: Id,
        left: &Expr,
        right: &Expr,
    ) -> Sv2RtlResult<Value> {
        let (Some(l), Some(r)) = (self.fold_int(left), self.fold_int(right)) else {
            self.warn(format!("non-constant part-select of `{}`", name));
            return Ok(Value::default());
        };
        let resolved = self.resolve_name(name);
        let Some(base) = self.select_base(&resolved) else {
            self.warn(format!("part-select of memory `{}`", name));
            return Ok(Value::default());
        };
        Ok(Value::unsigned(base.declared_slice(l.min(r), l.max(r))))
    }

    /// `name[base +: width]` and `name[base -: width]` with constant base
    /// and width.
    pub(crate) fn lower_indexed_part_select(
        &mut self,
        name: Id,
        base: &Expr,
        width: &Expr,
        descending: bool,
    ) -> Sv2RtlResult<Value> {
        let (Some(b), Some(w)) = (self.fold_int(base), self.fold_int(width)) else {
            self.warn(format!("non-constant indexed part-select of `{}`", name));
            return Ok(Value::default());
        };
        let Some((lo, hi)) = indexed_range(b, w, descending) else {
            self.warn(format!("indexed part-select of `{}` is out of range ({}, {})", name, b, w));
            return Ok(Value::default());
        };
        let resolved = self.resolve_name(name);
        let Some(sel) = self.select_base(&resolved) else {
            self.warn(format!("part-select of memory `{}`", name));
            return Ok(Value::default());
        };
        Ok(Value::unsigned(sel.declared_slice(lo, hi)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{expr, lit, module, r, with_lowerer};
    use serde_json::json;
    use sv2rtl_ir::CellKind;

    fn part(name: &str, l: i64, rt: i64) -> sv2rtl_frontend::Expr {
        expr(json!({ "kind": "part_select", "name": name, "left": lit(l), "right": lit(rt) }))
    }

    fn bits_of(sig: &sv2rtl_ir::SigSpec) -> Vec<u32> {
        sig.bits()
            .iter()
            .map(|b| match b {
                sv2rtl_ir::SigBit::Wire { offset, .. } => *offset,
                sv2rtl_ir::SigBit::Const(_) => u32::MAX,
            })
            .collect()
    }

    #[test]
    fn part_selects_follow_declared_ranges() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            // a[7:0]: a[5:2] and a[2:5] are the same bits
            let v = l.lower_expr(&part("a", 5, 2)).unwrap();
            assert_eq!(bits_of(&v), vec![2, 3, 4, 5]);
            assert_eq!(bits_of(&l.lower_expr(&part("a", 2, 5)).unwrap()), vec![2, 3, 4, 5]);
            // hi[11:4]: hi[7:4] is the low nibble of storage
            assert_eq!(bits_of(&l.lower_expr(&part("hi", 7, 4)).unwrap()), vec![0, 1, 2, 3]);
            // up[0:7]: up[0:3] is the high nibble of storage
            assert_eq!(bits_of(&l.lower_expr(&part("up", 0, 3)).unwrap()), vec![4, 5, 6, 7]);
        });
    }

    #[test]
    fn indexed_part_selects() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let up = expr(json!({ "kind": "indexed_part_select", "name": "a",
                                  "base": lit(2), "width": lit(3) }));
            assert_eq!(bits_of(&l.lower_expr(&up).unwrap()), vec![2, 3, 4]);
            let down = expr(json!({ "kind": "indexed_part_select", "name": "a",
                                    "base": lit(6), "width": lit(3), "descending": true }));
            assert_eq!(bits_of(&l.lower_expr(&down).unwrap()), vec![4, 5, 6]);
        });
    }

    #[test]
    fn indexed_part_selects_past_the_integer_limits() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let down = expr(json!({ "kind": "indexed_part_select", "name": "a",
                                    "base": lit(i64::MIN), "width": lit(2), "descending": true }));
            assert_eq!(l.lower_expr(&down).unwrap().width(), 0);
            let up = expr(json!({ "kind": "indexed_part_select", "name": "a",
                                  "base": lit(i64::MAX), "width": lit(2) }));
            assert_eq!(l.lower_expr(&up).unwrap().width(), 0);
        });
    }

    #[test]
    fn bit_selects() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let e = expr(json!({ "kind": "bit_select", "name": "hi", "index": lit(5) }));
            assert_eq!(bits_of(&l.lower_expr(&e).unwrap()), vec![1]);
            let out = expr(json!({ "kind": "bit_select", "name": "hi", "index": lit(2) }));
            assert!(l.lower_expr(&out).is_err());
            let dynamic = expr(json!({ "kind": "bit_select", "name": "a", "index": r("b") }));
            assert_eq!(l.lower_expr(&dynamic).unwrap().width(), 1);
            let shiftx = l.module.cells.iter().find(|c| c.borrow().is_kind(CellKind::Shiftx));
            assert!(shiftx.is_some());
        });
    }

    #[test]
    fn memory_reads_use_memrd() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let e = expr(json!({ "kind": "bit_select", "name": "mem", "index": r("b") }));
            assert_eq!(l.lower_expr(&e).unwrap().width(), 8);
            let cell = l.module.cells.iter().next().unwrap().clone();
            let cell = cell.borrow();
            assert!(cell.is_kind(CellKind::MemRd));
            assert_eq!(cell.param_int("CLK_ENABLE"), Some(0));
            assert_eq!(cell.get_port("ADDR").unwrap().width(), 4);
        });
    }
}
