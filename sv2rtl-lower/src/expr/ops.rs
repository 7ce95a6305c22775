//! Operators.
use crate::align::{Value, align, align_pair};
use crate::context::Lowerer;
use sv2rtl_frontend::{Expr, OpKind};
use sv2rtl_ir::{CellKind, SigSpec};
use sv2rtl_utils::Sv2RtlResult;

impl Lowerer<'_> {
    pub(crate) fn lower_operation(&mut self, op: OpKind, operands: &[Expr]) -> Sv2RtlResult<Value> {
        if let Some(arity) = op.arity() {
            if operands.len() != arity {
                self.warn(format!(
                    "operator `{}` expects {} operands, got {}",
                    op,
                    arity,
                    operands.len()
                ));
                return Ok(Value::default());
            }
        }
        match op {
            OpKind::Concat => self.lower_concat(operands),
            OpKind::MultiConcat => {
                let Some((count, rest)) = operands.split_first() else {
                    return Ok(Value::default());
                };
                let Some(n) = self.fold_int(count) else {
                    self.warn("replication count is not constant");
                    return Ok(Value::default());
                };
                let inner = self.lower_concat(rest)?;
                let mut sig = SigSpec::new();
                for _ in 0..n.max(0) {
                    sig.append(&inner.sig);
                }
                Ok(Value::unsigned(sig))
            }
            OpKind::Conditional => {
                self.lower_conditional(&operands[0], &operands[1], &operands[2])
            }
            _ if op.arity() == Some(1) => {
                let a = self.lower_value(&operands[0])?;
                Ok(self.unary_op(op, a))
            }
            _ => {
                let a = self.lower_value(&operands[0])?;
                let b = self.lower_value(&operands[1])?;
                Ok(self.binary_op(op, a, b))
            }
        }
    }

    /// `{a, b, c}`: the first operand ends up in the most significant bits.
    fn lower_concat(&mut self, operands: &[Expr]) -> Sv2RtlResult<Value> {
        let parts = operands
            .iter()
            .map(|e| self.lower_value(e))
            .collect::<Sv2RtlResult<Vec<_>>>()?;
        let mut sig = SigSpec::new();
        for part in parts.iter().rev() {
            sig.append(&part.sig);
        }
        Ok(Value::unsigned(sig))
    }

    /// `c ? t : e` as a `$mux` with `A = e`, `B = t`.
    fn lower_conditional(&mut self, c: &Expr, t: &Expr, e: &Expr) -> Sv2RtlResult<Value> {
        let cond = self.lower_value(c)?;
        let then_v = self.lower_value(t)?;
        let else_v = self.lower_value(e)?;
        if cond.is_empty() {
            return Ok(Value::default());
        }
        let cond = self.reduce_bool(cond);
        let (else_v, then_v) = align_pair(&else_v, &then_v);
        let y = self.builder().mux(&else_v.sig, &then_v.sig, &cond);
        Ok(Value::new(y, then_v.signed))
    }

    /// Reduce a value to one bit that is set when any bit is set.
    pub(crate) fn reduce_bool(&mut self, v: Value) -> SigSpec {
        if v.width() == 1 {
            v.sig
        } else {
            self.builder().unary(CellKind::ReduceBool, &v.sig, v.signed, 1)
        }
    }

    fn bool_cell(&mut self, kind: CellKind, a: &Value) -> Value {
        Value::unsigned(self.builder().unary(kind, &a.sig, a.signed, 1))
    }

    pub(crate) fn unary_op(&mut self, op: OpKind, a: Value) -> Value {
        if a.is_empty() {
            return a;
        }
        let same_width = |kind| (kind, a.width(), a.signed);
        let (kind, width, signed) = match op {
            OpKind::BitNeg => same_width(CellKind::Not),
            OpKind::Minus => same_width(CellKind::Neg),
            OpKind::Plus => same_width(CellKind::Pos),
            OpKind::LogicNot => return self.bool_cell(CellKind::LogicNot, &a),
            OpKind::ReductionAnd => return self.bool_cell(CellKind::ReduceAnd, &a),
            OpKind::ReductionOr => return self.bool_cell(CellKind::ReduceOr, &a),
            OpKind::ReductionXor => return self.bool_cell(CellKind::ReduceXor, &a),
            OpKind::ReductionXnor => return self.bool_cell(CellKind::ReduceXnor, &a),
            OpKind::ReductionNand => {
                let r = self.bool_cell(CellKind::ReduceAnd, &a);
                return self.bool_cell(CellKind::LogicNot, &r);
            }
            OpKind::ReductionNor => {
                let r = self.bool_cell(CellKind::ReduceOr, &a);
                return self.bool_cell(CellKind::LogicNot, &r);
            }
            _ => {
                self.warn(format!("`{}` is not a unary operator", op));
                return Value::default();
            }
        };
        Value::new(self.builder().unary(kind, &a.sig, a.signed, width), signed)
    }

    pub(crate) fn binary_op(&mut self, op: OpKind, a: Value, b: Value) -> Value {
        use OpKind::*;
        if a.is_empty() || b.is_empty() {
            return Value::default();
        }
        let wide = a.width().max(b.width());
        let arith = |kind, width| (kind, width, a.signed || b.signed);
        let (kind, width, signed) = match op {
            LogicAnd | LogicOr => {
                let kind = if op == LogicAnd {
                    CellKind::LogicAnd
                } else {
                    CellKind::LogicOr
                };
                let y = self
                    .builder()
                    .binary(kind, (&a.sig, a.signed), (&b.sig, b.signed), 1);
                return Value::unsigned(y);
            }
            BitAnd | BitOr | BitXor | BitXnor => {
                let kind = match op {
                    BitAnd => CellKind::And,
                    BitOr => CellKind::Or,
                    BitXor => CellKind::Xor,
                    _ => CellKind::Xnor,
                };
                let (a, b) = align_pair(&a, &b);
                let y = self
                    .builder()
                    .binary(kind, (&a.sig, a.signed), (&b.sig, b.signed), wide);
                return Value::new(y, a.signed);
            }
            Add => arith(CellKind::Add, wide + 1),
            Sub => arith(CellKind::Sub, wide + 1),
            Mult => arith(CellKind::Mul, a.width() + b.width()),
            Div => arith(CellKind::Div, wide),
            Mod => arith(CellKind::Mod, wide),
            Power => (CellKind::Pow, a.width(), a.signed),
            LShift | RShift | ArithLShift | ArithRShift => {
                let kind = match op {
                    LShift => CellKind::Shl,
                    RShift => CellKind::Shr,
                    ArithLShift => CellKind::Sshl,
                    _ => CellKind::Sshr,
                };
                let y = self
                    .builder()
                    .binary(kind, (&a.sig, a.signed), (&b.sig, false), a.width());
                return Value::new(y, a.signed);
            }
            Eq | Neq | CaseEq | CaseNeq | WildEq | WildNeq | Lt | Le | Gt | Ge => {
                let kind = match op {
                    Eq => CellKind::Eq,
                    Neq => CellKind::Ne,
                    CaseEq => CellKind::Eqx,
                    CaseNeq => CellKind::Nex,
                    WildEq => {
                        self.warn("wildcard equality is lowered as `==`");
                        CellKind::Eq
                    }
                    WildNeq => {
                        self.warn("wildcard inequality is lowered as `!=`");
                        CellKind::Ne
                    }
                    Lt => CellKind::Lt,
                    Le => CellKind::Le,
                    Gt => CellKind::Gt,
                    _ => CellKind::Ge,
                };
                let (a, b) = align_pair(&a, &b);
                let y = self
                    .builder()
                    .binary(kind, (&a.sig, a.signed), (&b.sig, b.signed), 1);
                return Value::unsigned(y);
            }
            _ => {
                self.warn(format!("`{}` is not a binary operator", op));
                return Value::default();
            }
        };
        let (a_sig, b_sig) = if kind == CellKind::Pow {
            (a.sig.clone(), b.sig.clone())
        } else {
            (align(&a, width), align(&b, width))
        };
        let y = self
            .builder()
            .binary(kind, (&a_sig, a.signed), (&b_sig, b.signed), width);
        Value::new(y, signed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{expr, lit, module, r, with_lowerer};
    use serde_json::json;
    use sv2rtl_ir::CellKind;

    fn op(op: &str, operands: Vec<serde_json::Value>) -> sv2rtl_frontend::Expr {
        expr(json!({ "kind": "operation", "op": op, "operands": operands }))
    }

    fn cell_kinds(l: &crate::Lowerer) -> Vec<sv2rtl_utils::Id> {
        l.module.cells.iter().map(|c| c.borrow().ty).collect()
    }

    #[test]
    fn concatenation_puts_first_operand_on_top() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let v = l.lower_expr(&op("concat", vec![r("b"), r("c")])).unwrap();
            assert_eq!(v.width(), 5);
            let top = &v.bits()[4];
            let b = l.module.find_wire("b").unwrap();
            assert_eq!(*top, sv2rtl_ir::SigBit::Wire { wire: b, offset: 3 });
            let rep = op("multi_concat", vec![lit(3), r("b")]);
            assert_eq!(l.lower_expr(&rep).unwrap().width(), 12);
        });
    }

    #[test]
    fn arithmetic_widths() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            assert_eq!(l.lower_expr(&op("add", vec![r("a"), r("b")])).unwrap().width(), 9);
            assert_eq!(l.lower_expr(&op("mult", vec![r("a"), r("b")])).unwrap().width(), 12);
            assert_eq!(l.lower_expr(&op("div", vec![r("a"), r("b")])).unwrap().width(), 8);
            assert_eq!(l.lower_expr(&op("l_shift", vec![r("b"), r("a")])).unwrap().width(), 4);
            assert_eq!(l.lower_expr(&op("lt", vec![r("a"), r("b")])).unwrap().width(), 1);
        });
    }

    #[test]
    fn nand_is_reduce_then_not() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let v = l.lower_expr(&op("reduction_nand", vec![r("a")])).unwrap();
            assert_eq!(v.width(), 1);
            assert_eq!(cell_kinds(l), vec!["$reduce_and", "$logic_not"]);
        });
    }

    #[test]
    fn conditional_extends_the_narrow_operand() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let e = op("conditional", vec![
                r("b"),
                json!({ "kind": "constant", "value": "BIN:101" }),
                json!({ "kind": "constant", "value": "BIN:0" }),
            ]);
            let v = l.lower_expr(&e).unwrap();
            assert_eq!(v.width(), 3);
            let mux = l
                .module
                .cells
                .iter()
                .find(|c| c.borrow().is_kind(CellKind::Mux))
                .unwrap()
                .clone();
            let mux = mux.borrow();
            assert_eq!(mux.get_port("A").unwrap().width(), 3);
            assert_eq!(mux.get_port("B").unwrap().as_const().unwrap().as_i64(false), Some(5));
            assert_eq!(mux.get_port("S").unwrap().width(), 1);
            assert_eq!(cell_kinds(l), vec!["$reduce_bool", "$mux"]);
        });
    }
}
