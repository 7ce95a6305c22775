//! Lowering of expressions into signals and cells.
//!
//! Every expression first goes through the constant folder. Only what does
//! not fold creates cells.
mod call;
mod ops;
mod select;

pub(crate) use select::SelectBase;

use crate::align::Value;
use crate::const_decode::decode_constant;
use crate::context::Lowerer;
use crate::names::Resolved;
use crate::width::{WIDTH_BUNDLE, resolve_type, type_width};
use sv2rtl_frontend::expr::{CastTarget, RefKind};
use sv2rtl_frontend::{Expr, Folded};
use sv2rtl_ir::{CellKind, Const, SigSpec, State};
use sv2rtl_utils::{Id, Sv2RtlResult};

/// A folded constant as a lowered value.
pub(crate) fn folded_value(v: Folded) -> Value {
    let mut c = Const::from_int(v.value, v.width);
    c.flags.signed = v.signed;
    Value::new(SigSpec::from(c), v.signed)
}

impl Lowerer<'_> {
    /// Lower `expr` to the signal carrying its value.
    pub fn lower_expr(&mut self, expr: &Expr) -> Sv2RtlResult<SigSpec> {
        Ok(self.lower_value(expr)?.sig)
    }

    /// Lower `expr` to its bits together with its signedness. Unsupported
    /// constructs produce an empty value.
    pub fn lower_value(&mut self, expr: &Expr) -> Sv2RtlResult<Value> {
        let try_fold = !matches!(
            expr,
            Expr::Constant { .. } | Expr::Cast { .. } | Expr::Unsupported { .. }
        );
        if try_fold {
            if let Some(v) = self.fold(expr) {
                return Ok(folded_value(v));
            }
        }

        match expr {
            Expr::Constant { value, size } => {
                let c = decode_constant(value, *size);
                let fill = *size == -1 && c.width() == 1 && value.starts_with("BIN:");
                Ok(Value {
                    signed: c.flags.signed,
                    sig: SigSpec::from(c),
                    fill,
                })
            }
            Expr::Ref { name, actual } => self.lower_ref(*name, *actual),
            Expr::HierPath { name } => self.lower_ref(*name, RefKind::Unknown),
            Expr::BitSelect { name, index } => self.lower_bit_select(*name, index),
            Expr::PartSelect { name, left, right } => {
                self.lower_part_select(*name, left, right)
            }
            Expr::IndexedPartSelect {
                name,
                base,
                width,
                descending,
            } => self.lower_indexed_part_select(*name, base, width, *descending),
            Expr::Operation { op, operands } => self.lower_operation(*op, operands),
            Expr::Cast { target, operand } => self.lower_cast(target, operand),
            Expr::SysFuncCall { name, args } => self.lower_sys_call(*name, args),
            Expr::FuncCall {
                name,
                package,
                args,
            } => self.lower_call(*name, *package, args),
            Expr::Unsupported { what } => {
                self.warn(format!("unsupported expression: {}", what));
                Ok(Value::default())
            }
        }
    }

    /// Current value of a named signal, seen through earlier blocking
    /// assignments.
    fn lower_ref(&mut self, name: Id, actual: RefKind) -> Sv2RtlResult<Value> {
        if actual == RefKind::Interface {
            if let Some(wire) = self.interface_placeholder(name) {
                return Ok(Value::unsigned(SigSpec::from_wire(&wire)));
            }
        }
        Ok(match self.resolve_name(name) {
            Resolved::Wire(wire) => {
                let signed = wire.borrow().signed;
                Value::new(self.rvalue.apply(&SigSpec::from_wire(&wire)), signed)
            }
            Resolved::Value(v) => Value {
                sig: self.rvalue.apply(&v.sig),
                ..v
            },
            Resolved::Memory(_) => {
                self.warn(format!("memory `{}` used as a value", name));
                Value::default()
            }
        })
    }

    fn lower_cast(&mut self, target: &CastTarget, operand: &Expr) -> Sv2RtlResult<Value> {
        let v = self.lower_value(operand)?;
        let (width, signed) = match target {
            CastTarget::Signed => return Ok(Value { signed: true, ..v }),
            CastTarget::Unsigned => return Ok(Value { signed: false, ..v }),
            CastTarget::Width { width } => match self.fold_int(width) {
                Some(w) if w > 0 => (w as u32, v.signed),
                _ => {
                    self.warn("cast to a non-constant width is ignored");
                    return Ok(v);
                }
            },
            CastTarget::Type { typespec } => {
                let w = type_width(typespec, &*self);
                if w == WIDTH_BUNDLE {
                    self.warn("cast to an interface type is ignored");
                    return Ok(v);
                }
                (w as u32, resolve_type(typespec, &*self).is_signed())
            }
        };
        if v.is_empty() {
            return Ok(v);
        }
        if let Some(c) = v.sig.as_const() {
            let c = match c.uniform_state() {
                Some(state) => Const::repeat(state, width),
                None => c.resized(width),
            };
            return Ok(Value::new(SigSpec::from(c), signed));
        }
        let y = self.builder().unary(CellKind::Pos, &v.sig, v.signed, width);
        Ok(Value::new(y, signed))
    }

    fn lower_sys_call(&mut self, name: Id, args: &[Expr]) -> Sv2RtlResult<Value> {
        let Some(first) = args.first() else {
            self.warn(format!("system function `{}` without arguments", name));
            return Ok(Value::default());
        };
        match name.as_str() {
            "$signed" => Ok(Value {
                signed: true,
                ..self.lower_value(first)?
            }),
            "$unsigned" => Ok(Value {
                signed: false,
                ..self.lower_value(first)?
            }),
            "$bits" => {
                let v = self.lower_value(first)?;
                Ok(folded_value(Folded::int(v.width() as i64)))
            }
            "$clog2" => {
                self.warn("argument of `$clog2` is not constant");
                Ok(Value::unsigned(SigSpec::from_state(State::Sx, 32)))
            }
            _ => {
                self.warn(format!(
                    "unsupported system function `{}`, using its first argument",
                    name
                ));
                self.lower_value(first)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{LowerConf, PackageTables};
    use serde_json::{Value as Json, json};
    use sv2rtl_frontend::ast;

    pub(crate) fn module(extra: Json) -> ast::Design {
        let mut m = json!({
            "name": "m",
            "nets": [
                { "name": "a", "typespec": logic(7, 0) },
                { "name": "b", "typespec": logic(3, 0) },
                { "name": "c", "typespec": logic(0, 0) },
                { "name": "up", "typespec": logic(0, 7) },
                { "name": "hi", "typespec": logic(11, 4) },
                { "name": "mem", "typespec": logic(7, 0), "unpacked": [
                    { "left": lit(0), "right": lit(15) }] }
            ]
        });
        if let (Some(m), Some(extra)) = (m.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                m.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(json!({ "modules": [m] })).unwrap()
    }

    pub(crate) fn lit(v: i64) -> Json {
        json!({ "kind": "constant", "value": format!("INT:{}", v) })
    }

    pub(crate) fn logic(l: i64, r: i64) -> Json {
        json!({ "kind": "logic", "ranges": [{ "left": lit(l), "right": lit(r) }] })
    }

    pub(crate) fn r(name: &str) -> Json {
        json!({ "kind": "ref", "name": name })
    }

    pub(crate) fn expr(v: Json) -> Expr {
        serde_json::from_value(v).unwrap()
    }

    /// Run `f` on a lowerer for the design with the nets imported.
    pub(crate) fn with_lowerer<F>(design: &ast::Design, f: F)
    where
        F: FnOnce(&mut Lowerer),
    {
        let conf = LowerConf::default();
        let packages = PackageTables::build(design, &conf);
        let mut l = Lowerer::new(design, &design.modules[0], &packages, &conf);
        l.import_declarations().unwrap();
        f(&mut l);
    }

    #[test]
    fn hex_literals_keep_their_width() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let v = l.lower_expr(&expr(json!({ "kind": "constant", "value": "HEX:ff" }))).unwrap();
            assert_eq!(v.width(), 8);
            assert_eq!(v.as_const().and_then(|c| c.as_i64(false)), Some(255));
            let v = l
                .lower_expr(&expr(json!({ "kind": "constant", "value": "HEX:ff", "size": 16 })))
                .unwrap();
            assert_eq!(v.width(), 16);
            assert_eq!(v.as_const().and_then(|c| c.as_i64(false)), Some(255));
        });
    }

    #[test]
    fn folded_expressions_create_no_cells() {
        let d = module(json!({
            "params": [{ "name": "W", "value": lit(6) }]
        }));
        with_lowerer(&d, |l| {
            let e = expr(json!({ "kind": "operation", "op": "add",
                                 "operands": [r("W"), lit(2)] }));
            let v = l.lower_value(&e).unwrap();
            assert_eq!(v.sig.as_const().and_then(|c| c.as_i64(false)), Some(8));
            assert!(l.module.cells.is_empty());
        });
    }

    #[test]
    fn uniform_constants_fill_casts() {
        let d = module(json!({}));
        with_lowerer(&d, |l| {
            let e = expr(json!({ "kind": "cast",
                "target": { "kind": "width", "width": lit(4) },
                "operand": { "kind": "constant", "value": "BIN:1", "size": 1 } }));
            let v = l.lower_expr(&e).unwrap();
            assert_eq!(v.as_const().and_then(|c| c.as_i64(false)), Some(15));
            let e = expr(json!({ "kind": "cast",
                "target": { "kind": "width", "width": lit(4) },
                "operand": r("a") }));
            assert_eq!(l.lower_expr(&e).unwrap().width(), 4);
            assert!(l.module.find_cell("$pos$1").is_some());
        });
    }
}
