//! Elaboration-time constant folding and size evaluation.
//!
//! Values are carried as 64-bit integers together with their width and
//! signedness. Anything wider than 64 bits, or containing unknown bits, does
//! not fold.
use crate::ast::{Range, TypeSpec};
use crate::expr::{CastTarget, Expr, OpKind};
use crate::literal::literal_value;
use std::cmp;
use sv2rtl_utils::{Id, clog2};

/// A folded constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Folded {
    /// The value, sign-extended when `signed`, zero-extended otherwise.
    pub value: i64,
    pub width: u32,
    pub signed: bool,
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl Folded {
    pub fn new(value: i64, width: u32, signed: bool) -> Self {
        let width = cmp::min(width, 64);
        let value = if width == 0 {
            0
        } else if width == 64 {
            value
        } else {
            let m = mask(width);
            let v = (value as u64) & m;
            if signed && (v >> (width - 1)) & 1 == 1 {
                (v | !m) as i64
            } else {
                v as i64
            }
        };
        Self {
            value,
            width,
            signed,
        }
    }

    /// A 32-bit signed `int`.
    pub fn int(value: i64) -> Self {
        Self::new(value, 32, true)
    }

    pub fn bool(b: bool) -> Self {
        Self::new(b as i64, 1, false)
    }

    /// The raw bit pattern.
    pub fn bits(&self) -> u64 {
        (self.value as u64) & mask(self.width)
    }

    pub fn is_true(&self) -> bool {
        self.bits() != 0
    }

    /// Zero- or sign-extend (per the value's signedness) or truncate.
    pub fn resize(self, width: u32) -> Self {
        Self::new(self.value, width, self.signed)
    }

    /// Reinterpret the bit pattern with a different signedness.
    pub fn with_sign(self, signed: bool) -> Self {
        Self::new(self.bits() as i64, self.width, signed)
    }

    /// The value as seen in an expression of the given signedness.
    fn extended(&self, signed: bool) -> i128 {
        if signed {
            self.value as i128
        } else {
            self.bits() as i128
        }
    }
}

/// Scope information the folder needs from its caller.
pub trait ConstEnv {
    /// Value of a parameter, enum item or loop variable.
    fn lookup(&self, name: Id) -> Option<Folded>;

    /// Result of calling a constant function.
    fn call(
        &self,
        _name: Id,
        _package: Option<Id>,
        _args: &[Folded],
    ) -> Option<Folded> {
        None
    }

    /// Definition of a named type.
    fn typedef(&self, _name: Id, _package: Option<Id>) -> Option<TypeSpec> {
        None
    }

    /// Width of a named signal, for `$bits`.
    fn width_of(&self, _name: Id) -> Option<u64> {
        None
    }
}

/// Fold an expression to a constant.
pub fn reduce_expr(expr: &Expr, env: &dyn ConstEnv) -> Option<Folded> {
    match expr {
        Expr::Constant { value, size } => {
            let (v, natural, signed) = literal_value(value)?;
            let width = if *size > 0 { *size as u64 } else { natural };
            if width > 64 || natural > 64 {
                return None;
            }
            // Literals are zero-extended to their declared width.
            let v = Folded::new(v, natural as u32, false).bits() as i64;
            Some(Folded::new(v, width as u32, signed))
        }
        Expr::Ref { name, .. } | Expr::HierPath { name } => env.lookup(*name),
        Expr::BitSelect { name, index } => {
            let base = env.lookup(*name)?;
            let idx = reduce_expr(index, env)?.value;
            if idx < 0 || idx >= base.width as i64 {
                return None;
            }
            Some(Folded::new(((base.bits() >> idx) & 1) as i64, 1, false))
        }
        Expr::PartSelect { name, left, right } => {
            let base = env.lookup(*name)?;
            let l = reduce_expr(left, env)?.value;
            let r = reduce_expr(right, env)?.value;
            slice(base, cmp::min(l, r), l.abs_diff(r).checked_add(1)?)
        }
        Expr::IndexedPartSelect {
            name,
            base,
            width,
            descending,
        } => {
            let value = env.lookup(*name)?;
            let b = reduce_expr(base, env)?.value;
            let w = reduce_expr(width, env)?.value;
            let (lo, _) = indexed_range(b, w, *descending)?;
            slice(value, lo, w as u64)
        }
        Expr::Operation { op, operands } => fold_operation(*op, operands, env),
        Expr::Cast { target, operand } => {
            let v = reduce_expr(operand, env)?;
            match target {
                CastTarget::Width { width } => {
                    let w = reduce_expr(width, env)?.value;
                    if !(1..=64).contains(&w) {
                        return None;
                    }
                    Some(v.resize(w as u32))
                }
                CastTarget::Type { typespec } => {
                    let w = size_of(typespec, env)?;
                    if w > 64 {
                        return None;
                    }
                    Some(v.resize(w as u32).with_sign(typespec.is_signed()))
                }
                CastTarget::Signed => Some(v.with_sign(true)),
                CastTarget::Unsigned => Some(v.with_sign(false)),
            }
        }
        Expr::SysFuncCall { name, args } => fold_sys_call(*name, args, env),
        Expr::FuncCall {
            name,
            package,
            args,
        } => {
            let args = args
                .iter()
                .map(|a| reduce_expr(a, env))
                .collect::<Option<Vec<_>>>()?;
            env.call(*name, *package, &args)
        }
        Expr::Unsupported { .. } => None,
    }
}

/// Bounds `(lo, hi)` of `[base +: width]`, or of `[base -: width]` when
/// `descending`. `None` for non-positive widths or bounds outside `i64`.
pub fn indexed_range(base: i64, width: i64, descending: bool) -> Option<(i64, i64)> {
    if width <= 0 {
        return None;
    }
    if descending {
        Some((base.checked_sub(width - 1)?, base))
    } else {
        Some((base, base.checked_add(width - 1)?))
    }
}

fn slice(base: Folded, lo: i64, width: u64) -> Option<Folded> {
    if lo < 0 || (lo as u64).checked_add(width)? > base.width as u64 {
        return None;
    }
    Some(Folded::new((base.bits() >> lo) as i64, width as u32, false))
}

fn fold_sys_call(
    name: Id,
    args: &[Expr],
    env: &dyn ConstEnv,
) -> Option<Folded> {
    let first = args.first()?;
    match name.as_str() {
        "$clog2" => {
            let v = reduce_expr(first, env)?;
            Some(Folded::int(clog2(v.bits()) as i64))
        }
        "$bits" => {
            let width = match first {
                Expr::Ref { name, .. } => env
                    .typedef(*name, None)
                    .and_then(|ts| size_of(&ts, env))
                    .or_else(|| env.width_of(*name)),
                _ => None,
            };
            let width = match width {
                Some(w) => w,
                None => reduce_expr(first, env)?.width as u64,
            };
            Some(Folded::int(width as i64))
        }
        "$signed" => Some(reduce_expr(first, env)?.with_sign(true)),
        "$unsigned" => Some(reduce_expr(first, env)?.with_sign(false)),
        _ => None,
    }
}

fn fold_operation(
    op: OpKind,
    operands: &[Expr],
    env: &dyn ConstEnv,
) -> Option<Folded> {
    use OpKind::*;
    if let Some(arity) = op.arity() {
        if operands.len() != arity {
            return None;
        }
    }
    match op {
        Concat => {
            let mut acc = Folded::new(0, 0, false);
            for e in operands {
                let v = reduce_expr(e, env)?;
                acc = concat(acc, v)?;
            }
            Some(acc)
        }
        MultiConcat => {
            let (count, rest) = operands.split_first()?;
            let count = reduce_expr(count, env)?.value;
            let inner = fold_operation(Concat, rest, env)?;
            let mut acc = Folded::new(0, 0, false);
            for _ in 0..count.max(0) {
                acc = concat(acc, inner)?;
            }
            Some(acc)
        }
        Conditional => {
            let cond = reduce_expr(&operands[0], env)?;
            let (taken, other) = if cond.is_true() {
                (&operands[1], &operands[2])
            } else {
                (&operands[2], &operands[1])
            };
            let v = reduce_expr(taken, env)?;
            match reduce_expr(other, env) {
                Some(o) if o.width > v.width => Some(v.resize(o.width)),
                _ => Some(v),
            }
        }
        _ if op.arity() == Some(1) => {
            fold_unary(op, reduce_expr(&operands[0], env)?)
        }
        _ => {
            let a = reduce_expr(&operands[0], env)?;
            let b = reduce_expr(&operands[1], env)?;
            fold_binary(op, a, b)
        }
    }
}

fn concat(msb: Folded, lsb: Folded) -> Option<Folded> {
    let width = msb.width + lsb.width;
    if width > 64 {
        return None;
    }
    let v = if lsb.width >= 64 {
        lsb.bits()
    } else {
        (msb.bits() << lsb.width) | lsb.bits()
    };
    Some(Folded::new(v as i64, width, false))
}

fn fold_unary(op: OpKind, a: Folded) -> Option<Folded> {
    use OpKind::*;
    let ones = a.bits().count_ones();
    Some(match op {
        LogicNot => Folded::bool(!a.is_true()),
        BitNeg => Folded::new(!a.value, a.width, a.signed),
        Minus => Folded::new(a.value.wrapping_neg(), a.width, a.signed),
        Plus => a,
        ReductionAnd => Folded::bool(ones == a.width),
        ReductionNand => Folded::bool(ones != a.width),
        ReductionOr => Folded::bool(ones > 0),
        ReductionNor => Folded::bool(ones == 0),
        ReductionXor => Folded::bool(ones % 2 == 1),
        ReductionXnor => Folded::bool(ones % 2 == 0),
        _ => return None,
    })
}

fn fold_binary(op: OpKind, a: Folded, b: Folded) -> Option<Folded> {
    use OpKind::*;
    let signed = a.signed && b.signed;
    let (x, y) = (a.extended(signed), b.extended(signed));
    let wide = cmp::max(a.width, b.width);
    let arith = |v: i128, w: u32| Folded::new(v as i64, cmp::min(w, 64), signed);
    Some(match op {
        Add => arith(x.wrapping_add(y), wide + 1),
        Sub => arith(x.wrapping_sub(y), wide + 1),
        Mult => arith(x.wrapping_mul(y), a.width + b.width),
        Div => arith(x.checked_div(y)?, wide),
        Mod => arith(x.checked_rem(y)?, wide),
        Power => {
            let exp = u32::try_from(b.value).ok()?;
            Folded::new(x.wrapping_pow(exp) as i64, a.width, a.signed)
        }
        BitAnd => arith(x & y, wide),
        BitOr => arith(x | y, wide),
        BitXor => arith(x ^ y, wide),
        BitXnor => arith(!(x ^ y), wide),
        LogicAnd => Folded::bool(a.is_true() && b.is_true()),
        LogicOr => Folded::bool(a.is_true() || b.is_true()),
        Eq | CaseEq | WildEq => Folded::bool(x == y),
        Neq | CaseNeq | WildNeq => Folded::bool(x != y),
        Lt => Folded::bool(x < y),
        Le => Folded::bool(x <= y),
        Gt => Folded::bool(x > y),
        Ge => Folded::bool(x >= y),
        LShift | ArithLShift => {
            let sh = b.bits();
            let v = if sh >= 64 { 0 } else { a.bits() << sh };
            Folded::new(v as i64, a.width, a.signed)
        }
        RShift => {
            let sh = b.bits();
            let v = if sh >= 64 { 0 } else { a.bits() >> sh };
            Folded::new(v as i64, a.width, a.signed)
        }
        ArithRShift => {
            let sh = cmp::min(b.bits(), 63);
            let v = if a.signed {
                a.value >> sh
            } else if b.bits() >= 64 {
                0
            } else {
                (a.bits() >> sh) as i64
            };
            Folded::new(v, a.width, a.signed)
        }
        _ => return None,
    })
}

/// Fold both bounds of a range.
pub fn eval_range(range: &Range, env: &dyn ConstEnv) -> Option<(i64, i64)> {
    let l = reduce_expr(&range.left, env)?.value;
    let r = reduce_expr(&range.right, env)?.value;
    Some((l, r))
}

/// Width of a type in bits. `None` for interfaces and types whose size
/// cannot be evaluated.
pub fn size_of(ts: &TypeSpec, env: &dyn ConstEnv) -> Option<u64> {
    match ts {
        TypeSpec::Logic { ranges, .. } => {
            ranges.iter().try_fold(1u64, |acc, r| {
                let (l, r) = eval_range(r, env)?;
                acc.checked_mul((l - r).unsigned_abs() + 1)
            })
        }
        TypeSpec::Int { int_kind, .. } => Some(int_kind.width()),
        TypeSpec::Struct { members, .. } => members
            .iter()
            .try_fold(0u64, |acc, m| Some(acc + size_of(&m.typespec, env)?)),
        TypeSpec::Enum { base, .. } => size_of(base, env),
        TypeSpec::Interface { .. } => None,
        TypeSpec::Alias {
            name,
            package,
            actual,
        } => match actual {
            Some(actual) => size_of(actual, env),
            None => size_of(&env.typedef(*name, *package)?, env),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Params(HashMap<Id, Folded>);

    impl ConstEnv for Params {
        fn lookup(&self, name: Id) -> Option<Folded> {
            self.0.get(&name).copied()
        }
    }

    fn op(op: OpKind, operands: Vec<Expr>) -> Expr {
        Expr::Operation { op, operands }
    }

    fn lit(value: &str, size: i64) -> Expr {
        Expr::Constant {
            value: value.to_string(),
            size,
        }
    }

    #[test]
    fn folds_parameter_arithmetic() {
        let mut env = Params::default();
        env.0.insert(Id::from("WIDTH"), Folded::int(8));
        let e = op(OpKind::Sub, vec![Expr::reference("WIDTH"), Expr::int(1)]);
        let v = reduce_expr(&e, &env).unwrap();
        assert_eq!(v.value, 7);
        assert_eq!(v.width, 33);
        assert!(v.signed);
    }

    #[test]
    fn sized_literals_zero_extend() {
        let env = Params::default();
        let v = reduce_expr(&lit("HEX:ff", 16), &env).unwrap();
        assert_eq!((v.value, v.width), (255, 16));
        let v = reduce_expr(&lit("BIN:1010", 2), &env).unwrap();
        assert_eq!((v.value, v.width), (2, 2));
    }

    #[test]
    fn unknown_bits_do_not_fold() {
        let env = Params::default();
        assert_eq!(reduce_expr(&lit("BIN:1x", 0), &env), None);
        assert_eq!(reduce_expr(&Expr::reference("sig"), &env), None);
    }

    #[test]
    fn concat_and_replication() {
        let env = Params::default();
        let e = op(OpKind::Concat, vec![lit("BIN:1", 0), lit("HEX:0", 0)]);
        assert_eq!(reduce_expr(&e, &env).unwrap().value, 0b10000);
        let e = op(OpKind::MultiConcat, vec![Expr::int(3), lit("BIN:10", 0)]);
        let v = reduce_expr(&e, &env).unwrap();
        assert_eq!((v.value, v.width), (0b101010, 6));
    }

    #[test]
    fn signed_comparison_needs_both_signed() {
        let env = Params::default();
        let lt = op(OpKind::Lt, vec![Expr::int(-1), Expr::int(0)]);
        assert!(reduce_expr(&lt, &env).unwrap().is_true());
        let lt = op(OpKind::Lt, vec![Expr::int(-1), lit("UINT:0", 0)]);
        assert!(!reduce_expr(&lt, &env).unwrap().is_true());
    }

    #[test]
    fn indexed_selects_at_the_integer_limits() {
        assert_eq!(indexed_range(7, 4, true), Some((4, 7)));
        assert_eq!(indexed_range(4, 4, false), Some((4, 7)));
        assert_eq!(indexed_range(i64::MIN, 2, true), None);
        assert_eq!(indexed_range(i64::MAX, 2, false), None);
        assert_eq!(indexed_range(0, 0, false), None);

        let mut env = Params::default();
        env.0.insert(Id::from("v"), Folded::new(0xf0, 8, false));
        env.0.insert(Id::from("lo"), Folded::new(i64::MIN, 64, true));
        env.0.insert(Id::from("hi"), Folded::new(i64::MAX, 64, true));
        let sel = |base: &str, descending| Expr::IndexedPartSelect {
            name: Id::from("v"),
            base: Box::new(Expr::reference(base)),
            width: Box::new(Expr::int(2)),
            descending,
        };
        assert_eq!(reduce_expr(&sel("lo", true), &env), None);
        assert_eq!(reduce_expr(&sel("hi", false), &env), None);
        let part = Expr::PartSelect {
            name: Id::from("v"),
            left: Box::new(Expr::reference("hi")),
            right: Box::new(Expr::reference("lo")),
        };
        assert_eq!(reduce_expr(&part, &env), None);
        let nibble = Expr::IndexedPartSelect {
            name: Id::from("v"),
            base: Box::new(Expr::int(7)),
            width: Box::new(Expr::int(4)),
            descending: true,
        };
        assert_eq!(reduce_expr(&nibble, &env).map(|v| v.value), Some(0xf));
    }

    #[test]
    fn clog2_and_struct_sizes() {
        let env = Params::default();
        let e = Expr::SysFuncCall {
            name: Id::from("$clog2"),
            args: vec![Expr::int(17)],
        };
        assert_eq!(reduce_expr(&e, &env).unwrap().value, 5);
        let ts = TypeSpec::Struct {
            members: vec![
                crate::ast::StructMember {
                    name: Id::from("a"),
                    typespec: TypeSpec::vector(4),
                },
                crate::ast::StructMember {
                    name: Id::from("b"),
                    typespec: TypeSpec::default(),
                },
            ],
            packed: true,
        };
        assert_eq!(size_of(&ts, &env), Some(5));
    }
}
