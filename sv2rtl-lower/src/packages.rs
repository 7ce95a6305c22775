//! Parameters, types and functions declared in packages.
//!
//! Every entry is reachable both under its qualified `pkg::name` and under
//! its bare name. Bare names follow first-declaration-wins.
use crate::LowerConf;
use crate::const_eval::{FunctionTable, Interpreter, Limits};
use crate::width::resolve_type;
use std::collections::HashMap;
use sv2rtl_frontend::ast::{self, FunctionDef, TypeSpec};
use sv2rtl_frontend::eval::{reduce_expr, size_of};
use sv2rtl_frontend::{ConstEnv, Expr, Folded};
use sv2rtl_utils::Id;

#[derive(Debug, Default)]
pub struct PackageTables<'a> {
    params: HashMap<Id, Folded>,
    typedefs: HashMap<Id, &'a TypeSpec>,
    functions: HashMap<Id, &'a FunctionDef>,
}

fn qualified(package: Id, name: Id) -> Id {
    Id::from(format!("{}::{}", package, name))
}

impl<'a> PackageTables<'a> {
    /// Collect the contents of every package in `design`. Parameters are
    /// folded in declaration order so that later ones may refer to earlier
    /// ones, to package types and to package functions.
    pub fn build(design: &'a ast::Design, conf: &LowerConf) -> Self {
        let mut tables = PackageTables::default();
        for pkg in &design.packages {
            for func in &pkg.functions {
                tables.functions.insert(qualified(pkg.name, func.name), func);
                tables.functions.entry(func.name).or_insert(func);
            }
            for td in &pkg.typedefs {
                tables.typedefs.insert(qualified(pkg.name, td.name), &td.typespec);
                tables.typedefs.entry(td.name).or_insert(&td.typespec);
            }
        }

        let limits = Limits::from(conf);
        for pkg in &design.packages {
            for td in &pkg.typedefs {
                let items = enum_items(&td.typespec, &PackageEnv::new(&tables, limits));
                for (name, value) in items {
                    tables.insert_param(pkg.name, name, value);
                }
            }
            for param in &pkg.params {
                let env = PackageEnv::new(&tables, limits);
                match typed_param(&param.value, param.typespec.as_ref(), &env) {
                    Some(v) => tables.insert_param(pkg.name, param.name, v),
                    None => log::warn!(
                        "cannot evaluate package parameter `{}::{}`",
                        pkg.name,
                        param.name
                    ),
                }
            }
        }
        tables
    }

    fn insert_param(&mut self, package: Id, name: Id, value: Folded) {
        self.params.insert(qualified(package, name), value);
        self.params.entry(name).or_insert(value);
    }

    /// A parameter or enum item, by bare or qualified name.
    pub fn param(&self, name: Id) -> Option<Folded> {
        self.params.get(&name).copied()
    }

    pub fn typedef(&self, name: Id, package: Option<Id>) -> Option<&'a TypeSpec> {
        let key = package.map_or(name, |p| qualified(p, name));
        self.typedefs.get(&key).copied()
    }

    pub fn function(&self, name: Id, package: Option<Id>) -> Option<&'a FunctionDef> {
        let key = package.map_or(name, |p| qualified(p, name));
        self.functions.get(&key).copied()
    }
}

/// Evaluation environment while the tables are being filled.
struct PackageEnv<'t, 'a> {
    tables: &'t PackageTables<'a>,
    limits: Limits,
}

impl<'t, 'a> PackageEnv<'t, 'a> {
    fn new(tables: &'t PackageTables<'a>, limits: Limits) -> Self {
        Self { tables, limits }
    }
}

impl ConstEnv for PackageEnv<'_, '_> {
    fn lookup(&self, name: Id) -> Option<Folded> {
        self.tables.param(name)
    }

    fn call(&self, name: Id, package: Option<Id>, args: &[Folded]) -> Option<Folded> {
        let func = self.tables.function(name, package)?;
        Interpreter::new(self, self, self.limits).call(func, args)
    }

    fn typedef(&self, name: Id, package: Option<Id>) -> Option<TypeSpec> {
        self.tables.typedef(name, package).cloned()
    }
}

impl FunctionTable for PackageEnv<'_, '_> {
    fn function(&self, name: Id, package: Option<Id>) -> Option<&FunctionDef> {
        self.tables.function(name, package)
    }
}

/// Fold a parameter value and convert it to its declared type, if any.
pub(crate) fn typed_param(
    value: &Expr,
    typespec: Option<&TypeSpec>,
    env: &dyn ConstEnv,
) -> Option<Folded> {
    let v = reduce_expr(value, env)?;
    let Some(ts) = typespec else {
        return Some(v);
    };
    let ts = resolve_type(ts, env);
    match size_of(&ts, env) {
        Some(w) if (1..=64).contains(&w) => {
            Some(v.resize(w as u32).with_sign(ts.is_signed()))
        }
        _ => Some(v),
    }
}

/// Values of the items of an enum type. Items without an explicit value
/// take the previous value plus one, starting from zero.
pub(crate) fn enum_items(ts: &TypeSpec, env: &dyn ConstEnv) -> Vec<(Id, Folded)> {
    let TypeSpec::Enum { base, items } = ts else {
        return vec![];
    };
    let base = resolve_type(base, env);
    let width = size_of(&base, env).unwrap_or(32).clamp(1, 64) as u32;
    let signed = base.is_signed();
    let mut next = Folded::new(0, width, signed);
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let value = match &item.value {
            Some(e) => match reduce_expr(e, env) {
                Some(v) => v.resize(width).with_sign(signed),
                None => {
                    log::warn!("cannot evaluate enum item `{}`", item.name);
                    next
                }
            },
            None => next,
        };
        out.push((item.name, value));
        next = Folded::new(value.value.wrapping_add(1), width, signed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn design() -> ast::Design {
        serde_json::from_value(json!({
            "packages": [{
                "name": "cfg",
                "typedefs": [{ "name": "state_t", "typespec": {
                    "kind": "enum",
                    "base": { "kind": "logic", "ranges": [{
                        "left": { "kind": "constant", "value": "INT:1" },
                        "right": { "kind": "constant", "value": "INT:0" } }] },
                    "items": [
                        { "name": "IDLE" },
                        { "name": "RUN", "value": { "kind": "constant", "value": "INT:2" } },
                        { "name": "DONE" }
                    ] } }],
                "functions": [{
                    "name": "twice",
                    "return_type": { "kind": "int", "int_kind": "int" },
                    "io": [{ "name": "x", "direction": "input",
                             "typespec": { "kind": "int", "int_kind": "int" } }],
                    "body": { "kind": "return", "value": { "kind": "operation", "op": "mult",
                        "operands": [{ "kind": "ref", "name": "x" },
                                     { "kind": "constant", "value": "INT:2" }] } }
                }],
                "params": [
                    { "name": "WIDTH", "value": { "kind": "constant", "value": "INT:8" } },
                    { "name": "DOUBLE", "value": { "kind": "func_call", "name": "twice",
                        "args": [{ "kind": "ref", "name": "WIDTH" }] } },
                    { "name": "NARROW", "typespec": { "kind": "logic", "ranges": [{
                        "left": { "kind": "constant", "value": "INT:2" },
                        "right": { "kind": "constant", "value": "INT:0" } }] },
                      "value": { "kind": "constant", "value": "INT:13" } }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn params_fold_in_order() {
        let d = design();
        let t = PackageTables::build(&d, &LowerConf::default());
        assert_eq!(t.param("WIDTH".into()).map(|v| v.value), Some(8));
        assert_eq!(t.param("cfg::DOUBLE".into()).map(|v| v.value), Some(16));
        let narrow = t.param("NARROW".into()).unwrap();
        assert_eq!((narrow.value, narrow.width), (5, 3));
    }

    #[test]
    fn enum_items_count_up() {
        let d = design();
        let t = PackageTables::build(&d, &LowerConf::default());
        assert_eq!(t.param("IDLE".into()).map(|v| v.value), Some(0));
        assert_eq!(t.param("cfg::RUN".into()).map(|v| v.value), Some(2));
        assert_eq!(t.param("DONE".into()).map(|v| (v.value, v.width)), Some((3, 2)));
    }

    #[test]
    fn qualified_lookups() {
        let d = design();
        let t = PackageTables::build(&d, &LowerConf::default());
        assert!(t.typedef("state_t".into(), Some("cfg".into())).is_some());
        assert!(t.typedef("state_t".into(), Some("other".into())).is_none());
        assert!(t.function("twice".into(), None).is_some());
    }
}
