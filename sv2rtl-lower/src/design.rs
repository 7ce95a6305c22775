//! Lowering of a whole design, one module definition at a time.
use crate::LowerConf;
use crate::context::Lowerer;
use crate::packages::PackageTables;
use std::collections::HashSet;
use sv2rtl_frontend::ast::{self, GenScope, Instance, ModuleDef, ModuleKind};
use sv2rtl_ir as ir;
use sv2rtl_ir::Attribute;
use sv2rtl_utils::{Id, Sv2RtlResult};

fn collect_instantiated(
    instances: &[Instance],
    scopes: &[GenScope],
    out: &mut HashSet<Id>,
) {
    out.extend(instances.iter().map(|inst| inst.module));
    for scope in scopes {
        collect_instantiated(&scope.instances, &scope.gen_scopes, out);
    }
}

/// Name of the top module: the one named by the configuration or the
/// design, otherwise the only module that is never instantiated.
pub fn find_top(design: &ast::Design, conf: &LowerConf) -> Option<Id> {
    if let Some(top) = conf.top.or(design.top) {
        if design.find_module(top).is_some() {
            return Some(top);
        }
        log::warn!("top module `{}` is not defined", top);
        return None;
    }

    let mut instantiated = HashSet::new();
    for def in &design.modules {
        collect_instantiated(&def.instances, &def.gen_scopes, &mut instantiated);
    }
    let mut roots = design
        .modules
        .iter()
        .filter(|def| def.kind == ModuleKind::Module && !instantiated.contains(&def.name));
    match (roots.next(), roots.next()) {
        (Some(def), None) => Some(def.name),
        (None, _) => None,
        (Some(_), Some(_)) => {
            log::info!("several modules are never instantiated, no top module is marked");
            None
        }
    }
}

/// Lower a single module definition.
pub fn lower_module(
    design: &ast::Design,
    def: &ModuleDef,
    packages: &PackageTables,
    conf: &LowerConf,
) -> Sv2RtlResult<ir::Module> {
    log::debug!("lowering module `{}`", def.name);
    let mut lowerer = Lowerer::new(design, def, packages, conf);
    lowerer
        .import_module()
        .map_err(|e| e.with_loc(def.loc.as_ref()))?;
    Ok(lowerer.finish())
}

/// Lower every module of `design`. Interfaces are only seen through the
/// members they contribute to the modules using them.
pub fn lower_design(design: &ast::Design, conf: &LowerConf) -> Sv2RtlResult<ir::Design> {
    let packages = PackageTables::build(design, conf);
    let top = find_top(design, conf);
    let mut out = ir::Design {
        modules: Vec::with_capacity(design.modules.len()),
        top,
    };
    for def in &design.modules {
        if def.kind == ModuleKind::Interface {
            log::debug!("skipping interface `{}`", def.name);
            continue;
        }
        let mut module = lower_module(design, def, &packages, conf)?;
        if Some(def.name) == top {
            module.attributes.set_bool(Attribute::Top);
        }
        out.modules.push(module);
    }
    log::info!(
        "lowered {} modules{}",
        out.modules.len(),
        top.map(|t| format!(", top `{}`", t)).unwrap_or_default()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn design(v: serde_json::Value) -> ast::Design {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn the_only_root_is_the_top() {
        let d = design(json!({
            "modules": [
                { "name": "leaf" },
                { "name": "bus", "kind": "interface" },
                { "name": "top", "gen_scopes": [{ "name": "g",
                    "instances": [{ "name": "u", "module": "leaf" }] }] }
            ]
        }));
        assert_eq!(find_top(&d, &LowerConf::default()), Some(Id::from("top")));
    }

    #[test]
    fn configured_top_wins() {
        let d = design(json!({
            "modules": [{ "name": "a" }, { "name": "b" }],
            "top": "a"
        }));
        assert_eq!(find_top(&d, &LowerConf::default()), Some(Id::from("a")));
        let conf = LowerConf {
            top: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(find_top(&d, &conf), Some(Id::from("b")));
        let conf = LowerConf {
            top: Some("c".into()),
            ..Default::default()
        };
        assert_eq!(find_top(&d, &conf), None);
    }

    #[test]
    fn ambiguous_roots_have_no_top() {
        let d = design(json!({ "modules": [{ "name": "a" }, { "name": "b" }] }));
        assert_eq!(find_top(&d, &LowerConf::default()), None);
    }

    #[test]
    fn interfaces_are_not_lowered() {
        let d = design(json!({
            "modules": [
                { "name": "bus", "kind": "interface" },
                { "name": "top", "instances": [{ "name": "b", "module": "bus" }] }
            ]
        }));
        let out = lower_design(&d, &LowerConf::default()).unwrap();
        assert_eq!(out.modules.len(), 1);
        let top = &out.modules[0];
        assert!(top.attributes.has(Attribute::Top));
        assert_eq!(out.top, Some(Id::from("top")));
    }
}
