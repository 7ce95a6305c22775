//! Decoding of hierarchical names that the elaborator left unresolved.
use crate::ast::{Design, ModuleDef, TypeSpec};
use crate::expr::Expr;
use sv2rtl_utils::Id;

/// What a hierarchical path refers to.
#[derive(Debug, Clone, Copy)]
pub enum HierTarget<'a> {
    /// `pkg::NAME` naming a package parameter.
    PackageParam { package: Id, value: &'a Expr },
    /// `inst.member` where `inst` is an interface instance in this module.
    InterfaceMember {
        instance: Id,
        interface: Id,
        member: Id,
        typespec: &'a TypeSpec,
    },
    /// `port.member` where `port` is an interface port of this module.
    InterfacePortMember {
        port: Id,
        interface: Id,
        member: Id,
        typespec: &'a TypeSpec,
    },
}

/// Resolve `path` as seen from `module`.
pub fn decode_hier_path<'a>(
    design: &'a Design,
    module: &'a ModuleDef,
    path: &str,
) -> Option<HierTarget<'a>> {
    if let Some((pkg, name)) = path.split_once("::") {
        let package = design.find_package(Id::from(pkg))?;
        let param = package.params.iter().find(|p| p.name == name)?;
        return Some(HierTarget::PackageParam {
            package: package.name,
            value: &param.value,
        });
    }

    let (head, member) = path.split_once('.')?;
    let (head, member) = (Id::from(head), Id::from(member));

    if let Some(inst) = module.find_instance(head) {
        let intf = design.find_interface(inst.module)?;
        let typespec = intf.member_type(member)?;
        return Some(HierTarget::InterfaceMember {
            instance: head,
            interface: intf.name,
            member,
            typespec,
        });
    }

    match &module.find_port(head)?.typespec {
        TypeSpec::Interface { name, .. } => {
            let intf = design.find_interface(*name)?;
            let typespec = intf.member_type(member)?;
            Some(HierTarget::InterfacePortMember {
                port: head,
                interface: intf.name,
                member,
                typespec,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design() -> Design {
        serde_json::from_value(serde_json::json!({
            "packages": [{
                "name": "cfg",
                "params": [{ "name": "DEPTH", "value": { "kind": "constant", "value": "INT:16" } }]
            }],
            "modules": [
                {
                    "name": "bus_if",
                    "kind": "interface",
                    "nets": [{ "name": "data", "typespec": { "kind": "logic", "ranges": [
                        { "left": { "kind": "constant", "value": "INT:7" },
                          "right": { "kind": "constant", "value": "INT:0" } }
                    ] } }]
                },
                {
                    "name": "top",
                    "ports": [{ "name": "p", "direction": "inout",
                                "typespec": { "kind": "interface", "name": "bus_if" } }],
                    "instances": [{ "name": "bus", "module": "bus_if" }]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn package_parameter() {
        let d = design();
        let top = d.find_module(Id::from("top")).unwrap();
        match decode_hier_path(&d, top, "cfg::DEPTH") {
            Some(HierTarget::PackageParam { package, .. }) => {
                assert_eq!(package, "cfg")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn interface_instance_and_port_members() {
        let d = design();
        let top = d.find_module(Id::from("top")).unwrap();
        assert!(matches!(
            decode_hier_path(&d, top, "bus.data"),
            Some(HierTarget::InterfaceMember { .. })
        ));
        assert!(matches!(
            decode_hier_path(&d, top, "p.data"),
            Some(HierTarget::InterfacePortMember { .. })
        ));
        assert!(decode_hier_path(&d, top, "bus.nope").is_none());
        assert!(decode_hier_path(&d, top, "nothing.data").is_none());
    }
}
