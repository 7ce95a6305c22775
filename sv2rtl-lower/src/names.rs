//! Name resolution and the table of declared signals.
use crate::align::Value;
use crate::context::Lowerer;
use crate::expr::folded_value;
use crate::struct_path::struct_member_slice;
use crate::width::{TypeInfo, type_info};
use itertools::Itertools;
use std::collections::HashMap;
use std::rc::Rc;
use sv2rtl_frontend::{ConstEnv, Folded};
use sv2rtl_frontend::ast::TypeSpec;
use sv2rtl_frontend::hier::{HierTarget, decode_hier_path};
use sv2rtl_ir::{Attribute, Const, Memory, RRC, SigSpec, Wire};
use sv2rtl_utils::Id;

/// Declared wires and memories by source name, plus the declared type of
/// every wire.
#[derive(Debug, Default)]
pub struct SignalTable {
    wires: HashMap<Id, RRC<Wire>>,
    memories: HashMap<Id, RRC<Memory>>,
    /// Declared type by wire name.
    origins: HashMap<Id, TypeSpec>,
}

impl SignalTable {
    /// Register `wire` under `name`. The first registration wins.
    pub fn insert(&mut self, name: Id, wire: RRC<Wire>) -> bool {
        if self.wires.contains_key(&name) {
            return false;
        }
        self.wires.insert(name, wire);
        true
    }

    pub fn get(&self, name: Id) -> Option<RRC<Wire>> {
        self.wires.get(&name).map(Rc::clone)
    }

    pub fn insert_memory(&mut self, name: Id, mem: RRC<Memory>) -> bool {
        if self.memories.contains_key(&name) {
            return false;
        }
        self.memories.insert(name, mem);
        true
    }

    pub fn get_memory(&self, name: Id) -> Option<RRC<Memory>> {
        self.memories.get(&name).map(Rc::clone)
    }

    pub fn set_origin(&mut self, wire: Id, ts: TypeSpec) {
        self.origins.insert(wire, ts);
    }

    /// Declared type of the wire named `wire`.
    pub fn origin(&self, wire: Id) -> Option<&TypeSpec> {
        self.origins.get(&wire)
    }
}

/// What a name refers to.
#[derive(Debug, Clone)]
pub enum Resolved {
    Wire(RRC<Wire>),
    /// Constants and function-call locals.
    Value(Value),
    Memory(RRC<Memory>),
}

impl Lowerer<'_> {
    /// `name` prefixed with the enclosing generate scopes.
    pub(crate) fn qualify(&self, name: Id) -> Id {
        if self.scope.gen_path.is_empty() {
            name
        } else {
            Id::from(format!("{}.{}", self.scope.gen_path.iter().join("."), name))
        }
    }

    /// Wire for the signal declared as `name`. Declaring the same name
    /// again returns the existing wire.
    pub(crate) fn declare_wire(
        &mut self,
        name: Id,
        info: &TypeInfo,
        ts: Option<&TypeSpec>,
    ) -> RRC<Wire> {
        if let Some(wire) = self.signals.get(name) {
            return wire;
        }
        let wire = self.module.add_wire(name, info.width);
        {
            let mut w = wire.borrow_mut();
            w.start_offset = info.start_offset;
            w.upto = info.upto;
            w.signed = info.signed;
            w.attributes.set_src(self.src());
        }
        self.signals.insert(name, Rc::clone(&wire));
        if let Some(ts) = ts {
            let wire_name = wire.borrow().name;
            self.signals.set_origin(wire_name, ts.clone());
        }
        wire
    }

    pub(crate) fn declare_memory(
        &mut self,
        name: Id,
        width: u32,
        size: u32,
        start_offset: i64,
    ) -> RRC<Memory> {
        if let Some(mem) = self.signals.get_memory(name) {
            return mem;
        }
        let mem = self.module.add_memory(name, width, size);
        {
            let mut m = mem.borrow_mut();
            m.start_offset = start_offset;
            m.attributes.set_src(self.src());
        }
        self.signals.insert_memory(name, Rc::clone(&mem));
        mem
    }

    fn signal(&self, name: Id) -> Option<Resolved> {
        self.signals
            .get(name)
            .map(Resolved::Wire)
            .or_else(|| self.signals.get_memory(name).map(Resolved::Memory))
    }

    /// Look `name` up without creating anything: function locals, then
    /// parameters, then generate-scope qualified names from the innermost
    /// scope outwards, then plain names, then wires of the module.
    pub(crate) fn lookup_name(&self, name: Id) -> Option<Resolved> {
        for frame in self.scope.locals.iter().rev() {
            if let Some(v) = frame.get(&name) {
                return Some(Resolved::Value(v.clone()));
            }
        }
        if let Some(v) = self.lookup(name) {
            return Some(Resolved::Value(folded_value(v)));
        }
        let path = &self.scope.gen_path;
        for depth in (1..=path.len()).rev() {
            let qualified =
                Id::from(format!("{}.{}", path[..depth].iter().join("."), name));
            if let Some(r) = self.signal(qualified) {
                return Some(r);
            }
        }
        self.signal(name)
            .or_else(|| self.module.find_wire(name).map(Resolved::Wire))
    }

    /// Resolve `name`, falling back to dotted paths, interface placeholders
    /// and finally a fresh one-bit wire. Fallback wires are remembered.
    pub(crate) fn resolve_name(&mut self, name: Id) -> Resolved {
        if let Some(r) = self.lookup_name(name) {
            return r;
        }
        if name.as_str().contains('.') || name.as_str().contains("::") {
            if let Some(r) = self.resolve_dotted(name) {
                return r;
            }
        }
        if let Some(wire) = self.interface_placeholder(name) {
            return Resolved::Wire(wire);
        }
        self.warn(format!("identifier `{}` not found, creating a one-bit wire", name));
        Resolved::Wire(self.declare_wire(name, &TypeInfo::vector(1), None))
    }

    /// `base.member` into a struct, a package parameter, or a member of an
    /// interface instance or interface port.
    fn resolve_dotted(&mut self, name: Id) -> Option<Resolved> {
        let path = name.as_str();
        if let Some((head, rest)) = path.split_once('.') {
            if let Some(Resolved::Wire(wire)) = self.lookup_name(Id::from(head)) {
                let wire_name = wire.borrow().name;
                if let Some(ts) = self.signals.origin(wire_name) {
                    if let Some((offset, width)) = struct_member_slice(ts, rest, &*self) {
                        let sig = SigSpec::from_wire_slice(&wire, offset, width);
                        return Some(Resolved::Value(Value::unsigned(sig)));
                    }
                }
            }
        }

        match decode_hier_path(self.design, self.def, path)? {
            HierTarget::PackageParam { package, value } => match self.fold(value) {
                Some(v) => Some(Resolved::Value(folded_value(v))),
                None => {
                    self.warn(format!(
                        "cannot evaluate parameter `{}` of package `{}`",
                        name, package
                    ));
                    None
                }
            },
            HierTarget::InterfaceMember {
                instance,
                interface,
                typespec,
                ..
            } => {
                let def = self.def;
                let overrides = match def.find_instance(instance) {
                    Some(inst) => self.param_overrides(inst),
                    None => HashMap::new(),
                };
                self.interface_member(name, interface, &overrides, typespec)
            }
            // The connected instance is not known here: interface defaults.
            HierTarget::InterfacePortMember {
                interface,
                typespec,
                ..
            } => self.interface_member(name, interface, &HashMap::new(), typespec),
        }
    }

    /// Wire for a member of an interface, sized in the interface's own
    /// parameter scope.
    fn interface_member(
        &mut self,
        name: Id,
        interface: Id,
        overrides: &HashMap<Id, Folded>,
        typespec: &TypeSpec,
    ) -> Option<Resolved> {
        let design = self.design;
        let intf = design.find_interface(interface)?;
        let info = {
            let mut g = self.enter_scope();
            g.bind_interface_params(intf, overrides);
            type_info(typespec, &*g)
        };
        let info = info.unwrap_or(TypeInfo::vector(1));
        Some(Resolved::Wire(self.declare_wire(name, &info, Some(typespec))))
    }

    /// One-bit connector standing in for an interface instance or an
    /// interface port.
    pub(crate) fn interface_placeholder(&mut self, name: Id) -> Option<RRC<Wire>> {
        let (interface, modport) = match self.def.find_instance(name) {
            Some(inst) => (self.design.find_interface(inst.module)?.name, None),
            None => match &self.def.find_port(name)?.typespec {
                TypeSpec::Interface {
                    name: intf,
                    modport,
                } => (*intf, *modport),
                _ => return None,
            },
        };
        Some(self.interface_connector(name, interface, modport))
    }

    /// The placeholder wire `name` for an interface of type `interface`.
    pub(crate) fn interface_connector(
        &mut self,
        name: Id,
        interface: Id,
        modport: Option<Id>,
    ) -> RRC<Wire> {
        if let Some(wire) = self.signals.get(name) {
            return wire;
        }
        let wire = self.declare_wire(name, &TypeInfo::vector(1), None);
        {
            let mut w = wire.borrow_mut();
            w.attributes.set_bool(Attribute::IsInterface);
            w.attributes.insert(
                Attribute::InterfaceType,
                Const::from_string(&format!("\\{}", interface)),
            );
            if let Some(modport) = modport {
                w.attributes.insert(
                    Attribute::InterfaceModport,
                    Const::from_string(&format!("\\{}", modport)),
                );
            }
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LowerConf, PackageTables};
    use serde_json::json;
    use sv2rtl_frontend::ast;
    use sv2rtl_frontend::Folded;

    fn design() -> ast::Design {
        serde_json::from_value(json!({
            "modules": [
                { "name": "bus", "kind": "interface",
                  "nets": [{ "name": "data", "typespec": { "kind": "logic", "ranges": [{
                      "left": { "kind": "constant", "value": "INT:7" },
                      "right": { "kind": "constant", "value": "INT:0" } }] } }] },
                { "name": "m",
                  "instances": [{ "name": "b", "module": "bus" }] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn declaring_twice_returns_the_same_wire() {
        let d = design();
        let conf = LowerConf::default();
        let p = PackageTables::build(&d, &conf);
        let mut l = Lowerer::new(&d, &d.modules[1], &p, &conf);
        let a = l.declare_wire("x".into(), &TypeInfo::vector(4), None);
        let b = l.declare_wire("x".into(), &TypeInfo::vector(8), None);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(b.borrow().width, 4);
        assert_eq!(l.module.wires.len(), 1);
    }

    #[test]
    fn innermost_generate_scope_wins() {
        let d = design();
        let conf = LowerConf::default();
        let p = PackageTables::build(&d, &conf);
        let mut l = Lowerer::new(&d, &d.modules[1], &p, &conf);
        let outer = l.declare_wire("x".into(), &TypeInfo::vector(1), None);
        let inner = l.declare_wire("g.x".into(), &TypeInfo::vector(1), None);
        l.scope.gen_path.push("g".into());
        assert!(matches!(l.lookup_name("x".into()), Some(Resolved::Wire(w)) if Rc::ptr_eq(&w, &inner)));
        l.scope.gen_path.clear();
        assert!(matches!(l.lookup_name("x".into()), Some(Resolved::Wire(w)) if Rc::ptr_eq(&w, &outer)));
    }

    #[test]
    fn parameters_shadow_signals() {
        let d = design();
        let conf = LowerConf::default();
        let p = PackageTables::build(&d, &conf);
        let mut l = Lowerer::new(&d, &d.modules[1], &p, &conf);
        l.declare_wire("N".into(), &TypeInfo::vector(1), None);
        l.scope.params.insert("N".into(), Folded::int(3));
        let Some(Resolved::Value(v)) = l.lookup_name("N".into()) else {
            panic!("expected a constant");
        };
        assert_eq!(v.sig.as_const().and_then(|c| c.as_i64(false)), Some(3));
    }

    #[test]
    fn unknown_names_are_created_once() {
        let d = design();
        let conf = LowerConf::default();
        let p = PackageTables::build(&d, &conf);
        let mut l = Lowerer::new(&d, &d.modules[1], &p, &conf);
        let Resolved::Wire(a) = l.resolve_name("ghost".into()) else {
            panic!("expected a wire");
        };
        let Resolved::Wire(b) = l.resolve_name("ghost".into()) else {
            panic!("expected a wire");
        };
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.borrow().width, 1);
    }

    #[test]
    fn interface_members_and_placeholders() {
        let d = design();
        let conf = LowerConf::default();
        let p = PackageTables::build(&d, &conf);
        let mut l = Lowerer::new(&d, &d.modules[1], &p, &conf);
        let Resolved::Wire(data) = l.resolve_name("b.data".into()) else {
            panic!("expected a wire");
        };
        assert_eq!(data.borrow().width, 8);
        let Resolved::Wire(b) = l.resolve_name("b".into()) else {
            panic!("expected a wire");
        };
        let b = b.borrow();
        assert!(b.attributes.has(Attribute::IsInterface));
        assert_eq!(
            b.attributes.get(Attribute::InterfaceType).and_then(|c| c.decode_string()),
            Some("\\bus".to_string())
        );
    }

    #[test]
    fn interface_members_use_interface_parameters() {
        let int = |v: i64| json!({ "kind": "constant", "value": format!("INT:{}", v) });
        let d: ast::Design = serde_json::from_value(json!({
            "modules": [
                { "name": "bus", "kind": "interface",
                  "params": [{ "name": "W", "value": int(4) }],
                  "nets": [{ "name": "data", "typespec": { "kind": "logic", "ranges": [{
                      "left": { "kind": "operation", "op": "sub",
                                "operands": [{ "kind": "ref", "name": "W" }, int(1)] },
                      "right": int(0) }] } }] },
                { "name": "m",
                  "params": [{ "name": "W", "value": int(2) }],
                  "ports": [{ "name": "p", "direction": "inout",
                              "typespec": { "kind": "interface", "name": "bus" } }],
                  "instances": [{ "name": "b", "module": "bus",
                                  "params": [{ "name": "W", "value": int(16) }] }] }
            ]
        }))
        .unwrap();
        let conf = LowerConf::default();
        let p = PackageTables::build(&d, &conf);
        let mut l = Lowerer::new(&d, &d.modules[1], &p, &conf);
        l.scope.params.insert("W".into(), Folded::int(2));
        let width = |r: Resolved| match r {
            Resolved::Wire(w) => w.borrow().width,
            _ => panic!("expected a wire"),
        };
        assert_eq!(width(l.resolve_name("b.data".into())), 16);
        assert_eq!(width(l.resolve_name("p.data".into())), 4);
        // the module's own parameter is back in scope
        assert_eq!(l.scope.params.get(&Id::from("W")), Some(&Folded::int(2)));
    }
}
