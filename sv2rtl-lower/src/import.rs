//! Declarations and module items of a module definition.
//!
//! Declarations are imported first so that items may refer to signals
//! declared after them, including signals of generate scopes and members
//! of interface instances.
use crate::align::align;
use crate::const_decode::decode_constant;
use crate::context::{Lowerer, ScopeGuard};
use crate::packages::{enum_items, typed_param};
use crate::stmt::Lvalue;
use crate::width::type_info;
use std::collections::HashMap;
use sv2rtl_frontend::ast::{
    ContAssign, Direction, GenScope, Instance, ModuleDef, NetDecl, NetKind, ParamDecl,
    PortDecl, Process, TypeSpec,
};
use sv2rtl_frontend::eval::eval_range;
use sv2rtl_frontend::{Expr, Folded};
use sv2rtl_ir::{Attribute, Const, SigSpec};
use sv2rtl_utils::{Id, Sv2RtlResult};

fn folded_const(v: Folded) -> Const {
    let mut c = Const::from_int(v.value, v.width);
    c.flags.signed = v.signed;
    c
}

impl<'a> Lowerer<'a> {
    /// Bind parameters in declaration order.
    fn bind_params(&mut self, params: &[ParamDecl]) {
        for param in params {
            match typed_param(&param.value, param.typespec.as_ref(), &*self) {
                Some(v) => {
                    self.scope.params.insert(param.name, v);
                }
                None => self.warn(format!("cannot evaluate parameter `{}`", param.name)),
            }
        }
    }

    fn bind_enum_items(&mut self, ts: &TypeSpec) {
        for (name, value) in enum_items(ts, &*self) {
            self.scope.params.entry(name).or_insert(value);
        }
    }

    /// Import typedefs, parameters, enum items, ports and nets of the
    /// module, and expand its interface instances.
    pub(crate) fn import_declarations(&mut self) -> Sv2RtlResult<()> {
        let def = self.def;
        for td in &def.typedefs {
            self.typedefs.insert(td.name, td.typespec.clone());
        }
        self.bind_params(&def.params);
        for td in &def.typedefs {
            self.bind_enum_items(&td.typespec);
        }
        for ts in def
            .ports
            .iter()
            .map(|p| &p.typespec)
            .chain(def.nets.iter().map(|n| &n.typespec))
        {
            self.bind_enum_items(ts);
        }

        for port in &def.ports {
            self.import_port(port);
        }
        self.declare_nets(&def.nets)?;
        self.expand_interfaces(&def.instances);
        Ok(())
    }

    fn import_port(&mut self, port: &PortDecl) {
        let mut g = self.enter_scope();
        g.set_loc(port.loc.as_ref());
        let Some(info) = type_info(&port.typespec, &*g) else {
            log::debug!("interface port `{}` of `{}`", port.name, g.def.name);
            return;
        };
        let wire = g.declare_wire(port.name, &info, Some(&port.typespec));
        let mut w = wire.borrow_mut();
        w.port_input = matches!(port.direction, Direction::Input | Direction::Inout);
        w.port_output = matches!(port.direction, Direction::Output | Direction::Inout);
    }

    fn declare_nets(&mut self, nets: &[NetDecl]) -> Sv2RtlResult<()> {
        for net in nets {
            self.declare_net(net);
        }
        for net in nets {
            if let Some(init) = &net.init {
                self.import_net_init(net, init)?;
            }
        }
        Ok(())
    }

    /// A wire, or a memory when the net has unpacked dimensions.
    fn declare_net(&mut self, net: &NetDecl) {
        let mut g = self.enter_scope();
        g.set_loc(net.loc.as_ref());
        let name = g.qualify(net.name);
        let Some(info) = type_info(&net.typespec, &*g) else {
            g.warn(format!("net `{}` of interface type is ignored", net.name));
            return;
        };
        let Some(dim) = net.unpacked.first() else {
            g.declare_wire(name, &info, Some(&net.typespec));
            return;
        };
        if net.unpacked.len() > 1 {
            g.warn(format!(
                "memory `{}` has {} unpacked dimensions, only the first is used",
                net.name,
                net.unpacked.len()
            ));
        }
        match eval_range(dim, &*g) {
            Some((l, r)) => {
                let size = l.abs_diff(r) + 1;
                g.declare_memory(name, info.width, size as u32, l.min(r));
            }
            None => g.warn(format!(
                "cannot evaluate the unpacked dimension of `{}`",
                net.name
            )),
        }
    }

    /// `wire w = e` drives `w` continuously. Initializers of variables set
    /// their power-on value.
    fn import_net_init(&mut self, net: &NetDecl, init: &Expr) -> Sv2RtlResult<()> {
        let mut g = self.enter_scope();
        g.set_loc(net.loc.as_ref());
        let name = g.qualify(net.name);
        let Some(wire) = g.signals.get(name) else {
            g.warn(format!("initializer of `{}` is ignored", net.name));
            return Ok(());
        };
        let width = wire.borrow().width;
        if net.kind == NetKind::Wire {
            let value = g.lower_value(init)?;
            g.module.connect(SigSpec::from_wire(&wire), align(&value, width));
            return Ok(());
        }
        match g.constant_of(init, width) {
            Some(c) => wire.borrow_mut().attributes.insert(Attribute::Init, c),
            None => g.warn(format!("initial value of `{}` is not constant", net.name)),
        }
        Ok(())
    }

    /// Instance parameters folded in the instantiating scope.
    pub(crate) fn param_overrides(&mut self, inst: &Instance) -> HashMap<Id, Folded> {
        let mut overrides = HashMap::with_capacity(inst.params.len());
        for p in &inst.params {
            match self.fold(&p.value) {
                Some(v) => {
                    overrides.insert(p.name, v);
                }
                None => self.warn(format!(
                    "cannot evaluate parameter `{}` of instance `{}`",
                    p.name, inst.name
                )),
            }
        }
        overrides
    }

    fn expand_interfaces(&mut self, instances: &[Instance]) {
        let design = self.design;
        for inst in instances {
            if let Some(intf) = design.find_interface(inst.module) {
                self.expand_interface(inst, intf);
            }
        }
    }

    /// Replace the parameters in scope with those of `intf`, taking
    /// `overrides` before defaults.
    pub(crate) fn bind_interface_params(
        &mut self,
        intf: &ModuleDef,
        overrides: &HashMap<Id, Folded>,
    ) {
        self.scope.params.clear();
        for param in &intf.params {
            let value = match overrides.get(&param.name) {
                Some(v) => Some(*v),
                None => typed_param(&param.value, param.typespec.as_ref(), &*self),
            };
            if let Some(v) = value {
                self.scope.params.insert(param.name, v);
            }
        }
    }

    /// Declare an `inst.member` wire for every signal of the interface and
    /// the connector standing in for the instance itself.
    fn expand_interface(&mut self, inst: &Instance, intf: &ModuleDef) {
        let overrides = self.param_overrides(inst);
        let name = self.qualify(inst.name);
        let mut g = self.enter_scope();
        g.set_loc(inst.loc.as_ref());
        g.bind_interface_params(intf, &overrides);
        let members = intf
            .nets
            .iter()
            .filter(|n| n.unpacked.is_empty())
            .map(|n| (n.name, &n.typespec))
            .chain(intf.ports.iter().map(|p| (p.name, &p.typespec)));
        for (member, ts) in members {
            let Some(info) = type_info(ts, &*g) else {
                continue;
            };
            g.declare_wire(Id::from(format!("{}.{}", name, member)), &info, Some(ts));
        }
        g.interface_connector(name, intf.name, None);
        log::debug!("expanded interface instance `{}` of `{}`", name, intf.name);
    }

    /// Import everything in the module definition.
    pub fn import_module(&mut self) -> Sv2RtlResult<()> {
        let def = self.def;
        self.set_loc(def.loc.as_ref());
        self.import_declarations()?;
        for scope in &def.gen_scopes {
            self.declare_gen_scope(scope)?;
        }
        self.import_items(&def.instances, &def.cont_assigns, &def.processes)?;
        for scope in &def.gen_scopes {
            self.import_gen_scope(scope)?;
        }
        log::debug!(
            "imported `{}`: {} wires, {} cells, {} processes",
            def.name,
            self.module.wires.len(),
            self.module.cells.len(),
            self.module.processes.len()
        );
        Ok(())
    }

    fn enter_gen_scope(&mut self, scope: &GenScope) -> ScopeGuard<'_, 'a> {
        let mut g = self.enter_scope();
        g.set_loc(scope.loc.as_ref());
        g.scope.gen_path.push(scope.name);
        g.bind_params(&scope.params);
        g
    }

    fn declare_gen_scope(&mut self, scope: &GenScope) -> Sv2RtlResult<()> {
        let mut g = self.enter_gen_scope(scope);
        g.declare_nets(&scope.nets)?;
        g.expand_interfaces(&scope.instances);
        for inner in &scope.gen_scopes {
            g.declare_gen_scope(inner)?;
        }
        Ok(())
    }

    fn import_gen_scope(&mut self, scope: &GenScope) -> Sv2RtlResult<()> {
        let mut g = self.enter_gen_scope(scope);
        g.import_items(&scope.instances, &scope.cont_assigns, &scope.processes)?;
        for inner in &scope.gen_scopes {
            g.import_gen_scope(inner)?;
        }
        Ok(())
    }

    fn import_items(
        &mut self,
        instances: &[Instance],
        assigns: &[ContAssign],
        processes: &[Process],
    ) -> Sv2RtlResult<()> {
        for inst in instances {
            self.import_instance(inst)?;
        }
        for assign in assigns {
            self.import_cont_assign(assign)?;
        }
        for proc in processes {
            self.lower_process(proc)?;
        }
        Ok(())
    }

    /// Value of an instance parameter as a cell parameter.
    fn param_const(&self, expr: &Expr) -> Option<Const> {
        match expr {
            Expr::Constant { value, size } => Some(decode_constant(value, *size)),
            e => self.fold(e).map(folded_const),
        }
    }

    /// A module instance becomes a cell of the module's type.
    fn import_instance(&mut self, inst: &Instance) -> Sv2RtlResult<()> {
        let design = self.design;
        if design.find_interface(inst.module).is_some() {
            return Ok(());
        }
        let mut g = self.enter_scope();
        g.set_loc(inst.loc.as_ref());
        if design.find_module(inst.module).is_none() {
            g.warn(format!(
                "module `{}` of instance `{}` is not defined",
                inst.module, inst.name
            ));
        }

        let mut params = Vec::with_capacity(inst.params.len());
        for p in &inst.params {
            match g.param_const(&p.value) {
                Some(c) => params.push((p.name, c)),
                None => g.warn(format!(
                    "cannot evaluate parameter `{}` of instance `{}`",
                    p.name, inst.name
                )),
            }
        }
        let mut ports = Vec::with_capacity(inst.connections.len());
        for conn in &inst.connections {
            if let Some(expr) = &conn.expr {
                ports.push((conn.port, g.lower_expr(expr)?));
            }
        }

        let name = g.qualify(inst.name);
        let src = g.src().cloned();
        let cell = g.module.add_cell(name, inst.module);
        let mut c = cell.borrow_mut();
        c.attributes.set_src(src.as_ref());
        for (param, value) in params {
            c.set_param(param, value);
        }
        for (port, sig) in ports {
            c.set_port(port, sig);
        }
        Ok(())
    }

    fn import_cont_assign(&mut self, assign: &ContAssign) -> Sv2RtlResult<()> {
        let mut g = self.enter_scope();
        g.set_loc(assign.loc.as_ref());
        let value = g.lower_value(&assign.rhs)?;
        let target = match g.lower_lvalue(&assign.lhs)? {
            Lvalue::Signal(sig) => sig,
            Lvalue::None => return Ok(()),
            _ => {
                g.warn(format!(
                    "unsupported continuous assignment to {}",
                    assign.lhs.describe()
                ));
                return Ok(());
            }
        };
        if value.width() != target.width() && !value.fill && !value.sig.is_fully_const() {
            g.warn(format!(
                "width mismatch in continuous assignment: {} bits driven by {} bits",
                target.width(),
                value.width()
            ));
        }
        let rhs = align(&value, target.width());
        g.module.connect(target, rhs);
        Ok(())
    }
}
