use crate::{
    Attributes, Cell, GetAttributes, Memory, Process, RRC, SigSpec, Wire, rrc,
};
use linked_hash_map::LinkedHashMap;
use std::rc::Rc;
use sv2rtl_utils::{GetName, Id, NameGenerator};

/// In memory representation of an RTLIL module.
#[derive(Debug)]
pub struct Module {
    /// Name of the module.
    pub name: Id,
    pub wires: IdList<Wire>,
    pub cells: IdList<Cell>,
    pub memories: IdList<Memory>,
    pub processes: IdList<Process>,
    /// Continuous connections, `lhs` driven by `rhs`.
    pub connections: Vec<(SigSpec, SigSpec)>,
    pub attributes: Attributes,

    ///// Internal structures
    /// Namegenerator that contains the names currently defined in this
    /// module (wires, cells, memories and processes share one namespace).
    namegen: NameGenerator,
}

/// Builder methods for extracting and construction IR nodes.
/// The naming scheme for methods is consistent:
/// - find_<construct>: Returns a reference to the construct with the given
///   name.
/// - add_<construct>: Adds a construct with a name that is unique in this
///   module, uniquifying the requested name when it is taken.
impl Module {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            wires: IdList::default(),
            cells: IdList::default(),
            memories: IdList::default(),
            processes: IdList::default(),
            connections: vec![],
            attributes: Attributes::default(),
            namegen: NameGenerator::default(),
        }
    }

    /// Generate a unique name starting with `prefix`.
    pub fn generate_name<S: Into<Id>>(&mut self, prefix: S) -> Id {
        self.namegen.gen_name(prefix)
    }

    /// Generate an internal `$<tag>$<n>` name.
    pub fn auto_name(&mut self, tag: &str) -> Id {
        self.namegen.gen_auto(tag)
    }

    pub fn is_name_taken(&self, name: Id) -> bool {
        self.namegen.is_defined(name)
    }

    pub fn find_wire<S: Into<Id>>(&self, name: S) -> Option<RRC<Wire>> {
        self.wires.find(name)
    }

    pub fn find_cell<S: Into<Id>>(&self, name: S) -> Option<RRC<Cell>> {
        self.cells.find(name)
    }

    pub fn find_memory<S: Into<Id>>(&self, name: S) -> Option<RRC<Memory>> {
        self.memories.find(name)
    }

    pub fn find_process<S: Into<Id>>(&self, name: S) -> Option<RRC<Process>> {
        self.processes.find(name)
    }

    pub fn add_wire<S: Into<Id>>(&mut self, name: S, width: u32) -> RRC<Wire> {
        let name = self.generate_name(name);
        let wire = rrc(Wire::new(name, width));
        self.wires.add(Rc::clone(&wire));
        wire
    }

    pub fn add_cell<S, T>(&mut self, name: S, ty: T) -> RRC<Cell>
    where
        S: Into<Id>,
        T: Into<Id>,
    {
        let name = self.generate_name(name);
        let cell = rrc(Cell::new(name, ty.into()));
        self.cells.add(Rc::clone(&cell));
        cell
    }

    pub fn add_memory<S: Into<Id>>(
        &mut self,
        name: S,
        width: u32,
        size: u32,
    ) -> RRC<Memory> {
        let name = self.generate_name(name);
        let mem = rrc(Memory::new(name, width, size));
        self.memories.add(Rc::clone(&mem));
        mem
    }

    pub fn add_process<S: Into<Id>>(&mut self, name: S) -> RRC<Process> {
        let name = self.generate_name(name);
        let proc = rrc(Process::new(name));
        self.processes.add(Rc::clone(&proc));
        proc
    }

    /// Drive `lhs` from `rhs`. The signals must have the same width.
    pub fn connect(&mut self, lhs: SigSpec, rhs: SigSpec) {
        debug_assert_eq!(lhs.width(), rhs.width(), "connection width mismatch");
        self.connections.push((lhs, rhs));
    }

    /// Number the ports in the order they were added.
    pub fn fixup_ports(&mut self) {
        let mut port_id = 0;
        for wire in self.wires.iter() {
            let mut wire = wire.borrow_mut();
            if wire.is_port() {
                port_id += 1;
                wire.port_id = port_id;
            } else {
                wire.port_id = 0;
            }
        }
    }

    /// Ports in port-id order.
    pub fn ports(&self) -> Vec<RRC<Wire>> {
        let mut ports = self
            .wires
            .iter()
            .filter(|w| w.borrow().is_port())
            .cloned()
            .collect::<Vec<_>>();
        ports.sort_by_key(|w| w.borrow().port_id);
        ports
    }
}

impl GetName for Module {
    fn name(&self) -> Id {
        self.name
    }
}

impl GetAttributes for Module {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

/// A lowered design: an ordered collection of modules.
#[derive(Debug, Default)]
pub struct Design {
    pub modules: Vec<Module>,
    pub top: Option<Id>,
}

impl Design {
    pub fn find_module(&self, name: Id) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// A wrapper struct exposing an ordered collection of named entities within an
/// RRC with deterministic iteration and constant-time look-up on names
/// directly. The struct assumes that the name of an entity cannot change. Doing
/// so will introduce incorrect results for look-ups.
#[derive(Debug)]
pub struct IdList<T: GetName>(LinkedHashMap<Id, RRC<T>>);

impl<T: GetName> Default for IdList<T> {
    fn default() -> Self {
        IdList(LinkedHashMap::new())
    }
}

/// Simple iter impl delegating to the [`Values`](linked_hash_map::Values).
impl<'a, T: GetName> IntoIterator for &'a IdList<T> {
    type Item = &'a RRC<T>;

    type IntoIter = linked_hash_map::Values<'a, Id, RRC<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}

impl<T: GetName> IdList<T> {
    /// Returns true if there are no elements in the list.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // Length of the underlying storage.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add a new element to the colleciton
    pub fn add(&mut self, item: RRC<T>) {
        let name = item.borrow().name();
        self.0.insert(name, item);
    }

    // Remove and return the element with the given name.
    pub fn remove<S>(&mut self, name: S) -> Option<RRC<T>>
    where
        S: Into<Id>,
    {
        self.0.remove(&name.into())
    }

    /// Returns an iterator over immutable references
    pub fn iter(&self) -> impl Clone + Iterator<Item = &RRC<T>> {
        self.0.values()
    }

    /// Returns the element indicated by the name, if present, otherwise None.
    pub fn find<S>(&self, name: S) -> Option<RRC<T>>
    where
        S: Into<Id>,
    {
        self.0.get(&name.into()).map(Rc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_across_kinds() {
        let mut m = Module::new("m");
        let w = m.add_wire("x", 4);
        let c = m.add_cell("x", "$and");
        assert_eq!(w.borrow().name, "x");
        assert_eq!(c.borrow().name, "x0");
        assert!(m.find_wire("x").is_some());
        assert!(m.find_cell("x0").is_some());
    }

    #[test]
    fn ports_are_numbered_in_order() {
        let mut m = Module::new("m");
        let a = m.add_wire("a", 1);
        m.add_wire("internal", 1);
        let y = m.add_wire("y", 1);
        a.borrow_mut().port_input = true;
        y.borrow_mut().port_output = true;
        m.fixup_ports();
        assert_eq!(a.borrow().port_id, 1);
        assert_eq!(y.borrow().port_id, 2);
        assert_eq!(m.ports().len(), 2);
    }
}
