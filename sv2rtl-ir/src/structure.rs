//! Representation for structure (wires, cells, memories) in an RTLIL module.
use crate::{Attributes, Const, GetAttributes, SigSpec};
use linked_hash_map::LinkedHashMap;
use strum_macros::{AsRefStr, Display};
use sv2rtl_utils::{GetName, Id, bits_needed_for};

/// A named, fixed-width signal owned by a module.
#[derive(Debug, Clone)]
pub struct Wire {
    pub name: Id,
    pub width: u32,
    /// Index of the least significant storage bit in the declared range.
    pub start_offset: i64,
    /// Declared with an ascending range (`[0:7]`).
    pub upto: bool,
    pub signed: bool,
    /// One-based position in the port list, `0` for internal wires.
    pub port_id: u32,
    pub port_input: bool,
    pub port_output: bool,
    pub attributes: Attributes,
}

impl Wire {
    pub fn new<S: Into<Id>>(name: S, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            start_offset: 0,
            upto: false,
            signed: false,
            port_id: 0,
            port_input: false,
            port_output: false,
            attributes: Attributes::default(),
        }
    }

    pub fn is_port(&self) -> bool {
        self.port_input || self.port_output
    }

    /// Storage offset of a declared index, if it lies within the wire.
    pub fn storage_index(&self, index: i64) -> Option<u32> {
        let offset = if self.upto {
            self.start_offset + self.width as i64 - 1 - index
        } else {
            index - self.start_offset
        };
        (0..self.width as i64)
            .contains(&offset)
            .then_some(offset as u32)
    }
}

impl GetName for Wire {
    fn name(&self) -> Id {
        self.name
    }
}

impl GetAttributes for Wire {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

/// Internal cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum CellKind {
    #[strum(serialize = "$not")]
    Not,
    #[strum(serialize = "$pos")]
    Pos,
    #[strum(serialize = "$neg")]
    Neg,
    #[strum(serialize = "$reduce_and")]
    ReduceAnd,
    #[strum(serialize = "$reduce_or")]
    ReduceOr,
    #[strum(serialize = "$reduce_xor")]
    ReduceXor,
    #[strum(serialize = "$reduce_xnor")]
    ReduceXnor,
    #[strum(serialize = "$reduce_bool")]
    ReduceBool,
    #[strum(serialize = "$logic_not")]
    LogicNot,
    #[strum(serialize = "$logic_and")]
    LogicAnd,
    #[strum(serialize = "$logic_or")]
    LogicOr,
    #[strum(serialize = "$and")]
    And,
    #[strum(serialize = "$or")]
    Or,
    #[strum(serialize = "$xor")]
    Xor,
    #[strum(serialize = "$xnor")]
    Xnor,
    #[strum(serialize = "$shl")]
    Shl,
    #[strum(serialize = "$shr")]
    Shr,
    #[strum(serialize = "$sshl")]
    Sshl,
    #[strum(serialize = "$sshr")]
    Sshr,
    #[strum(serialize = "$shiftx")]
    Shiftx,
    #[strum(serialize = "$lt")]
    Lt,
    #[strum(serialize = "$le")]
    Le,
    #[strum(serialize = "$eq")]
    Eq,
    #[strum(serialize = "$ne")]
    Ne,
    #[strum(serialize = "$eqx")]
    Eqx,
    #[strum(serialize = "$nex")]
    Nex,
    #[strum(serialize = "$ge")]
    Ge,
    #[strum(serialize = "$gt")]
    Gt,
    #[strum(serialize = "$add")]
    Add,
    #[strum(serialize = "$sub")]
    Sub,
    #[strum(serialize = "$mul")]
    Mul,
    #[strum(serialize = "$div")]
    Div,
    #[strum(serialize = "$mod")]
    Mod,
    #[strum(serialize = "$pow")]
    Pow,
    #[strum(serialize = "$mux")]
    Mux,
    #[strum(serialize = "$dff")]
    Dff,
    #[strum(serialize = "$adff")]
    Adff,
    #[strum(serialize = "$memrd")]
    MemRd,
    #[strum(serialize = "$memwr")]
    MemWr,
}

impl CellKind {
    /// Name prefix used for automatically named cells of this kind.
    pub fn tag(&self) -> &str {
        &self.as_ref()[1..]
    }

    /// Cells with one `A` input and a `Y` output.
    pub fn is_unary(&self) -> bool {
        use CellKind::*;
        matches!(
            self,
            Not | Pos
                | Neg
                | ReduceAnd
                | ReduceOr
                | ReduceXor
                | ReduceXnor
                | ReduceBool
                | LogicNot
        )
    }
}

/// An instance of an internal cell or of another module.
#[derive(Debug, Clone)]
pub struct Cell {
    pub name: Id,
    /// `$`-prefixed internal type or the name of an instantiated module.
    pub ty: Id,
    pub parameters: LinkedHashMap<Id, Const>,
    pub connections: LinkedHashMap<Id, SigSpec>,
    pub attributes: Attributes,
}

impl Cell {
    pub fn new(name: Id, ty: Id) -> Self {
        Self {
            name,
            ty,
            parameters: LinkedHashMap::new(),
            connections: LinkedHashMap::new(),
            attributes: Attributes::default(),
        }
    }

    pub fn set_port<S: Into<Id>>(&mut self, port: S, sig: SigSpec) {
        self.connections.insert(port.into(), sig);
    }

    pub fn get_port<S: Into<Id>>(&self, port: S) -> Option<&SigSpec> {
        self.connections.get(&port.into())
    }

    pub fn set_param<S: Into<Id>>(&mut self, param: S, value: Const) {
        self.parameters.insert(param.into(), value);
    }

    pub fn get_param<S: Into<Id>>(&self, param: S) -> Option<&Const> {
        self.parameters.get(&param.into())
    }

    /// Integer value of a parameter.
    pub fn param_int<S: Into<Id>>(&self, param: S) -> Option<i64> {
        self.get_param(param).and_then(|c| c.as_i64(false))
    }

    pub fn is_kind(&self, kind: CellKind) -> bool {
        self.ty == kind.as_ref()
    }
}

impl GetName for Cell {
    fn name(&self) -> Id {
        self.name
    }
}

impl GetAttributes for Cell {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

/// Word-addressed storage accessed through `$memrd`/`$memwr` cells.
#[derive(Debug, Clone)]
pub struct Memory {
    pub name: Id,
    pub width: u32,
    pub size: u32,
    pub start_offset: i64,
    pub attributes: Attributes,
}

impl Memory {
    pub fn new<S: Into<Id>>(name: S, width: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            width,
            size,
            start_offset: 0,
            attributes: Attributes::default(),
        }
    }

    /// Width of the address bus.
    pub fn abits(&self) -> u32 {
        bits_needed_for(self.size as u64) as u32
    }
}

impl GetName for Memory {
    fn name(&self) -> Id {
        self.name
    }
}

impl GetAttributes for Memory {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}
