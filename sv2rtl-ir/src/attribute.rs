use crate::Const;
use linked_hash_map::LinkedHashMap;
use sv2rtl_utils::{Id, SourceLoc};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// Defines the known attributes that can be attached to IR nodes.
pub enum Attribute {
    /// Source location the object was created from
    Src,
    Keep,
    /// Process-local temporary that holds no state
    NoSync,
    // Interface placeholders
    IsInterface,
    InterfaceType,
    InterfaceModport,
    /// Driven from a clocked process
    Reg,
    FullCase,
    ParallelCase,
    /// Top-level module of the design
    Top,
    /// Power-on value of a wire
    Init,
    /// Unknown attribute. Carried through unchanged.
    Unknown(Id),
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Src => "src",
            Attribute::Keep => "keep",
            Attribute::NoSync => "nosync",
            Attribute::IsInterface => "is_interface",
            Attribute::InterfaceType => "interface_type",
            Attribute::InterfaceModport => "interface_modport",
            Attribute::Reg => "reg",
            Attribute::FullCase => "full_case",
            Attribute::ParallelCase => "parallel_case",
            Attribute::Top => "top",
            Attribute::Init => "init",
            Attribute::Unknown(name) => name.as_str(),
        }
    }
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        match s {
            "src" => Attribute::Src,
            "keep" => Attribute::Keep,
            "nosync" => Attribute::NoSync,
            "is_interface" => Attribute::IsInterface,
            "interface_type" => Attribute::InterfaceType,
            "interface_modport" => Attribute::InterfaceModport,
            "reg" => Attribute::Reg,
            "full_case" => Attribute::FullCase,
            "parallel_case" => Attribute::ParallelCase,
            "top" => Attribute::Top,
            "init" => Attribute::Init,
            _ => Attribute::Unknown(Id::from(s)),
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes attached to a module, wire, cell, memory or process, in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    attrs: LinkedHashMap<Attribute, Const>,
}

impl Attributes {
    pub fn insert(&mut self, attr: Attribute, value: Const) {
        self.attrs.insert(attr, value);
    }

    /// Set a flag attribute (value `1`).
    pub fn set_bool(&mut self, attr: Attribute) {
        self.insert(attr, Const::from_int(1, 32));
    }

    /// Record where an object came from. Does nothing without a location.
    pub fn set_src(&mut self, loc: Option<&SourceLoc>) {
        if let Some(loc) = loc {
            self.insert(Attribute::Src, Const::from_string(&loc.to_string()));
        }
    }

    pub fn get(&self, attr: Attribute) -> Option<&Const> {
        self.attrs.get(&attr)
    }

    pub fn has(&self, attr: Attribute) -> bool {
        self.attrs.contains_key(&attr)
    }

    pub fn remove(&mut self, attr: Attribute) -> Option<Const> {
        self.attrs.remove(&attr)
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Attribute, &Const)> {
        self.attrs.iter()
    }
}

/// Structs that can return an [`Attributes`] instance.
pub trait GetAttributes {
    /// Returns an [`Attributes`] instance
    fn get_attributes(&self) -> &Attributes;

    /// Returns a mutable [`Attributes`] instance
    fn get_mut_attributes(&mut self) -> &mut Attributes;
}
