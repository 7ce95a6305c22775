//! Behavioral processes: decision trees of assignments plus sync rules.
use crate::{Attributes, GetAttributes, SigSpec};
use smallvec::SmallVec;
use sv2rtl_utils::{GetName, Id};

/// `assign lhs rhs` inside a case rule or `update lhs rhs` in a sync rule.
pub type Action = (SigSpec, SigSpec);

/// A case of a switch. Actions are performed before nested switches.
#[derive(Debug, Clone, Default)]
pub struct CaseRule {
    /// Values the switch signal is compared against. Empty for `default`.
    pub compare: SmallVec<[SigSpec; 1]>,
    pub actions: Vec<Action>,
    pub switches: Vec<SwitchRule>,
    pub attributes: Attributes,
}

impl CaseRule {
    pub fn with_compare(compare: SmallVec<[SigSpec; 1]>) -> Self {
        Self {
            compare,
            ..Default::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self.compare.is_empty()
    }

    /// Visit this case and every case nested below it.
    pub fn for_each_case<F>(&self, f: &mut F)
    where
        F: FnMut(&CaseRule),
    {
        f(self);
        for sw in &self.switches {
            for case in &sw.cases {
                case.for_each_case(f);
            }
        }
    }
}

/// A switch over a signal.
#[derive(Debug, Clone, Default)]
pub struct SwitchRule {
    pub signal: SigSpec,
    pub cases: Vec<CaseRule>,
    pub attributes: Attributes,
}

impl SwitchRule {
    pub fn new(signal: SigSpec) -> Self {
        Self {
            signal,
            ..Default::default()
        }
    }

    /// A switch over nothing with one default case. Used to order actions
    /// after earlier switches of the same case.
    pub fn sequencing() -> Self {
        Self {
            signal: SigSpec::new(),
            cases: vec![CaseRule::default()],
            attributes: Attributes::default(),
        }
    }

    pub fn is_sequencing(&self) -> bool {
        self.signal.is_empty()
            && self.cases.len() == 1
            && self.cases[0].is_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    Low,
    High,
    Posedge,
    Negedge,
    Edge,
    Always,
    Global,
    Init,
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncType::Low => "low",
            SyncType::High => "high",
            SyncType::Posedge => "posedge",
            SyncType::Negedge => "negedge",
            SyncType::Edge => "edge",
            SyncType::Always => "always",
            SyncType::Global => "global",
            SyncType::Init => "init",
        })
    }
}

/// When the updates of a process take effect.
#[derive(Debug, Clone)]
pub struct SyncRule {
    pub ty: SyncType,
    /// Triggering signal. Empty for `always`, `global` and `init`.
    pub signal: SigSpec,
    pub actions: Vec<Action>,
}

impl SyncRule {
    pub fn new(ty: SyncType, signal: SigSpec) -> Self {
        Self {
            ty,
            signal,
            actions: vec![],
        }
    }

    pub fn always() -> Self {
        Self::new(SyncType::Always, SigSpec::new())
    }
}

#[derive(Debug, Clone)]
pub struct Process {
    pub name: Id,
    pub root_case: CaseRule,
    pub syncs: Vec<SyncRule>,
    pub attributes: Attributes,
}

impl Process {
    pub fn new(name: Id) -> Self {
        Self {
            name,
            root_case: CaseRule::default(),
            syncs: vec![],
            attributes: Attributes::default(),
        }
    }
}

impl GetName for Process {
    fn name(&self) -> Id {
        self.name
    }
}

impl GetAttributes for Process {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}
