//! Helpers shared by the integration tests: JSON builders for source
//! designs and a small evaluator for lowered processes.
#![allow(dead_code)]

use serde_json::{Value as Json, json};
use std::collections::HashMap;
use sv2rtl_frontend::ast;
use sv2rtl_ir::{self as ir, CaseRule, SigBit, SigSpec, State, SyncType};
use sv2rtl_lower::{LowerConf, lower_design};

pub fn int(v: i64) -> Json {
    json!({ "kind": "constant", "value": format!("INT:{}", v) })
}

/// An unsigned literal of `width` bits.
pub fn uint(v: u64, width: i64) -> Json {
    json!({ "kind": "constant", "value": format!("UINT:{}", v), "size": width })
}

pub fn logic(l: i64, r: i64) -> Json {
    json!({ "kind": "logic", "ranges": [{ "left": int(l), "right": int(r) }] })
}

pub fn r(name: &str) -> Json {
    json!({ "kind": "ref", "name": name })
}

pub fn op(op: &str, operands: Vec<Json>) -> Json {
    json!({ "kind": "operation", "op": op, "operands": operands })
}

pub fn assign(lhs: Json, rhs: Json) -> Json {
    json!({ "kind": "assign", "lhs": lhs, "rhs": rhs })
}

pub fn nonblocking(lhs: Json, rhs: Json) -> Json {
    json!({ "kind": "assign", "lhs": lhs, "rhs": rhs, "blocking": false })
}

pub fn begin(stmts: Vec<Json>) -> Json {
    json!({ "kind": "begin", "stmts": stmts })
}

pub fn port(name: &str, direction: &str, typespec: Json) -> Json {
    json!({ "name": name, "direction": direction, "typespec": typespec })
}

pub fn net(name: &str, typespec: Json) -> Json {
    json!({ "name": name, "typespec": typespec })
}

pub fn design(v: Json) -> ast::Design {
    serde_json::from_value(v).unwrap()
}

pub fn lower_with(v: Json, conf: &LowerConf) -> ir::Design {
    lower_design(&design(v), conf).unwrap()
}

pub fn lower(v: Json) -> ir::Design {
    lower_with(v, &LowerConf::default())
}

pub fn module<'d>(d: &'d ir::Design, name: &str) -> &'d ir::Module {
    d.find_module(name.into()).unwrap()
}

/// Evaluates the combinational part of a module: connections and the
/// `always` syncs of its processes. Cells are not evaluated.
#[derive(Default)]
pub struct Sim {
    values: HashMap<SigBit, State>,
}

impl Sim {
    pub fn set(&mut self, sig: &SigSpec, value: u64) {
        for (i, bit) in sig.bits().iter().enumerate() {
            let state = State::from_bool((value >> i) & 1 == 1);
            self.values.insert(bit.clone(), state);
        }
    }

    fn eval(&self, sig: &SigSpec) -> Vec<State> {
        sig.bits()
            .iter()
            .map(|bit| match bit {
                SigBit::Const(s) => *s,
                b => self.values.get(b).copied().unwrap_or(State::Sx),
            })
            .collect()
    }

    /// Value of `sig`, `None` while any bit is undefined.
    pub fn get(&self, sig: &SigSpec) -> Option<u64> {
        self.eval(sig)
            .iter()
            .enumerate()
            .try_fold(0u64, |acc, (i, s)| match s {
                State::S0 => Some(acc),
                State::S1 => Some(acc | 1u64 << i),
                _ => None,
            })
    }

    fn perform(&mut self, actions: &[ir::Action]) {
        for (lhs, rhs) in actions {
            let value = self.eval(rhs);
            for (bit, state) in lhs.bits().iter().zip(value) {
                self.values.insert(bit.clone(), state);
            }
        }
    }

    fn run_case(&mut self, case: &CaseRule) {
        self.perform(&case.actions);
        for sw in &case.switches {
            let signal = self.eval(&sw.signal);
            let matches = |compare: &SigSpec| {
                self.eval(compare)
                    .iter()
                    .zip(&signal)
                    .all(|(c, s)| *c == State::Sa || c == s)
            };
            let chosen = sw
                .cases
                .iter()
                .position(|c| c.is_default() || c.compare.iter().any(&matches));
            if let Some(idx) = chosen {
                self.run_case(&sw.cases[idx]);
            }
        }
    }

    /// Run everything that is not clocked until the values settle.
    pub fn settle(&mut self, module: &ir::Module) {
        for _ in 0..8 {
            for proc in module.processes.iter() {
                let proc = proc.borrow();
                if !proc.syncs.iter().all(|s| s.ty == SyncType::Always) {
                    continue;
                }
                self.run_case(&proc.root_case);
                for sync in &proc.syncs {
                    self.perform(&sync.actions);
                }
            }
            self.perform(&module.connections);
        }
    }
}

pub fn wire(module: &ir::Module, name: &str) -> SigSpec {
    SigSpec::from_wire(&module.find_wire(name).unwrap())
}
