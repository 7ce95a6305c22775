mod common;

use common::*;
use serde_json::{Value as Json, json};
use sv2rtl_ir::{Attribute, CaseRule, SigSpec};
use sv2rtl_lower::LowerConf;

fn call(name: &str, args: Vec<Json>) -> Json {
    json!({ "kind": "func_call", "name": name, "args": args })
}

/// `pick(x)`: 5 when `x` is 0, 6 when 1, otherwise 7, overridden by 9
/// when bit 1 of `x` is set and the function did not return early.
fn pick() -> Json {
    json!({
        "name": "pick",
        "return_type": logic(3, 0),
        "io": [{ "name": "x", "direction": "input", "typespec": logic(1, 0) }],
        "body": begin(vec![
            json!({ "kind": "case", "cond": r("x"), "items": [
                { "exprs": [uint(0, 2)], "body": { "kind": "return", "value": uint(5, 4) } },
                { "exprs": [uint(1, 2)], "body": assign(r("pick"), uint(6, 4)) },
                { "exprs": [], "body": assign(r("pick"), uint(7, 4)) }
            ] }),
            json!({ "kind": "if",
                    "cond": { "kind": "bit_select", "name": "x", "index": int(1) },
                    "then_stmt": assign(r("pick"), uint(9, 4)) })
        ])
    })
}

#[test]
fn runtime_calls_match_folded_calls() {
    let mut nets = vec![];
    let mut assigns = vec![json!({ "lhs": r("y"), "rhs": call("pick", vec![r("x")]) })];
    for v in 0..4 {
        let name = format!("c{}", v);
        nets.push(net(&name, logic(3, 0)));
        assigns.push(json!({ "lhs": r(&name), "rhs": call("pick", vec![uint(v, 2)]) }));
    }
    let d = lower(json!({
        "modules": [{
            "name": "top",
            "ports": [port("x", "input", logic(1, 0)), port("y", "output", logic(3, 0))],
            "nets": nets,
            "cont_assigns": assigns,
            "functions": [pick()]
        }]
    }));
    let m = module(&d, "top");
    // Only the call with a run-time argument generates logic.
    assert_eq!(m.processes.len(), 1);

    for v in 0..4u64 {
        let folded = m
            .connections
            .iter()
            .find(|(lhs, _)| *lhs == wire(m, &format!("c{}", v)))
            .and_then(|(_, rhs)| rhs.as_const())
            .and_then(|c| c.as_i64(false))
            .unwrap();

        let mut sim = Sim::default();
        sim.set(&wire(m, "x"), v);
        sim.settle(m);
        assert_eq!(sim.get(&wire(m, "y")), Some(folded as u64), "pick({})", v);
    }
}

#[test]
fn call_temporaries_are_not_synced() {
    let d = lower(json!({
        "modules": [{
            "name": "top",
            "ports": [port("x", "input", logic(1, 0)), port("y", "output", logic(3, 0))],
            "cont_assigns": [{ "lhs": r("y"), "rhs": call("pick", vec![r("x")]) }],
            "functions": [pick()]
        }]
    }));
    let m = module(&d, "top");
    let temps = m
        .wires
        .iter()
        .filter(|w| w.borrow().attributes.has(Attribute::NoSync))
        .count();
    assert!(temps >= 2);
    let proc = m.processes.iter().next().unwrap();
    let proc = proc.borrow();
    assert!(proc.name.as_str().starts_with("$func$pick$"));
    assert_eq!(proc.syncs.len(), 1);
    // The result update plus one undefined update per temporary other
    // than the result itself.
    assert_eq!(proc.syncs[0].actions.len(), temps);
}

#[test]
fn recursive_calls_stop_at_the_depth_limit() {
    // fact(n) = n <= 1 ? 1 : n * fact(n - 1)
    let fact = json!({
        "name": "fact",
        "return_type": logic(7, 0),
        "io": [{ "name": "n", "direction": "input", "typespec": logic(7, 0) }],
        "body": { "kind": "if",
            "cond": op("le", vec![r("n"), int(1)]),
            "then_stmt": { "kind": "return", "value": int(1) },
            "else_stmt": { "kind": "return", "value": op("mult", vec![
                r("n"), call("fact", vec![op("sub", vec![r("n"), int(1)])])]) } }
    });
    let conf = LowerConf {
        max_call_depth: 3,
        ..Default::default()
    };
    let d = lower_with(
        json!({
            "modules": [{
                "name": "top",
                "ports": [port("n", "input", logic(7, 0)), port("y", "output", logic(7, 0))],
                "nets": [net("k", logic(7, 0))],
                "cont_assigns": [
                    { "lhs": r("k"), "rhs": call("fact", vec![int(4)]) },
                    { "lhs": r("y"), "rhs": call("fact", vec![r("n")]) }
                ],
                "functions": [fact]
            }]
        }),
        &conf,
    );
    let m = module(&d, "top");
    let (_, k) = m
        .connections
        .iter()
        .find(|(lhs, _)| *lhs == wire(m, "k"))
        .unwrap();
    // fact(4) nests four calls, one more than the limit allows, so it is
    // generated as logic instead of folding.
    assert!(k.as_const().is_none_or(|c| !c.is_fully_def()));
    assert_eq!(m.processes.len(), 3 + 3);
}

#[test]
fn output_arguments_write_the_caller() {
    let split = json!({
        "name": "split",
        "return_type": logic(0, 0),
        "io": [
            { "name": "v", "direction": "input", "typespec": logic(3, 0) },
            { "name": "hi", "direction": "output", "typespec": logic(1, 0) }
        ],
        "body": begin(vec![
            assign(r("hi"), json!({ "kind": "part_select", "name": "v",
                                    "left": int(3), "right": int(2) })),
            json!({ "kind": "return",
                    "value": { "kind": "bit_select", "name": "v", "index": int(0) } })
        ])
    });
    let d = lower(json!({
        "modules": [{
            "name": "top",
            "ports": [port("a", "input", logic(3, 0)), port("y", "output", logic(0, 0))],
            "nets": [net("h", logic(1, 0))],
            "processes": [{ "kind": "always_comb", "body":
                assign(r("y"), call("split", vec![r("a"), r("h")])) }],
            "functions": [split]
        }]
    }));
    let m = module(&d, "top");
    let mut sim = Sim::default();
    sim.set(&wire(m, "a"), 0b1001);
    sim.settle(m);
    assert_eq!(sim.get(&wire(m, "y")), Some(1));
    assert_eq!(sim.get(&wire(m, "h")), Some(0b10));
}

#[test]
fn loops_in_functions_unroll() {
    // popcount over a 4-bit input
    let popcount = json!({
        "name": "popcount",
        "return_type": logic(2, 0),
        "io": [{ "name": "v", "direction": "input", "typespec": logic(3, 0) }],
        "body": begin(vec![
            assign(r("popcount"), uint(0, 3)),
            json!({ "kind": "for",
                "decls": [{ "name": "i", "typespec": { "kind": "int", "int_kind": "int" },
                            "init": int(0) }],
                "cond": op("lt", vec![r("i"), int(4)]),
                "incr": [{ "kind": "assign", "lhs": r("i"), "rhs": int(1), "op": "add" }],
                "body": { "kind": "if",
                    "cond": { "kind": "bit_select", "name": "v", "index": r("i") },
                    "then_stmt": assign(r("popcount"), op("add", vec![r("popcount"),
                        uint(1, 3)])) } })
        ])
    });
    let d = lower(json!({
        "modules": [{
            "name": "top",
            "ports": [port("v", "input", logic(3, 0)), port("y", "output", logic(2, 0))],
            "cont_assigns": [{ "lhs": r("y"), "rhs": call("popcount", vec![r("v")]) }],
            "functions": [popcount]
        }]
    }));
    let m = module(&d, "top");
    let proc = m.processes.iter().next().unwrap();
    let proc = proc.borrow();
    // One switch per unrolled iteration, each on a different bit of `v`.
    let mut signals: Vec<SigSpec> = vec![];
    proc.root_case.for_each_case(&mut |c| {
        for sw in &c.switches {
            if !sw.is_sequencing() {
                signals.push(sw.signal.clone());
            }
        }
    });
    assert_eq!(signals.len(), 4);
    assert!(signals.iter().all(|s| s.width() == 1));
}

fn depth(case: &CaseRule) -> usize {
    1 + case
        .switches
        .iter()
        .flat_map(|sw| &sw.cases)
        .map(depth)
        .max()
        .unwrap_or(0)
}

#[test]
fn long_loops_with_early_returns() {
    // for (int i = 0; i < 10000; i++) case (x) i: return 1; endcase
    // find = 0;
    let find = json!({
        "name": "find",
        "return_type": logic(0, 0),
        "io": [{ "name": "x", "direction": "input", "typespec": logic(15, 0) }],
        "body": begin(vec![
            json!({ "kind": "for",
                "decls": [{ "name": "i", "typespec": { "kind": "int", "int_kind": "int" },
                            "init": int(0) }],
                "cond": op("lt", vec![r("i"), int(10000)]),
                "incr": [{ "kind": "assign", "lhs": r("i"), "rhs": int(1), "op": "add" }],
                "body": { "kind": "case", "cond": r("x"), "items": [
                    { "exprs": [r("i")], "body": { "kind": "return", "value": uint(1, 1) } }
                ] } }),
            assign(r("find"), uint(0, 1))
        ])
    });
    let d = lower(json!({
        "modules": [{
            "name": "top",
            "ports": [port("x", "input", logic(15, 0)), port("y", "output", logic(0, 0))],
            "cont_assigns": [{ "lhs": r("y"), "rhs": call("find", vec![r("x")]) }],
            "functions": [find]
        }]
    }));
    let m = module(&d, "top");
    assert_eq!(m.processes.len(), 1);
    let proc = m.processes.iter().next().unwrap();
    assert!(depth(&proc.borrow().root_case) <= 4);

    for (x, expected) in [(0, 1), (9999, 1), (10000, 0), (40000, 0)] {
        let mut sim = Sim::default();
        sim.set(&wire(m, "x"), x);
        sim.settle(m);
        assert_eq!(sim.get(&wire(m, "y")), Some(expected), "find({})", x);
    }
}
