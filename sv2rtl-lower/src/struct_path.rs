//! Bit slices of packed struct members.
use crate::width::resolve_type;
use sv2rtl_frontend::ConstEnv;
use sv2rtl_frontend::ast::TypeSpec;
use sv2rtl_frontend::eval::size_of;

/// Offset and width of the member at the dotted `path` (e.g. `b.c`) inside
/// a packed struct. Members are packed first-declared-most-significant, so
/// the offset of a member is the total width of the members declared after
/// it, accumulated through every level of the path.
pub fn struct_member_slice(
    ts: &TypeSpec,
    path: &str,
    env: &dyn ConstEnv,
) -> Option<(u32, u32)> {
    let mut cur = resolve_type(ts, env);
    let mut offset = 0u64;
    for seg in path.split('.') {
        let TypeSpec::Struct { members, .. } = cur else {
            return None;
        };
        let idx = members.iter().position(|m| m.name == seg)?;
        for later in &members[idx + 1..] {
            offset += size_of(&later.typespec, env)?;
        }
        cur = resolve_type(&members[idx].typespec, env);
    }
    let width = size_of(&cur, env)?;
    Some((offset as u32, width as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv2rtl_frontend::Folded;
    use sv2rtl_utils::Id;

    struct NoEnv;

    impl ConstEnv for NoEnv {
        fn lookup(&self, _name: Id) -> Option<Folded> {
            None
        }
    }

    fn logic(width: i64) -> serde_json::Value {
        serde_json::json!({ "kind": "logic", "ranges": [{
            "left": { "kind": "constant", "value": format!("INT:{}", width - 1) },
            "right": { "kind": "constant", "value": "INT:0" }
        }] })
    }

    fn packet() -> TypeSpec {
        // struct packed { logic [3:0] a; struct packed { logic [1:0] c; logic d; } b; logic [7:0] e; }
        serde_json::from_value(serde_json::json!({
            "kind": "struct",
            "members": [
                { "name": "a", "typespec": logic(4) },
                { "name": "b", "typespec": { "kind": "struct", "members": [
                    { "name": "c", "typespec": logic(2) },
                    { "name": "d", "typespec": logic(1) }
                ] } },
                { "name": "e", "typespec": logic(8) }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn last_member_is_least_significant() {
        let ts = packet();
        assert_eq!(struct_member_slice(&ts, "e", &NoEnv), Some((0, 8)));
        assert_eq!(struct_member_slice(&ts, "b", &NoEnv), Some((8, 3)));
        assert_eq!(struct_member_slice(&ts, "a", &NoEnv), Some((11, 4)));
    }

    #[test]
    fn nested_members_accumulate() {
        let ts = packet();
        assert_eq!(struct_member_slice(&ts, "b.c", &NoEnv), Some((9, 2)));
        assert_eq!(struct_member_slice(&ts, "b.d", &NoEnv), Some((8, 1)));
    }

    #[test]
    fn bad_paths() {
        let ts = packet();
        assert_eq!(struct_member_slice(&ts, "x", &NoEnv), None);
        assert_eq!(struct_member_slice(&ts, "a.b", &NoEnv), None);
    }
}
