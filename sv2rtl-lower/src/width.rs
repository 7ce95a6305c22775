//! Bit widths and packed ranges of declared types.
use sv2rtl_frontend::ConstEnv;
use sv2rtl_frontend::ast::TypeSpec;
use sv2rtl_frontend::eval::{eval_range, size_of};

/// Width reported for interface (bundle) types.
pub const WIDTH_BUNDLE: i64 = -1;

/// Alias chains longer than this are treated as cyclic.
const MAX_ALIAS_DEPTH: usize = 32;

/// Storage layout of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub width: u32,
    /// Declared index of the least significant bit.
    pub start_offset: i64,
    /// Ascending packed range (`[0:7]`).
    pub upto: bool,
    pub signed: bool,
}

impl TypeInfo {
    /// An unsigned `[width-1:0]` vector.
    pub fn vector(width: u32) -> Self {
        Self {
            width,
            start_offset: 0,
            upto: false,
            signed: false,
        }
    }
}

/// Follow alias references until a concrete type is reached. The direct
/// link is preferred, then the type tables reachable through `env`.
/// Unknown names resolve to a single bit.
pub fn resolve_type(ts: &TypeSpec, env: &dyn ConstEnv) -> TypeSpec {
    let mut cur = ts.clone();
    for _ in 0..MAX_ALIAS_DEPTH {
        cur = match cur {
            TypeSpec::Alias {
                actual: Some(actual),
                ..
            } => *actual,
            TypeSpec::Alias {
                name,
                package,
                actual: None,
            } => match env.typedef(name, package) {
                Some(ts) => ts,
                None => {
                    log::warn!("unknown type `{}`, assuming one bit", name);
                    return TypeSpec::default();
                }
            },
            other => return other,
        };
    }
    log::warn!("type alias chain is too deep, assuming one bit");
    TypeSpec::default()
}

/// Width of a type in bits, [WIDTH_BUNDLE] for interfaces. Sizes that
/// cannot be evaluated fall back to one bit.
pub fn type_width(ts: &TypeSpec, env: &dyn ConstEnv) -> i64 {
    let ts = resolve_type(ts, env);
    if let TypeSpec::Interface { .. } = ts {
        return WIDTH_BUNDLE;
    }
    match size_of(&ts, env) {
        Some(0) | None => {
            log::warn!("cannot evaluate the size of a type, assuming one bit");
            1
        }
        Some(w) => w as i64,
    }
}

/// Layout of a type. `None` for interfaces.
pub fn type_info(ts: &TypeSpec, env: &dyn ConstEnv) -> Option<TypeInfo> {
    let width = type_width(ts, env);
    if width == WIDTH_BUNDLE {
        return None;
    }
    let resolved = resolve_type(ts, env);
    let (start_offset, upto) = match &resolved {
        TypeSpec::Logic { ranges, .. } if ranges.len() == 1 => {
            match eval_range(&ranges[0], env) {
                Some((l, r)) => (l.min(r), l < r),
                None => (0, false),
            }
        }
        _ => (0, false),
    };
    Some(TypeInfo {
        width: width as u32,
        start_offset,
        upto,
        signed: resolved.is_signed(),
    })
}
