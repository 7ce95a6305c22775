//! Width and sign alignment of lowered values.
use sv2rtl_ir::{SigBit, SigSpec};

/// A lowered expression: its bits and whether it is signed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub sig: SigSpec,
    pub signed: bool,
    /// An unbased unsized literal (`'1`) that fills any width.
    pub fill: bool,
}

impl Value {
    pub fn new(sig: SigSpec, signed: bool) -> Self {
        Self {
            sig,
            signed,
            fill: false,
        }
    }

    pub fn unsigned(sig: SigSpec) -> Self {
        Self::new(sig, false)
    }

    pub fn width(&self) -> u32 {
        self.sig.width()
    }

    pub fn is_empty(&self) -> bool {
        self.sig.is_empty()
    }
}

/// Fit `value` to `width` bits: truncate, sign-extend signed values and
/// zero-extend everything else. Unsized fill literals repeat their bit.
pub fn align(value: &Value, width: u32) -> SigSpec {
    if value.fill && value.sig.width() == 1 {
        let bit: SigBit = value.sig.bits()[0].clone();
        return SigSpec::from_bits(vec![bit; width as usize]);
    }
    value.sig.extend_u0(width, value.signed)
}

/// Bring two operands to their common width. Extension is signed only
/// when both operands are signed.
pub fn align_pair(a: &Value, b: &Value) -> (Value, Value) {
    let width = a.width().max(b.width());
    let signed = a.signed && b.signed;
    let fit = |v: &Value| {
        let v = Value {
            signed,
            ..v.clone()
        };
        Value::new(align(&v, width), signed)
    };
    (fit(a), fit(b))
}
