//! Decoding of tagged literals into constant bit vectors.
use sv2rtl_frontend::literal::{LiteralKind, clean_digits, split_literal};
use sv2rtl_ir::{Const, State};

/// Width used for undecodable literals without a declared size.
const DEFAULT_WIDTH: u32 = 32;

/// Decode a tagged literal such as `HEX:ff` into a constant.
///
/// `size` is the declared width when positive, `0` for the natural width of
/// the literal and `-1` for unsized literals. A declared width that differs
/// from the natural one zero-extends or truncates the value. A `BIN:`
/// literal of one repeated `0`/`1`/`x`/`z` without a size decodes to that
/// single bit so that it can be filled to the width of its context.
///
/// Literals that cannot be decoded produce all-x bits and a warning.
pub fn decode_constant(text: &str, size: i64) -> Const {
    match decode(text, size) {
        Some(c) => c,
        None => {
            log::warn!("cannot decode constant `{}`, using x", text);
            let width = if size > 0 { size as u32 } else { DEFAULT_WIDTH };
            Const::repeat(State::Sx, width)
        }
    }
}

fn decode(text: &str, size: i64) -> Option<Const> {
    let (kind, raw) = split_literal(text)?;
    let natural = match kind {
        LiteralKind::Int => {
            let v = clean_digits(raw).trim().parse::<i64>().ok()?;
            let width = if i32::try_from(v).is_ok() { 32 } else { 64 };
            let mut c = Const::from_int(v, width);
            c.flags.signed = true;
            c
        }
        LiteralKind::Uint | LiteralKind::Dec => {
            let v = clean_digits(raw).trim().parse::<u64>().ok()?;
            let width = if v > u32::MAX as u64 { 64 } else { 32 };
            Const::from_int(v as i64, width)
        }
        LiteralKind::Bin => {
            let digits = clean_digits(raw);
            if size == -1 {
                if let Some(state) = unsized_state(&digits) {
                    return Some(Const::from_bits(vec![state]));
                }
            }
            based(&digits, 1)?
        }
        LiteralKind::Oct => based(&clean_digits(raw), 3)?,
        LiteralKind::Hex => based(&clean_digits(raw), 4)?,
        LiteralKind::String => Const::from_string(raw),
    };
    if size > 0 && natural.width() != size as u32 {
        Some(natural.resized(size as u32))
    } else {
        Some(natural)
    }
}

/// The state of an unbased unsized literal (`'0`, `'1`, `'x`, `'z`).
fn unsized_state(digits: &str) -> Option<State> {
    let mut chars = digits.chars();
    let first = chars.next()?;
    if !chars.all(|c| c == first) {
        return None;
    }
    match State::from_char(first)? {
        State::Sa => None,
        s => Some(s),
    }
}

/// Digits of a binary, octal or hexadecimal literal. `x` and `z` digits
/// expand to `bits` unknown bits.
fn based(digits: &str, bits: u32) -> Option<Const> {
    if digits.is_empty() {
        return None;
    }
    let mut out = Vec::with_capacity(digits.len() * bits as usize);
    for c in digits.chars().rev() {
        match c {
            'x' | 'X' => out.extend((0..bits).map(|_| State::Sx)),
            'z' | 'Z' | '?' => out.extend((0..bits).map(|_| State::Sz)),
            '-' if bits == 1 => out.push(State::Sa),
            c => {
                let d = c.to_digit(1 << bits)?;
                out.extend((0..bits).map(|i| State::from_bool((d >> i) & 1 == 1)));
            }
        }
    }
    Some(Const::from_bits(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_natural_and_declared_width() {
        let c = decode_constant("HEX:ff", 0);
        assert_eq!(c.width(), 8);
        assert_eq!(c.as_i64(false), Some(255));
        let c = decode_constant("HEX:ff", 16);
        assert_eq!(c.width(), 16);
        assert_eq!(c.as_i64(false), Some(255));
    }

    #[test]
    fn integers() {
        let c = decode_constant("INT:-3", 0);
        assert_eq!(c.width(), 32);
        assert!(c.flags.signed);
        assert_eq!(c.as_i64(true), Some(-3));
        assert_eq!(decode_constant("INT:5000000000", 0).width(), 64);
        assert_eq!(decode_constant("UINT:4294967296", 0).width(), 64);
        assert_eq!(decode_constant("DEC:1_000", 0).as_i64(false), Some(1000));
    }

    #[test]
    fn declared_width_never_sign_extends() {
        let c = decode_constant("INT:-1", 40);
        assert_eq!(c.width(), 40);
        assert_eq!(c.bits[32], State::S0);
    }

    #[test]
    fn unknown_digits_expand() {
        assert_eq!(decode_constant("BIN:1x0z", 0).to_string(), "4'1x0z");
        assert_eq!(decode_constant("HEX:xf", 0).to_string(), "8'xxxx1111");
        assert_eq!(decode_constant("OCT:7z", 0).to_string(), "6'111zzz");
    }

    #[test]
    fn unbased_unsized_is_one_bit() {
        assert_eq!(decode_constant("BIN:1", -1).to_string(), "1'1");
        assert_eq!(decode_constant("BIN:zz", -1).to_string(), "1'z");
        assert_eq!(decode_constant("BIN:10", -1).to_string(), "2'10");
    }

    #[test]
    fn strings_keep_their_flag() {
        let c = decode_constant("STRING:ab_c", 0);
        assert_eq!(c.width(), 32);
        assert!(c.flags.string);
        assert_eq!(c.decode_string().as_deref(), Some("ab_c"));
    }

    #[test]
    fn garbage_is_all_x() {
        assert_eq!(decode_constant("FOO:12", 4).to_string(), "4'xxxx");
        assert_eq!(decode_constant("HEX:fg", 0).width(), 32);
        assert_eq!(decode_constant("INT:", 0).uniform_state(), Some(State::Sx));
    }
}
