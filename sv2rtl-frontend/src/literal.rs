//! Tagged literal encodings (`INT:42`, `HEX:ff`, `BIN:10x1`, ...).
use strum_macros::{Display, EnumString};

/// The kind prefix of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LiteralKind {
    Int,
    Uint,
    Dec,
    Bin,
    Oct,
    Hex,
    String,
}

/// Split a literal into its kind and digits. `None` for unknown tags.
pub fn split_literal(text: &str) -> Option<(LiteralKind, &str)> {
    let (tag, digits) = text.split_once(':')?;
    let kind = tag.parse::<LiteralKind>().ok()?;
    Some((kind, digits))
}

/// Strip `_` separators from a numeric literal.
pub fn clean_digits(digits: &str) -> String {
    digits.chars().filter(|c| *c != '_').collect()
}

/// Value of a literal with no unknown bits, together with its natural
/// width and signedness. `None` for literals that contain x/z digits or do
/// not fit into 64 bits.
pub fn literal_value(text: &str) -> Option<(i64, u64, bool)> {
    let (kind, digits) = split_literal(text)?;
    let digits = clean_digits(digits);
    match kind {
        LiteralKind::Int => {
            let v = digits.trim().parse::<i64>().ok()?;
            let width = if i32::try_from(v).is_ok() { 32 } else { 64 };
            Some((v, width, true))
        }
        LiteralKind::Uint | LiteralKind::Dec => {
            let v = digits.trim().parse::<u64>().ok()?;
            let width = if v > u32::MAX as u64 { 64 } else { 32 };
            Some((v as i64, width, false))
        }
        LiteralKind::Bin | LiteralKind::Oct | LiteralKind::Hex => {
            let (radix, per_digit) = match kind {
                LiteralKind::Bin => (2, 1),
                LiteralKind::Oct => (8, 3),
                _ => (16, 4),
            };
            let width = digits.len() as u64 * per_digit;
            if digits.is_empty() {
                return None;
            }
            let trimmed = digits.trim_start_matches('0');
            if trimmed.is_empty() {
                return Some((0, width, false));
            }
            let v = u64::from_str_radix(trimmed, radix).ok()?;
            Some((v as i64, width, false))
        }
        LiteralKind::String => {
            if digits.len() > 8 {
                return None;
            }
            let v = digits
                .bytes()
                .fold(0u64, |acc, b| (acc << 8) | b as u64);
            Some((v as i64, digits.len() as u64 * 8, false))
        }
    }
}
