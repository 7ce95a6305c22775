//! Bit-level values: constants, wire bits and signal specifications.
use crate::{RRC, Wire};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The state of a single constant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    S0,
    S1,
    Sx,
    Sz,
    /// Don't-care, only meaningful in case rule comparisons.
    Sa,
}

impl State {
    pub fn from_char(c: char) -> Option<State> {
        match c {
            '0' => Some(State::S0),
            '1' => Some(State::S1),
            'x' | 'X' => Some(State::Sx),
            'z' | 'Z' | '?' => Some(State::Sz),
            '-' => Some(State::Sa),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            State::S0 => '0',
            State::S1 => '1',
            State::Sx => 'x',
            State::Sz => 'z',
            State::Sa => '-',
        }
    }

    pub fn from_bool(b: bool) -> State {
        if b { State::S1 } else { State::S0 }
    }
}

/// Constant flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConstFlags {
    /// The value was written as a string literal.
    pub string: bool,
    pub signed: bool,
}

/// A constant bit vector, least significant bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Const {
    pub bits: Vec<State>,
    pub flags: ConstFlags,
}

impl Const {
    pub fn from_bits(bits: Vec<State>) -> Self {
        Self {
            bits,
            flags: ConstFlags::default(),
        }
    }

    /// Two's complement encoding of `value` in `width` bits.
    pub fn from_int(value: i64, width: u32) -> Self {
        let bits = (0..width)
            .map(|i| {
                let bit = if i < 64 { (value >> i) & 1 == 1 } else { value < 0 };
                State::from_bool(bit)
            })
            .collect();
        Self::from_bits(bits)
    }

    pub fn repeat(state: State, width: u32) -> Self {
        Self::from_bits(vec![state; width as usize])
    }

    /// Eight bits per character, the last character in the least significant
    /// byte.
    pub fn from_string(s: &str) -> Self {
        let mut bits = Vec::with_capacity(s.len() * 8);
        for byte in s.bytes().rev() {
            bits.extend((0..8).map(|i| State::from_bool((byte >> i) & 1 == 1)));
        }
        Self {
            bits,
            flags: ConstFlags {
                string: true,
                signed: false,
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.bits.len() as u32
    }

    /// Only `0` and `1` bits.
    pub fn is_fully_def(&self) -> bool {
        self.bits.iter().all(|b| matches!(b, State::S0 | State::S1))
    }

    /// The state shared by every bit, if there is one.
    pub fn uniform_state(&self) -> Option<State> {
        let first = *self.bits.first()?;
        self.bits.iter().all(|b| *b == first).then_some(first)
    }

    /// Integer value. `None` when a bit is not `0`/`1` or the value does not
    /// fit into 64 bits.
    pub fn as_i64(&self, signed: bool) -> Option<i64> {
        if !self.is_fully_def() {
            return None;
        }
        let msb = self.bits.last() == Some(&State::S1);
        let fill = if signed { msb } else { false };
        if self.bits.iter().skip(64).any(|b| (*b == State::S1) != fill) {
            return None;
        }
        let mut v: i64 = if signed && msb { -1 } else { 0 };
        for (i, b) in self.bits.iter().take(64).enumerate() {
            if *b == State::S1 {
                v |= 1 << i;
            } else {
                v &= !(1 << i);
            }
        }
        Some(v)
    }

    /// Zero-extend or truncate to `width`.
    pub fn resized(&self, width: u32) -> Const {
        let mut bits = self.bits.clone();
        bits.resize(width as usize, State::S0);
        Const {
            bits,
            flags: ConstFlags {
                string: false,
                signed: self.flags.signed,
            },
        }
    }

    /// Decode a string constant. `None` unless the width is a whole number
    /// of bytes with defined bits.
    pub fn decode_string(&self) -> Option<String> {
        if self.bits.len() % 8 != 0 || !self.is_fully_def() {
            return None;
        }
        let bytes = self
            .bits
            .chunks(8)
            .rev()
            .map(|byte| {
                byte.iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, b)| acc | ((*b == State::S1) as u8) << i)
            })
            .collect::<Vec<_>>();
        String::from_utf8(bytes).ok()
    }
}

/// Written as `<width>'<bits>`, most significant bit first.
impl std::fmt::Display for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}'", self.bits.len())?;
        for b in self.bits.iter().rev() {
            write!(f, "{}", b.as_char())?;
        }
        Ok(())
    }
}

/// A single bit: a constant or one bit of a wire.
#[derive(Clone)]
pub enum SigBit {
    Const(State),
    Wire { wire: RRC<Wire>, offset: u32 },
}

impl SigBit {
    pub fn as_state(&self) -> Option<State> {
        match self {
            SigBit::Const(s) => Some(*s),
            SigBit::Wire { .. } => None,
        }
    }
}

/// Wire bits are identified by the wire object, not its name.
impl PartialEq for SigBit {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SigBit::Const(a), SigBit::Const(b)) => a == b,
            (
                SigBit::Wire { wire: w1, offset: o1 },
                SigBit::Wire { wire: w2, offset: o2 },
            ) => Rc::ptr_eq(w1, w2) && o1 == o2,
            _ => false,
        }
    }
}

impl Eq for SigBit {}

impl Hash for SigBit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            SigBit::Const(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            SigBit::Wire { wire, offset } => {
                1u8.hash(state);
                (Rc::as_ptr(wire) as usize).hash(state);
                offset.hash(state);
            }
        }
    }
}

impl std::fmt::Debug for SigBit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigBit::Const(s) => write!(f, "{}", s.as_char()),
            SigBit::Wire { wire, offset } => {
                write!(f, "{}[{}]", wire.borrow().name, offset)
            }
        }
    }
}

/// A maximal run of bits that prints as one unit.
#[derive(Debug, Clone)]
pub enum SigChunk {
    Const(Const),
    Wire {
        wire: RRC<Wire>,
        offset: u32,
        width: u32,
    },
}

/// A signal specification: an ordered vector of bits, least significant
/// first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SigSpec {
    bits: Vec<SigBit>,
}

impl SigSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: Vec<SigBit>) -> Self {
        Self { bits }
    }

    /// All bits of a wire.
    pub fn from_wire(wire: &RRC<Wire>) -> Self {
        let width = wire.borrow().width;
        Self::from_wire_slice(wire, 0, width)
    }

    /// `width` bits of a wire starting at storage offset `offset`.
    pub fn from_wire_slice(wire: &RRC<Wire>, offset: u32, width: u32) -> Self {
        Self {
            bits: (offset..offset + width)
                .map(|offset| SigBit::Wire {
                    wire: Rc::clone(wire),
                    offset,
                })
                .collect(),
        }
    }

    pub fn from_state(state: State, width: u32) -> Self {
        Self {
            bits: vec![SigBit::Const(state); width as usize],
        }
    }

    pub fn from_bool(b: bool) -> Self {
        Self::from_state(State::from_bool(b), 1)
    }

    pub fn width(&self) -> u32 {
        self.bits.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[SigBit] {
        &self.bits
    }

    pub fn into_bits(self) -> Vec<SigBit> {
        self.bits
    }

    /// Append `other` above the current most significant bit.
    pub fn append(&mut self, other: &SigSpec) {
        self.bits.extend(other.bits.iter().cloned());
    }

    pub fn push(&mut self, bit: SigBit) {
        self.bits.push(bit);
    }

    /// `len` bits starting at `offset`, clipped to the available bits.
    pub fn extract(&self, offset: u32, len: u32) -> SigSpec {
        Self {
            bits: self
                .bits
                .iter()
                .skip(offset as usize)
                .take(len as usize)
                .cloned()
                .collect(),
        }
    }

    /// Truncate, or extend with the sign bit when `signed` and with zeros
    /// otherwise.
    pub fn extend_u0(&self, width: u32, signed: bool) -> SigSpec {
        let mut bits = self.bits.clone();
        let fill = match bits.last() {
            Some(msb) if signed => msb.clone(),
            _ => SigBit::Const(State::S0),
        };
        bits.resize(width as usize, fill);
        Self { bits }
    }

    pub fn is_fully_const(&self) -> bool {
        self.bits.iter().all(|b| matches!(b, SigBit::Const(_)))
    }

    pub fn as_const(&self) -> Option<Const> {
        self.bits
            .iter()
            .map(SigBit::as_state)
            .collect::<Option<Vec<_>>>()
            .map(Const::from_bits)
    }

    /// Is this exactly the bits of `wire`, in order?
    pub fn is_wire(&self, wire: &RRC<Wire>) -> bool {
        *self == SigSpec::from_wire(wire)
    }

    /// Replace every occurrence of a bit of `pattern` by the corresponding
    /// bit of `with`.
    pub fn replace(&mut self, pattern: &SigSpec, with: &SigSpec) {
        let map: HashMap<&SigBit, &SigBit> =
            pattern.bits.iter().zip(with.bits.iter()).collect();
        for bit in self.bits.iter_mut() {
            if let Some(to) = map.get(bit) {
                *bit = (*to).clone();
            }
        }
    }

    /// Wires referenced by this signal, in order of first appearance.
    pub fn wires(&self) -> Vec<RRC<Wire>> {
        let mut out: Vec<RRC<Wire>> = vec![];
        for bit in &self.bits {
            if let SigBit::Wire { wire, .. } = bit {
                if !out.iter().any(|w| Rc::ptr_eq(w, wire)) {
                    out.push(Rc::clone(wire));
                }
            }
        }
        out
    }

    /// Group the bits into maximal constant runs and runs of consecutive
    /// bits of the same wire. LSB chunk first.
    pub fn chunks(&self) -> Vec<SigChunk> {
        let mut out: Vec<SigChunk> = vec![];
        for bit in &self.bits {
            let merged = match (out.last_mut(), bit) {
                (Some(SigChunk::Const(c)), SigBit::Const(s)) => {
                    c.bits.push(*s);
                    true
                }
                (
                    Some(SigChunk::Wire {
                        wire,
                        offset,
                        width,
                    }),
                    SigBit::Wire { wire: w, offset: o },
                ) if Rc::ptr_eq(wire, w) && *offset + *width == *o => {
                    *width += 1;
                    true
                }
                _ => false,
            };
            if !merged {
                out.push(match bit {
                    SigBit::Const(s) => SigChunk::Const(Const::from_bits(vec![*s])),
                    SigBit::Wire { wire, offset } => SigChunk::Wire {
                        wire: Rc::clone(wire),
                        offset: *offset,
                        width: 1,
                    },
                });
            }
        }
        out
    }
}

impl From<Const> for SigSpec {
    fn from(c: Const) -> Self {
        Self {
            bits: c.bits.into_iter().map(SigBit::Const).collect(),
        }
    }
}

impl From<&RRC<Wire>> for SigSpec {
    fn from(wire: &RRC<Wire>) -> Self {
        SigSpec::from_wire(wire)
    }
}

/// Bit-level substitution map.
#[derive(Debug, Clone, Default)]
pub struct SigMap {
    map: HashMap<SigBit, SigBit>,
}

impl SigMap {
    /// Map each bit of `from` to the corresponding bit of `to`.
    pub fn add(&mut self, from: &SigSpec, to: &SigSpec) {
        for (f, t) in from.bits.iter().zip(to.bits.iter()) {
            self.map.insert(f.clone(), t.clone());
        }
    }

    pub fn remove(&mut self, sig: &SigSpec) {
        for bit in &sig.bits {
            self.map.remove(bit);
        }
    }

    pub fn apply(&self, sig: &SigSpec) -> SigSpec {
        SigSpec {
            bits: sig
                .bits
                .iter()
                .map(|b| self.map.get(b).unwrap_or(b).clone())
                .collect(),
        }
    }

    pub fn contains(&self, bit: &SigBit) -> bool {
        self.map.contains_key(bit)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Wire, rrc};

    #[test]
    fn int_constants_are_twos_complement() {
        let c = Const::from_int(-2, 4);
        assert_eq!(c.to_string(), "4'1110");
        assert_eq!(c.as_i64(true), Some(-2));
        assert_eq!(c.as_i64(false), Some(14));
        assert_eq!(Const::from_int(5, 70).as_i64(false), Some(5));
    }

    #[test]
    fn string_constants_put_last_char_in_lsb() {
        let c = Const::from_string("AB");
        assert_eq!(c.width(), 16);
        assert_eq!(c.as_i64(false), Some(0x4142));
        assert_eq!(c.decode_string().as_deref(), Some("AB"));
    }

    #[test]
    fn resize_zero_extends() {
        let c = Const::from_int(-1, 8).resized(16);
        assert_eq!(c.as_i64(false), Some(255));
        assert_eq!(Const::from_int(0x1ff, 9).resized(4).as_i64(false), Some(15));
    }

    #[test]
    fn chunks_group_runs() {
        let w = rrc(Wire::new("w", 8));
        let mut s = SigSpec::from_wire_slice(&w, 0, 4);
        s.append(&SigSpec::from(Const::from_int(1, 2)));
        s.append(&SigSpec::from_wire_slice(&w, 6, 2));
        let chunks = s.chunks();
        assert_eq!(chunks.len(), 3);
        assert!(matches!(
            chunks[2],
            SigChunk::Wire {
                offset: 6,
                width: 2,
                ..
            }
        ));
    }

    #[test]
    fn sigmap_substitutes_bits() {
        let a = rrc(Wire::new("a", 2));
        let b = rrc(Wire::new("b", 2));
        let mut map = SigMap::default();
        map.add(&SigSpec::from_wire_slice(&a, 1, 1), &SigSpec::from_bool(true));
        let out = map.apply(&SigSpec::from_wire(&a));
        assert_eq!(out.bits()[0], SigBit::Wire { wire: a.clone(), offset: 0 });
        assert_eq!(out.bits()[1], SigBit::Const(State::S1));
        assert_ne!(SigSpec::from_wire(&a), SigSpec::from_wire(&b));
    }
}
