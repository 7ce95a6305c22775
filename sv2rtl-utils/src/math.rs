use std::cmp;

fn bits_helper(n: u64, i: u64) -> u64 {
    if n == 0 {
        i
    } else {
        bits_helper(n / 2, i + 1)
    }
}

/// Number of bits needed to index `n` entries. Never less than one.
pub fn bits_needed_for(n: u64) -> u64 {
    cmp::max(clog2(n), 1)
}

/// Ceiling of the base-2 logarithm, following the `$clog2` system function:
/// `clog2(0) == 0` and `clog2(1) == 0`.
pub fn clog2(n: u64) -> u64 {
    if n <= 1 { 0 } else { bits_helper(n - 1, 0) }
}
