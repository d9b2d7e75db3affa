//! L0 — fixed-width unsigned big-integer arithmetic.
//!
//! The field modulus `p751 = 2^372 * 3^239 - 1` is a 751-bit number,
//! packed into twelve 64-bit limbs, least-significant limb first
//! (`digits[0]` holds bits `0..64`). Every operation here is branch-free
//! on its limb values: carries and borrows are produced arithmetically
//! rather than with a conditional, so the cost of an add or compare does
//! not depend on the numbers involved. None of this uses the inline
//! assembly the reference implementation relies on for its carry chain;
//! `u128` widening multiplication gives the same constant-time guarantee
//! in portable Rust.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// Number of 64-bit limbs in a field element.
pub const NWORDS_FIELD: usize = 12;

/// A 751-bit (nominally 768-bit) unsigned integer, little-endian limbs.
pub type Digits = [u64; NWORDS_FIELD];

/// The double-width accumulator produced by a full [`NWORDS_FIELD`]-limb
/// multiplication, before modular reduction.
pub type DoubleDigits = [u64; 2 * NWORDS_FIELD];

/// `a + b`, returning the sum and the carry out of the top limb.
#[must_use]
pub fn mp_add(a: &Digits, b: &Digits) -> (Digits, u64) {
    let mut out: Digits = [0_u64; NWORDS_FIELD];
    let mut carry: u128 = 0;
    for (slot, (&x, &y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        let wide = u128::from(x) + u128::from(y) + carry;
        *slot = wide as u64;
        carry = wide >> 64;
    }
    (out, carry as u64)
}

/// `a - b`, returning the difference and a borrow of `1` if `a < b`.
#[must_use]
pub fn mp_sub(a: &Digits, b: &Digits) -> (Digits, u64) {
    let mut out: Digits = [0_u64; NWORDS_FIELD];
    let mut borrow: i128 = 0;
    for (slot, (&x, &y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        let wide = i128::from(x) - i128::from(y) - borrow;
        *slot = wide as u64;
        borrow = i128::from(wide < 0);
    }
    (out, borrow as u64)
}

/// Schoolbook `a * b`, full double-width product.
///
/// Quadratic in [`NWORDS_FIELD`]; fine for a field this narrow and far
/// simpler to audit for constant time than a Karatsuba split.
#[must_use]
pub fn mp_mul(a: &Digits, b: &Digits) -> DoubleDigits {
    let mut out: DoubleDigits = [0_u64; 2 * NWORDS_FIELD];
    for (i, &ai) in a.iter().enumerate() {
        let mut carry: u128 = 0;
        for (j, &bj) in b.iter().enumerate() {
            let Some(slot) = out.get_mut(i + j) else {
                unreachable!("i + j < 2 * NWORDS_FIELD for i, j < NWORDS_FIELD")
            };
            let wide = u128::from(ai) * u128::from(bj) + u128::from(*slot) + carry;
            *slot = wide as u64;
            carry = wide >> 64;
        }
        let Some(slot) = out.get_mut(i + NWORDS_FIELD) else {
            unreachable!("i + NWORDS_FIELD < 2 * NWORDS_FIELD for i < NWORDS_FIELD")
        };
        let wide = u128::from(*slot) + carry;
        *slot = wide as u64;
    }
    out
}

/// Add a [`Digits`]-width value into a [`DoubleDigits`] accumulator at
/// limb offset `0`, returning the carry out of the top limb of `acc`.
#[must_use]
pub fn mp_add_into_double(acc: &mut DoubleDigits, addend: &Digits) -> u64 {
    let mut carry: u128 = 0;
    for (slot, &x) in acc.iter_mut().zip(addend.iter()) {
        let wide = u128::from(*slot) + u128::from(x) + carry;
        *slot = wide as u64;
        carry = wide >> 64;
    }
    for slot in acc.iter_mut().skip(NWORDS_FIELD) {
        if carry == 0 {
            break;
        }
        let wide = u128::from(*slot) + carry;
        *slot = wide as u64;
        carry = wide >> 64;
    }
    carry as u64
}

/// `1` if every limb is zero, `0` otherwise — constant time.
#[must_use]
pub fn ct_is_zero(a: &Digits) -> Choice {
    a.ct_eq(&[0_u64; NWORDS_FIELD])
}

/// `1` if `a < b`, constant time, via the borrow out of a subtraction.
#[must_use]
pub fn ct_lt(a: &Digits, b: &Digits) -> Choice {
    let (_, borrow) = mp_sub(a, b);
    Choice::from(borrow as u8)
}

/// Conditionally swap `a` and `b` in constant time.
pub fn conditional_swap(a: &mut Digits, b: &mut Digits, choice: Choice) {
    for (x, y) in a.iter_mut().zip(b.iter_mut()) {
        u64::conditional_swap(x, y, choice);
    }
}

/// `if choice { a } else { b }`, constant time.
#[must_use]
pub fn conditional_select(a: &Digits, b: &Digits, choice: Choice) -> Digits {
    let mut out: Digits = [0_u64; NWORDS_FIELD];
    for (slot, (&x, &y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *slot = u64::conditional_select(&y, &x, choice);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{mp_add, mp_mul, mp_sub, ct_is_zero, ct_lt, Digits, NWORDS_FIELD};

    fn from_u64(value: u64) -> Digits {
        let mut out = [0_u64; NWORDS_FIELD];
        if let Some(low) = out.get_mut(0) {
            *low = value;
        }
        out
    }

    #[test]
    fn add_sub_roundtrip() {
        let a = from_u64(0xffff_ffff_ffff_ffff);
        let b = from_u64(1);
        let (sum, carry) = mp_add(&a, &b);
        assert_eq!(carry, 0, "no overflow out of the top limb expected here");
        let (back, borrow) = mp_sub(&sum, &b);
        assert_eq!(borrow, 0);
        assert_eq!(back, a);
    }

    #[test]
    fn mul_small() {
        let a = from_u64(7);
        let b = from_u64(6);
        let product = mp_mul(&a, &b);
        assert_eq!(product.first().copied(), Some(42));
        assert!(product.iter().skip(1).all(|&limb| limb == 0));
    }

    #[test]
    fn zero_and_order() {
        let zero = from_u64(0);
        assert!(bool::from(ct_is_zero(&zero)));
        let one = from_u64(1);
        assert!(!bool::from(ct_is_zero(&one)));
        assert!(bool::from(ct_lt(&zero, &one)));
        assert!(!bool::from(ct_lt(&one, &zero)));
    }
}
