//! L2 — arithmetic in `GF(p751^2) = GF(p751)[i] / (i^2 + 1)`.
//!
//! An element is a pair `(a0, a1)` standing for `a0 + a1*i`. Multiplication
//! uses the textbook three-multiplication trick (`(a0+a1)(b0+b1) - a0b0 -
//! a1b1` for the cross term) rather than four separate `Fp` products.

use crate::fp::Fp;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// An element of `GF(p751^2)`.
#[derive(Clone, Copy, Debug)]
pub struct Fp2 {
    /// Real part.
    pub a0: Fp,
    /// `i`-coefficient.
    pub a1: Fp,
}

impl Fp2 {
    /// The additive identity.
    pub const ZERO: Self = Self { a0: Fp::ZERO, a1: Fp::ZERO };

    /// Build from a real (`Fp`-rational) value.
    #[must_use]
    pub fn from_fp(value: Fp) -> Self {
        Self { a0: value, a1: Fp::ZERO }
    }

    /// The multiplicative identity.
    #[must_use]
    pub fn one() -> Self {
        Self::from_fp(Fp::one())
    }

    /// `1` if `a1 == 0`, i.e. this element lies in the `Fp` subfield.
    #[must_use]
    pub fn is_real(&self) -> Choice {
        self.a1.is_zero()
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self { a0: self.a0.add(&other.a0), a1: self.a1.add(&other.a1) }
    }

    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self { a0: self.a0.sub(&other.a0), a1: self.a1.sub(&other.a1) }
    }

    #[must_use]
    pub fn neg(&self) -> Self {
        Self { a0: self.a0.neg(), a1: self.a1.neg() }
    }

    /// Multiply by the `Fp`-rational scalar `2`.
    #[must_use]
    pub fn double(&self) -> Self {
        self.add(self)
    }

    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        let t0 = self.a0.mul(&other.a0);
        let t1 = self.a1.mul(&other.a1);
        let cross = self.a0.add(&self.a1).mul(&other.a0.add(&other.a1));
        Self { a0: t0.sub(&t1), a1: cross.sub(&t0).sub(&t1) }
    }

    #[must_use]
    pub fn square(&self) -> Self {
        let sum = self.a0.add(&self.a1);
        let diff = self.a0.sub(&self.a1);
        let cross = self.a0.mul(&self.a1);
        Self { a0: sum.mul(&diff), a1: cross.add(&cross) }
    }

    /// Squared norm `a0^2 + a1^2`, an `Fp`-rational value.
    #[must_use]
    fn norm(&self) -> Fp {
        self.a0.square().add(&self.a1.square())
    }

    /// `a^-1`, via `conj(a) / norm(a)`. Undefined (returns `0`) at `a = 0`.
    #[must_use]
    pub fn invert(&self) -> Self {
        let n_inv = self.norm().invert();
        Self { a0: self.a0.mul(&n_inv), a1: self.a1.neg().mul(&n_inv) }
    }

    #[must_use]
    pub fn is_zero(&self) -> Choice {
        self.a0.is_zero() & self.a1.is_zero()
    }

    /// Square root of a value known to lie in the `Fp` subfield
    /// (`a1 == 0`), using `p751 ≡ 3 (mod 4)` so that `sqrt(a) = a^((p+1)/4)`
    /// whenever `a` is a nonzero quadratic residue.
    ///
    /// Returns `None` if the caller passes a non-real element, or if
    /// the real value has no square root. Callers that only ever
    /// search for curve points over the base field (the basis-search
    /// strategy used throughout this crate) never hit the first case.
    #[must_use]
    pub fn sqrt_if_real_square(&self) -> Option<Self> {
        if !bool::from(self.is_real()) {
            return None;
        }
        if bool::from(self.a0.is_zero()) {
            return Some(Self::ZERO);
        }
        let candidate = fp_pow(&self.a0, &crate::params::P_PLUS_ONE_OVER_4);
        if candidate.mul(&candidate) == self.a0 {
            Some(Self::from_fp(candidate))
        } else {
            None
        }
    }

    /// `true` if `value` is a nonzero square in `Fp`, tested via
    /// Euler's criterion `value^((p-1)/2) == 1`.
    #[must_use]
    pub fn fp_is_square(value: &Fp) -> bool {
        if bool::from(value.is_zero()) {
            return true;
        }
        fp_pow(value, &crate::params::P_MINUS_1_OVER_2) == Fp::one()
    }
}

/// `base^exponent` in `Fp`, square-and-multiply over the limbs of
/// `exponent` (little-endian, same width as [`crate::bigint::Digits`]).
fn fp_pow(base: &Fp, exponent: &crate::bigint::Digits) -> Fp {
    let mut result = Fp::one();
    for limb in exponent.iter().rev() {
        for bit_index in (0..64).rev() {
            result = result.square();
            let bit = Choice::from(((limb >> bit_index) & 1) as u8);
            let multiplied = result.mul(base);
            result = Fp::conditional_select(&multiplied, &result, bit);
        }
    }
    result
}

impl ConditionallySelectable for Fp2 {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Self {
            a0: Fp::conditional_select(&a.a0, &b.a0, choice),
            a1: Fp::conditional_select(&a.a1, &b.a1, choice),
        }
    }
}

impl ConstantTimeEq for Fp2 {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.a0.ct_eq(&other.a0) & self.a1.ct_eq(&other.a1)
    }
}

impl PartialEq for Fp2 {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.ct_eq(other))
    }
}

impl Eq for Fp2 {}

/// Invert a batch of nonzero elements with a single [`Fp2::invert`]
/// call (Montgomery's trick), falling back to individual inversion
/// only for the final element.
#[must_use]
pub fn batch_invert(values: &[Fp2]) -> Vec<Fp2> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut prefix = Vec::with_capacity(values.len());
    let mut running = Fp2::one();
    for value in values {
        running = running.mul(value);
        prefix.push(running);
    }
    let Some(last) = prefix.last() else {
        unreachable!("values is non-empty, so prefix is non-empty")
    };
    let mut inverse_running = last.invert();
    let mut out = vec![Fp2::ZERO; values.len()];
    for index in (0..values.len()).rev() {
        let prior = if index == 0 { Fp2::one() } else { *prefix.get(index - 1).unwrap_or(&Fp2::one()) };
        let Some(slot) = out.get_mut(index) else {
            unreachable!("index < values.len() == out.len()")
        };
        *slot = inverse_running.mul(&prior);
        if let Some(value) = values.get(index) {
            inverse_running = inverse_running.mul(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::Fp2;
    use crate::fp::Fp;
    use proptest::prelude::*;

    fn fp_from_u64(value: u64) -> Fp {
        let mut digits = [0_u64; 12];
        if let Some(low) = digits.get_mut(0) {
            *low = value;
        }
        Fp::from_canonical_digits(digits)
    }

    #[test]
    fn inversion_roundtrip() {
        let value = Fp2 { a0: fp_from_u64(3), a1: fp_from_u64(5) };
        let inv = value.invert();
        assert_eq!(value.mul(&inv), Fp2::one());
    }

    #[test]
    fn square_matches_self_mul() {
        let value = Fp2 { a0: fp_from_u64(11), a1: fp_from_u64(2) };
        assert_eq!(value.square(), value.mul(&value));
    }

    #[test]
    fn batch_invert_matches_individual() {
        let values = vec![
            Fp2 { a0: fp_from_u64(3), a1: fp_from_u64(1) },
            Fp2 { a0: fp_from_u64(7), a1: fp_from_u64(0) },
            Fp2 { a0: fp_from_u64(9), a1: fp_from_u64(4) },
        ];
        let batched = super::batch_invert(&values);
        for (value, inv) in values.iter().zip(batched.iter()) {
            assert_eq!(value.mul(inv), Fp2::one());
        }
    }

    fn fp2_from_u64(a0: u64, a1: u64) -> Fp2 {
        Fp2 { a0: fp_from_u64(a0), a1: fp_from_u64(a1) }
    }

    proptest! {
        #[test]
        fn multiplication_is_commutative(
            a0 in any::<u64>(), a1 in any::<u64>(),
            b0 in any::<u64>(), b1 in any::<u64>(),
        ) {
            let (a, b) = (fp2_from_u64(a0, a1), fp2_from_u64(b0, b1));
            prop_assert_eq!(a.mul(&b), b.mul(&a));
        }

        #[test]
        fn multiplication_distributes_over_addition(
            a0 in any::<u64>(), a1 in any::<u64>(),
            b0 in any::<u64>(), b1 in any::<u64>(),
            c0 in any::<u64>(), c1 in any::<u64>(),
        ) {
            let (a, b, c) = (fp2_from_u64(a0, a1), fp2_from_u64(b0, b1), fp2_from_u64(c0, c1));
            prop_assert_eq!(a.mul(&b.add(&c)), a.mul(&b).add(&a.mul(&c)));
        }

        #[test]
        fn square_matches_self_mul(a0 in any::<u64>(), a1 in any::<u64>()) {
            let a = fp2_from_u64(a0, a1);
            prop_assert_eq!(a.square(), a.mul(&a));
        }

        #[test]
        fn nonzero_inversion_roundtrips(a0 in 1_u64..=u64::MAX, a1 in any::<u64>()) {
            let a = fp2_from_u64(a0, a1);
            prop_assert_eq!(a.mul(&a.invert()), Fp2::one());
        }
    }
}
