//! L1 — arithmetic in `GF(p751)`, Montgomery domain.
//!
//! `p751 = 2^372 * 3^239 - 1`. Every [`Fp`] value is stored as `a * R mod
//! p` with `R = 2^768`; this lets multiplication reduce with a single
//! CIOS (coarsely integrated operand scanning) pass instead of a full
//! division. A quirk of this particular modulus — `p751 mod 2^64 ==
//! 2^64 - 1`, because the `2^372` term vanishes mod `2^64` — makes the
//! Montgomery reduction constant `-p^-1 mod 2^64` equal to `1` exactly,
//! the same simplification the Microsoft reference implementation
//! documents and relies on.

use crate::bigint::{mp_add, mp_sub, ct_lt, Digits, NWORDS_FIELD};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// `p751`, little-endian limbs.
pub const P: Digits = [
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xeeaf_ffff_ffff_ffff,
    0xe3ec_9685_49f8_78a8,
    0xda95_9b1a_13f7_cc76,
    0x084e_9867_d6eb_e876,
    0x8562_b504_5cb2_5748,
    0x0e12_909f_97ba_dc66,
    0x0000_6fe5_d541_f71c,
];

/// `R^2 mod p`, used to lift a plain integer into Montgomery form.
const R2_MOD_P: Digits = [
    0x2330_4644_9dad_4058,
    0xdb01_0161_a696_452a,
    0x5e36_9414_72e3_fd8e,
    0xf40b_fe20_82a2_e706,
    0x4932_cca8_904f_8751,
    0x1f73_5f1f_1ee7_fc81,
    0xa24f_4d80_c104_8e18,
    0xb56c_383c_cdb6_07c5,
    0x441d_d47b_735f_9c90,
    0x5673_ed2c_6a6a_c82a,
    0x06c9_0526_1132_294b,
    0x0000_41ad_830f_1f35,
];

/// `p - 2`, the exponent for Fermat-inverse via `a^(p-2)`.
const P_MINUS_2: Digits = [
    0xffff_ffff_ffff_fffd,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xeeaf_ffff_ffff_ffff,
    0xe3ec_9685_49f8_78a8,
    0xda95_9b1a_13f7_cc76,
    0x084e_9867_d6eb_e876,
    0x8562_b504_5cb2_5748,
    0x0e12_909f_97ba_dc66,
    0x0000_6fe5_d541_f71c,
];

/// `-p^-1 mod 2^64`. Equal to `1` for this modulus; see the module
/// doc comment.
const MONTGOMERY_NEG_INV: u64 = 1;

const MONT_WORK_WIDTH: usize = NWORDS_FIELD + 2;

/// An element of `GF(p751)`, stored in Montgomery form.
#[derive(Clone, Copy)]
pub struct Fp(Digits);

impl core::fmt::Debug for Fp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Fp").field(&self.to_canonical_digits()).finish()
    }
}

impl Fp {
    /// The additive identity.
    pub const ZERO: Self = Self([0_u64; NWORDS_FIELD]);

    /// Lift a little-endian limb array, interpreted as a value already
    /// reduced mod `p`, into Montgomery form.
    #[must_use]
    pub fn from_canonical_digits(digits: Digits) -> Self {
        mont_mul(&digits, &R2_MOD_P)
    }

    /// The multiplicative identity, `1`.
    #[must_use]
    pub fn one() -> Self {
        Self::from_canonical_digits({
            let mut one = [0_u64; NWORDS_FIELD];
            if let Some(low) = one.get_mut(0) {
                *low = 1;
            }
            one
        })
    }

    /// Demontgomerize back to a plain little-endian limb array in
    /// `0..p`.
    #[must_use]
    pub fn to_canonical_digits(self) -> Digits {
        let one = [1_u64, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let Fp(plain) = mont_mul(&self.0, &one);
        plain
    }

    /// `a + b mod p`.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let (sum, _carry) = mp_add(&self.0, &other.0);
        let (reduced, borrow) = mp_sub(&sum, &P);
        let needs_reduction = Choice::from((1 - borrow) as u8);
        Self(crate::bigint::conditional_select(&reduced, &sum, needs_reduction))
    }

    /// `a - b mod p`.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        let (diff, borrow) = mp_sub(&self.0, &other.0);
        let (corrected, _) = mp_add(&diff, &P);
        let went_negative = Choice::from(borrow as u8);
        Self(crate::bigint::conditional_select(&corrected, &diff, went_negative))
    }

    /// `-a mod p`.
    #[must_use]
    pub fn neg(&self) -> Self {
        Self::ZERO.sub(self)
    }

    /// `a * b mod p`, Montgomery form preserved.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        mont_mul(&self.0, &other.0)
    }

    /// `a^2 mod p`.
    #[must_use]
    pub fn square(&self) -> Self {
        self.mul(self)
    }

    /// `a^-1 mod p` via `a^(p-2)`, constant time in the exponent bits.
    ///
    /// Undefined (returns `0`) if `a` is `0`; callers on the hot path
    /// never invert a value that can be attacker-controlled zero
    /// without checking first.
    #[must_use]
    pub fn invert(&self) -> Self {
        let mut result = Self::one();
        for limb in P_MINUS_2.iter().rev() {
            for bit_index in (0..64).rev() {
                result = result.square();
                let bit = Choice::from(((limb >> bit_index) & 1) as u8);
                let multiplied = result.mul(self);
                result = Self::conditional_select(&multiplied, &result, bit);
            }
        }
        result
    }

    /// `1` if this element is `0`.
    #[must_use]
    pub fn is_zero(&self) -> Choice {
        crate::bigint::ct_is_zero(&self.0)
    }
}

impl ConditionallySelectable for Fp {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut out = [0_u64; NWORDS_FIELD];
        for (slot, (&x, &y)) in out.iter_mut().zip(a.0.iter().zip(b.0.iter())) {
            *slot = u64::conditional_select(&y, &x, choice);
        }
        Self(out)
    }
}

impl ConstantTimeEq for Fp {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for Fp {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.ct_eq(other))
    }
}

impl Eq for Fp {}

/// CIOS Montgomery multiplication, widening each partial product
/// through a `u128`. `a` and `b` may each independently be a plain
/// value or a Montgomery-form one; which is which determines whether
/// the result is plain, Montgomery, or doubly-Montgomery.
fn mont_mul(a: &Digits, b: &Digits) -> Fp {
    let mut acc = [0_u64; MONT_WORK_WIDTH];
    for &ai in a {
        let mut carry: u128 = 0;
        for (j, &bj) in b.iter().enumerate() {
            let Some(slot) = acc.get_mut(j) else {
                unreachable!("j < NWORDS_FIELD < MONT_WORK_WIDTH")
            };
            let wide = u128::from(ai) * u128::from(bj) + u128::from(*slot) + carry;
            *slot = wide as u64;
            carry = wide >> 64;
        }
        let Some(hi) = acc.get_mut(NWORDS_FIELD) else {
            unreachable!("NWORDS_FIELD < MONT_WORK_WIDTH")
        };
        let wide = u128::from(*hi) + carry;
        *hi = wide as u64;
        let top_carry = wide >> 64;
        if let Some(top) = acc.get_mut(NWORDS_FIELD + 1) {
            *top += top_carry as u64;
        }

        let low = acc.first().copied().unwrap_or(0);
        let m = low.wrapping_mul(MONTGOMERY_NEG_INV);
        let mut carry2: u128 = u128::from(m) * u128::from(P.first().copied().unwrap_or(0))
            + u128::from(low);
        carry2 >>= 64;
        for j in 1..NWORDS_FIELD {
            let Some(pj) = P.get(j) else {
                unreachable!("j < NWORDS_FIELD")
            };
            let Some(slot) = acc.get(j).copied() else {
                unreachable!("j < NWORDS_FIELD < MONT_WORK_WIDTH")
            };
            let wide = u128::from(m) * u128::from(*pj) + u128::from(slot) + carry2;
            if let Some(dest) = acc.get_mut(j - 1) {
                *dest = wide as u64;
            }
            carry2 = wide >> 64;
        }
        let hi_val = acc.get(NWORDS_FIELD).copied().unwrap_or(0);
        let wide = u128::from(hi_val) + carry2;
        if let Some(dest) = acc.get_mut(NWORDS_FIELD - 1) {
            *dest = wide as u64;
        }
        let next_hi = acc.get(NWORDS_FIELD + 1).copied().unwrap_or(0);
        let new_hi = u128::from(next_hi) + (wide >> 64);
        if let Some(dest) = acc.get_mut(NWORDS_FIELD) {
            *dest = new_hi as u64;
        }
        if let Some(top) = acc.get_mut(NWORDS_FIELD + 1) {
            *top = 0;
        }
    }

    let mut out = [0_u64; NWORDS_FIELD];
    out.copy_from_slice(&acc[..NWORDS_FIELD]);
    let already_reduced = ct_lt(&out, &P);
    let (reduced, _) = mp_sub(&out, &P);
    Fp(crate::bigint::conditional_select(&out, &reduced, already_reduced))
}

#[cfg(test)]
mod tests {
    use super::Fp;
    use proptest::prelude::*;

    #[test]
    fn one_times_one_is_one() {
        let one = Fp::one();
        assert_eq!(one.mul(&one), one);
    }

    #[test]
    fn additive_inverse_is_zero() {
        let one = Fp::one();
        let neg_one = one.neg();
        assert!(bool::from(one.add(&neg_one).is_zero()));
    }

    #[test]
    fn inversion_roundtrip() {
        let five = Fp::from_canonical_digits({
            let mut d = [0_u64; 12];
            if let Some(low) = d.get_mut(0) {
                *low = 5;
            }
            d
        });
        let inv = five.invert();
        assert_eq!(five.mul(&inv), Fp::one());
    }

    #[test]
    fn zero_has_no_effect_on_addition() {
        let five = Fp::from_canonical_digits({
            let mut d = [0_u64; 12];
            if let Some(low) = d.get_mut(0) {
                *low = 5;
            }
            d
        });
        assert_eq!(five.add(&Fp::ZERO), five);
    }

    fn fp_from_u64(value: u64) -> Fp {
        let mut digits = [0_u64; 12];
        if let Some(low) = digits.get_mut(0) {
            *low = value;
        }
        Fp::from_canonical_digits(digits)
    }

    proptest! {
        #[test]
        fn addition_is_commutative(a in any::<u64>(), b in any::<u64>()) {
            let (a, b) = (fp_from_u64(a), fp_from_u64(b));
            prop_assert_eq!(a.add(&b), b.add(&a));
        }

        #[test]
        fn addition_is_associative(a in any::<u64>(), b in any::<u64>(), c in any::<u64>()) {
            let (a, b, c) = (fp_from_u64(a), fp_from_u64(b), fp_from_u64(c));
            prop_assert_eq!(a.add(&b).add(&c), a.add(&b.add(&c)));
        }

        #[test]
        fn multiplication_is_commutative(a in any::<u64>(), b in any::<u64>()) {
            let (a, b) = (fp_from_u64(a), fp_from_u64(b));
            prop_assert_eq!(a.mul(&b), b.mul(&a));
        }

        #[test]
        fn multiplication_distributes_over_addition(a in any::<u64>(), b in any::<u64>(), c in any::<u64>()) {
            let (a, b, c) = (fp_from_u64(a), fp_from_u64(b), fp_from_u64(c));
            prop_assert_eq!(a.mul(&b.add(&c)), a.mul(&b).add(&a.mul(&c)));
        }

        #[test]
        fn nonzero_inversion_roundtrips(a in 1_u64..=u64::MAX) {
            let a = fp_from_u64(a);
            prop_assert_eq!(a.mul(&a.invert()), Fp::one());
        }
    }
}
