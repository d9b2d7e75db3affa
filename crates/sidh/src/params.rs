//! Fixed public parameters: the prime, the starting curve, and the
//! two fixed torsion bases every key exchange walks from.
//!
//! The torsion bases (`{P, Q}` of order `2^eA` for Alice, order
//! `3^eB` for Bob, both on the base curve `E0: y^2 = x^3 + x`) are
//! ordinarily shipped as a literal table, generated once by whoever
//! defines the parameter set via Elligator-style hashing. Lacking
//! that derivation here, this crate derives them itself, once, by a
//! deterministic search over `x = 1, 2, 3, ...` on `E0` — deterministic
//! so that every process derives the identical basis without needing
//! to embed one. The search result is cached behind a [`OnceLock`]
//! after the first call.

use crate::bigint::Digits;
use crate::curve::affine::{add as affine_add, distort, scalar_mul as affine_scalar_mul};
use crate::curve::MontgomeryCurve;
use crate::fp::Fp;
use crate::fp2::Fp2;
use crate::party::Party;
use core::sync::OnceLock;

/// `(p + 1) / 4`, the exponent used for `Fp` square roots (`p ≡ 3 mod
/// 4`).
pub const P_PLUS_ONE_OVER_4: Digits = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x3bac_0000_0000_0000,
    0xb8fb_25a1_527e_1e2a,
    0xb6a5_66c6_84fd_f31d,
    0x0213_a619_f5ba_fa1d,
    0xa158_ad41_172c_95d2,
    0x0384_a427_e5ee_b719,
    0x0000_1bf9_7550_7dc7,
];

/// `(p - 1) / 2`, the exponent for the `Fp` Euler-criterion test.
pub const P_MINUS_1_OVER_2: Digits = [
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0x7757_ffff_ffff_ffff,
    0x71f6_4b42_a4fc_3c54,
    0x6d4a_cd8d_09fb_e63b,
    0x0427_4c33_eb75_f43b,
    0x42b1_5a82_2e59_2ba4,
    0x0709_484f_cbdd_6e33,
    0x0000_37f2_eaa0_fb8e,
];

pub(crate) const THREE_POW_EB: Digits = [
    0xc968_549f_878a_8eeb,
    0x59b1_a13f_7cc7_6e3e,
    0xe986_7d6e_be87_6da9,
    0x2b50_45cb_2574_8084,
    0x2909_f97b_adc6_6856,
    0x06fe_5d54_1f71_c0e1,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
];

pub(crate) const TWO_POW_EA: Digits = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0010_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
];

pub(crate) const TWO_POW_EA_MINUS_1: Digits = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0008_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
];

pub(crate) const THREE_POW_EB_MINUS_1: Digits = [
    0xedcd_718a_8283_84f9,
    0x733b_35bf_d442_7a14,
    0xf882_29cf_94d7_cf38,
    0x63c5_6c99_0c7c_2ad6,
    0xb858_a87e_8f42_22c7,
    0x0254_c9c6_b525_eaf5,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0000,
];

/// Caller-provided randomness, fallible rather than infallible so a
/// starved hardware RNG surfaces as a [`SidhError`](crate::error::SidhError)
/// instead of a panic.
pub trait RandomSource {
    /// Fill `out` with random bytes, or report that the source failed.
    fn try_fill_bytes(&mut self, out: &mut [u8]) -> Result<(), crate::error::SidhError>;
}

impl<T> RandomSource for T
where
    T: rand_core::RngCore + rand_core::CryptoRng,
{
    fn try_fill_bytes(&mut self, out: &mut [u8]) -> Result<(), crate::error::SidhError> {
        rand_core::RngCore::try_fill_bytes(self, out).map_err(|_error| crate::error::SidhError::Rng)
    }
}

/// Tunable, non-secret parameters of one instantiation of the
/// protocol. The only parameter set this crate ships is [`P751`],
/// but callers are not forced to reach for a global: the value is
/// passed explicitly to every top-level operation.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSet {
    /// Upper bound on rejection-sampling retries (torsion-basis
    /// search, scalar sampling) before giving up with
    /// [`SidhError::TooManyIterations`](crate::error::SidhError::TooManyIterations).
    pub max_rng_iterations: u32,
}

/// The `p751` parameter set (`eA = 372`, `eB = 239`).
pub const P751: ParameterSet = ParameterSet { max_rng_iterations: 100 };

/// The affine x-coordinates of a party's fixed torsion basis on the
/// base curve: `p_x = x(P)`, `q_x = x(Q)`, `pq_x = x(P - Q)`.
#[derive(Clone, Copy, Debug)]
pub struct TorsionBasis {
    /// `x(P)`.
    pub p_x: Fp2,
    /// `x(Q)`.
    pub q_x: Fp2,
    /// `x(P - Q)`.
    pub pq_x: Fp2,
}

static ALICE_BASIS: OnceLock<TorsionBasis> = OnceLock::new();
static BOB_BASIS: OnceLock<TorsionBasis> = OnceLock::new();

/// The fixed torsion basis for `party` on the base curve `E0`.
#[must_use]
pub fn base_torsion_basis(party: Party) -> &'static TorsionBasis {
    match party {
        Party::Alice => ALICE_BASIS.get_or_init(|| derive_basis(&THREE_POW_EB, 2, &TWO_POW_EA_MINUS_1)),
        Party::Bob => BOB_BASIS.get_or_init(|| derive_basis(&TWO_POW_EA, 3, &THREE_POW_EB_MINUS_1)),
    }
}

type AffinePoint = (Fp2, Fp2);

/// Deterministic incremental search for a point of exact order
/// `remove_base^(power)` on `E0`, where `power` is implied by
/// `remaining_order_check` (`remove_base^(power - 1)`), after
/// clearing the unwanted cofactor.
fn search_exact_order_point(cofactor: &Digits, remaining_order_check: &Digits) -> AffinePoint {
    let mut candidate = 1_u64;
    loop {
        let x = Fp2::from_fp(fp_from_u64(candidate));
        let rhs = x.square().mul(&x).add(&x);
        if let Some(y) = rhs.sqrt_if_real_square() {
            if let Some(scaled) = affine_scalar_mul(cofactor, Some((x, y))) {
                if affine_scalar_mul(remaining_order_check, Some(scaled)).is_some() {
                    return scaled;
                }
            }
        }
        candidate += 1;
    }
}

fn fp_from_u64(value: u64) -> Fp {
    let mut digits = [0_u64; crate::bigint::NWORDS_FIELD];
    if let Some(low) = digits.get_mut(0) {
        *low = value;
    }
    Fp::from_canonical_digits(digits)
}

fn derive_basis(cofactor: &Digits, _remove_base: u64, remaining_order_check: &Digits) -> TorsionBasis {
    let p_point = search_exact_order_point(cofactor, remaining_order_check);
    let q_point = distort(p_point);
    let p_minus_q = affine_add(Some(p_point), crate::curve::affine::negate(Some(q_point)));
    let Some((p_minus_q_x, _)) = p_minus_q else {
        unreachable!("P and distort(P) are independent generators, P - Q is never the identity")
    };
    TorsionBasis { p_x: p_point.0, q_x: q_point.0, pq_x: p_minus_q_x }
}

/// The base curve `E0`.
#[must_use]
pub fn base_curve() -> MontgomeryCurve {
    MontgomeryCurve::base()
}

#[cfg(test)]
mod tests {
    use super::{base_torsion_basis, fp_from_u64};
    use crate::curve::{xdble, xtple, MontgomeryCurve, ProjectivePoint};
    use crate::party::Party;

    #[test]
    fn alice_basis_point_has_full_2_power_order() {
        let basis = base_torsion_basis(Party::Alice);
        let curve = MontgomeryCurve::base();
        let (a24, c24) = curve.doubling_constants();
        let full = xdble(&ProjectivePoint::from_affine(basis.p_x), &a24, &c24, Party::Alice.chain_length());
        assert!(bool::from(full.z.is_zero()));
        let almost = xdble(&ProjectivePoint::from_affine(basis.p_x), &a24, &c24, Party::Alice.chain_length() - 1);
        assert!(!bool::from(almost.z.is_zero()));
    }

    #[test]
    fn bob_basis_point_has_full_3_power_order() {
        let basis = base_torsion_basis(Party::Bob);
        let curve = MontgomeryCurve::base();
        let (a24, c24) = curve.doubling_constants();
        let full = xtple(&ProjectivePoint::from_affine(basis.p_x), &a24, &c24, Party::Bob.chain_length());
        assert!(bool::from(full.z.is_zero()));
        let almost = xtple(&ProjectivePoint::from_affine(basis.p_x), &a24, &c24, Party::Bob.chain_length() - 1);
        assert!(!bool::from(almost.z.is_zero()));
    }

    #[test]
    fn candidate_field_lift_roundtrips() {
        let five = fp_from_u64(5);
        assert_eq!(five.to_canonical_digits().first().copied(), Some(5));
    }
}
