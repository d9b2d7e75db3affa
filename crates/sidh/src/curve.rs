//! L3 — x-only projective arithmetic on Montgomery curves `C*y^2 =
//! x^3 + (A/C)*x^2 + x` over `GF(p751^2)`.
//!
//! Every point is carried as a projective pair `(X : Z)` standing for
//! the affine x-coordinate `X/Z`; curves are carried as `(A : C)`
//! rather than a normalized `A/C` so that isogeny evaluation never
//! needs an inversion per step. The formulas below (`xDBL`, `xADD`,
//! `xTPL`, the three-point ladder) are the standard Montgomery
//! x-only set used throughout the isogeny-based key exchange
//! literature; `xTPL` here is built by composing `xDBL` and `xADD`
//! rather than using the dedicated tripling formula, which keeps the
//! arithmetic core smaller at the cost of one extra field
//! multiplication per tripling.

use crate::fp2::Fp2;

/// A projective point `(X : Z)` on some Montgomery curve, standing
/// for the affine x-coordinate `X/Z` (or the point at infinity when
/// `Z = 0`).
#[derive(Clone, Copy, Debug)]
pub struct ProjectivePoint {
    /// Numerator.
    pub x: Fp2,
    /// Denominator; zero encodes the point at infinity.
    pub z: Fp2,
}

impl ProjectivePoint {
    /// Lift an affine x-coordinate (`Z = 1`).
    #[must_use]
    pub fn from_affine(x: Fp2) -> Self {
        Self { x, z: Fp2::one() }
    }

    /// The point at infinity.
    #[must_use]
    pub fn infinity() -> Self {
        Self { x: Fp2::one(), z: Fp2::ZERO }
    }

    /// Recover the affine x-coordinate. Callers must not pass the
    /// point at infinity.
    #[must_use]
    pub fn to_affine(&self) -> Fp2 {
        self.x.mul(&self.z.invert())
    }
}

/// A Montgomery curve given by its projective coefficient pair
/// `(A : C)`, where the curve equation is `C*y^2 = x^3 + (A/C)*x^2 + x`.
#[derive(Clone, Copy, Debug)]
pub struct MontgomeryCurve {
    /// `A`.
    pub a: Fp2,
    /// `C`.
    pub c: Fp2,
}

impl MontgomeryCurve {
    /// The base curve `E0: y^2 = x^3 + x` (`A = 0`, `C = 1`).
    #[must_use]
    pub fn base() -> Self {
        Self { a: Fp2::ZERO, c: Fp2::one() }
    }

    /// `(A + 2C : 4C)`, the doubling constants used by [`xdbl`] and
    /// [`xdble`]. Precompute once per curve rather than per call.
    #[must_use]
    pub fn doubling_constants(&self) -> (Fp2, Fp2) {
        let a24 = self.a.add(&self.c.double());
        let c24 = self.c.double().double();
        (a24, c24)
    }

    /// The `j`-invariant, `256*(A^2-3C^2)^3 / (C^4*(A^2-4C^2))`.
    #[must_use]
    pub fn j_invariant(&self) -> Fp2 {
        let a_sq = self.a.square();
        let c_sq = self.c.square();
        let three_c_sq = c_sq.add(&c_sq).add(&c_sq);
        let four_c_sq = three_c_sq.add(&c_sq);
        let numerator_base = a_sq.sub(&three_c_sq);
        let numerator = numerator_base.square().mul(&numerator_base).mul(&fp2_const(256));
        let denominator = c_sq.square().mul(&a_sq.sub(&four_c_sq));
        numerator.mul(&denominator.invert())
    }
}

fn fp2_const(value: u64) -> Fp2 {
    let mut digits = [0_u64; crate::bigint::NWORDS_FIELD];
    if let Some(low) = digits.get_mut(0) {
        *low = value;
    }
    Fp2::from_fp(crate::fp::Fp::from_canonical_digits(digits))
}

/// Point doubling: `[2](X : Z)` on the curve with doubling constants
/// `(A24, C24) = (A + 2C, 4C)`.
#[must_use]
pub fn xdbl(p: &ProjectivePoint, a24: &Fp2, c24: &Fp2) -> ProjectivePoint {
    let t0 = p.x.sub(&p.z).square();
    let t1 = p.x.add(&p.z).square();
    let z2 = c24.mul(&t0);
    let x2 = z2.mul(&t1);
    let t1_minus_t0 = t1.sub(&t0);
    let t0b = a24.mul(&t1_minus_t0);
    let z2b = z2.add(&t0b).mul(&t1_minus_t0);
    ProjectivePoint { x: x2, z: z2b }
}

/// `[2^e](X : Z)`, repeated doubling.
#[must_use]
pub fn xdble(p: &ProjectivePoint, a24: &Fp2, c24: &Fp2, e: u32) -> ProjectivePoint {
    let mut acc = *p;
    for _ in 0..e {
        acc = xdbl(&acc, a24, c24);
    }
    acc
}

/// Differential addition: given `P`, `Q`, and the affine x-coordinate
/// of `P - Q`, compute `P + Q`. `diff` must be affine (`Z = 1`) —
/// every caller in this crate normalizes the difference point once,
/// up front, rather than per step.
#[must_use]
pub fn xadd(p: &ProjectivePoint, q: &ProjectivePoint, diff_x: &Fp2) -> ProjectivePoint {
    let t0 = p.x.add(&p.z);
    let t1 = p.x.sub(&p.z);
    let t2 = q.x.add(&q.z);
    let t3 = q.x.sub(&q.z);
    let t0b = t0.mul(&t3);
    let t1b = t1.mul(&t2);
    let sum = t0b.add(&t1b).square();
    let diff = t0b.sub(&t1b).square();
    ProjectivePoint { x: sum, z: diff_x.mul(&diff) }
}

/// Tripling via `xadd(xdbl(p), p, p)`.
#[must_use]
pub fn xtpl(p: &ProjectivePoint, a24: &Fp2, c24: &Fp2) -> ProjectivePoint {
    let doubled = xdbl(p, a24, c24);
    xadd(&doubled, p, &p.to_affine())
}

/// `[3^e](X : Z)`, repeated tripling.
#[must_use]
pub fn xtple(p: &ProjectivePoint, a24: &Fp2, c24: &Fp2, e: u32) -> ProjectivePoint {
    let mut acc = *p;
    for _ in 0..e {
        acc = xtpl(&acc, a24, c24);
    }
    acc
}

/// The three-point Montgomery ladder: given the affine x-coordinates
/// of `P`, `Q`, and `P - Q` on `curve`, and a scalar `m` with `bit_len`
/// bits, compute `P + [m]Q`.
///
/// This is the standard three-register ladder (registers tracking
/// `O`, `Q`, `P`, updated most-significant-bit first) used to apply a
/// secret scalar to a public kernel-generating pair without ever
/// branching on a bit of `m` — both registers are recomputed every
/// iteration and [`core::ops`]-level `Fp2` operations take the same
/// path regardless of the bit.
///
/// `P`, `Q`, `P - Q` must all be affine x-coordinates on `curve` — for
/// Alice's and Bob's own key generation that is the fixed base curve
/// `E0`, but for agreement it is whatever codomain curve the peer's
/// public key landed on.
#[must_use]
pub fn ladder_3_pt(
    p_x: &Fp2,
    q_x: &Fp2,
    pq_x: &Fp2,
    scalar_bits: &[bool],
    curve: &MontgomeryCurve,
) -> ProjectivePoint {
    let (a24, c24) = curve.doubling_constants();
    let mut r0 = ProjectivePoint::infinity();
    let mut r1 = ProjectivePoint::from_affine(*q_x);
    let mut r2 = ProjectivePoint::from_affine(*p_x);
    for &bit in scalar_bits.iter().rev() {
        if bit {
            let new_r2 = xadd(&r2, &r1, pq_x);
            let new_r0 = xadd(&r0, &r1, q_x);
            let new_r1 = xdbl(&r1, &a24, &c24);
            r0 = new_r0;
            r1 = new_r1;
            r2 = new_r2;
        } else {
            let new_r2 = xadd(&r2, &r0, p_x);
            let new_r1 = xadd(&r0, &r1, q_x);
            let new_r0 = xdbl(&r0, &a24, &c24);
            r0 = new_r0;
            r1 = new_r1;
            r2 = new_r2;
        }
    }
    r2
}

/// Recover a Montgomery curve's `A` coefficient (with `C = 1`) from
/// the affine x-coordinates of `P`, `Q`, and `P - Q`. Used to
/// reconstruct the codomain curve carried implicitly in a peer's
/// public key.
#[must_use]
pub fn recover_curve_a(p_x: &Fp2, q_x: &Fp2, p_minus_q_x: &Fp2) -> Fp2 {
    let pq = p_x.mul(q_x);
    let pr = p_x.mul(p_minus_q_x);
    let qr = q_x.mul(p_minus_q_x);
    let one = Fp2::one();
    let numerator = one.sub(&pq).sub(&pr).sub(&qr);
    let numerator_sq = numerator.square();
    let four = fp2_const(4);
    let denominator = four.mul(&pq).mul(p_minus_q_x);
    let quotient = numerator_sq.mul(&denominator.invert());
    quotient.sub(p_x).sub(q_x).sub(p_minus_q_x)
}

/// Full `(x, y)` affine arithmetic on a Montgomery curve with `A = 0`,
/// `C = 1` — the base curve only. Used exclusively for one-time setup
/// (deriving the fixed torsion bases, computing pairings, and the
/// discrete-log machinery in `compression.rs`), never on the hot
/// scalar-multiplication path, so there is no pressure to make it
/// x-only or constant time.
pub mod affine {
    use crate::fp::Fp;
    use crate::fp2::Fp2;

    /// A point on `E0: y^2 = x^3 + x`, or the identity.
    pub type AffinePoint = Option<(Fp2, Fp2)>;

    /// The distortion map `tau(x, y) = (-x, i*y)`, which sends any
    /// point on `E0` to an independent one of the same order — the
    /// standard trick for building a full-rank torsion basis without
    /// needing a second independent `x`-search.
    #[must_use]
    pub fn distort(point: (Fp2, Fp2)) -> (Fp2, Fp2) {
        let (x, y) = point;
        let i = Fp2 { a0: Fp::ZERO, a1: Fp::one() };
        (x.neg(), i.mul(&y))
    }

    /// `-P`.
    #[must_use]
    pub fn negate(point: AffinePoint) -> AffinePoint {
        point.map(|(x, y)| (x, y.neg()))
    }

    /// `[2]P` on `E0` (`A = 0`).
    #[must_use]
    pub fn double(point: AffinePoint) -> AffinePoint {
        double_on(&Fp2::ZERO, point)
    }

    /// `[2]P` on the curve `y^2 = x^3 + a*x^2 + x`.
    #[must_use]
    pub fn double_on(a: &Fp2, point: AffinePoint) -> AffinePoint {
        let (x, y) = point?;
        if bool::from(y.is_zero()) {
            return None;
        }
        let three = Fp2::from_fp(Fp::one().add(&Fp::one()).add(&Fp::one()));
        let numerator = x.square().mul(&three).add(&a.mul(&x).double()).add(&Fp2::one());
        let lambda = numerator.mul(&y.double().invert());
        let x3 = lambda.square().sub(a).sub(&x.double());
        let y3 = lambda.mul(&x.sub(&x3)).sub(&y);
        Some((x3, y3))
    }

    /// `P + Q` on `E0` (`A = 0`).
    #[must_use]
    pub fn add(p: AffinePoint, q: AffinePoint) -> AffinePoint {
        add_on(&Fp2::ZERO, p, q)
    }

    /// `P + Q` on the curve `y^2 = x^3 + a*x^2 + x`.
    #[must_use]
    pub fn add_on(a: &Fp2, p: AffinePoint, q: AffinePoint) -> AffinePoint {
        let (p, q) = match (p, q) {
            (None, other) => return other,
            (other, None) => return other,
            (Some(p), Some(q)) => (p, q),
        };
        let (x1, y1) = p;
        let (x2, y2) = q;
        if x1 == x2 {
            return if bool::from(y1.add(&y2).is_zero()) { None } else { double_on(a, Some((x1, y1))) };
        }
        let lambda = y2.sub(&y1).mul(&x2.sub(&x1).invert());
        let x3 = lambda.square().sub(a).sub(&x1).sub(&x2);
        let y3 = lambda.mul(&x1.sub(&x3)).sub(&y1);
        Some((x3, y3))
    }

    /// `[scalar]P`, double-and-add, least-significant bit first.
    #[must_use]
    pub fn scalar_mul(scalar: &crate::bigint::Digits, point: AffinePoint) -> AffinePoint {
        scalar_mul_on(&Fp2::ZERO, scalar, point)
    }

    /// `[scalar]P` on the curve `y^2 = x^3 + a*x^2 + x`.
    #[must_use]
    pub fn scalar_mul_on(a: &Fp2, scalar: &crate::bigint::Digits, point: AffinePoint) -> AffinePoint {
        let mut acc: AffinePoint = None;
        let mut running = point;
        for limb in scalar {
            for bit_index in 0..64_u32 {
                if (limb >> bit_index) & 1 == 1 {
                    acc = add_on(a, acc, running);
                }
                running = double_on(a, running);
            }
        }
        acc
    }

    /// The slope used by [`add_on`]/[`double_on`] and the Montgomery-curve
    /// line-function evaluation pairings need, exposed separately so
    /// callers that build a Miller loop don't recompute the group law.
    #[must_use]
    pub fn slope_on(a: &Fp2, p: (Fp2, Fp2), q: (Fp2, Fp2)) -> Fp2 {
        let (x1, y1) = p;
        let (x2, y2) = q;
        if x1 == x2 {
            let three = Fp2::from_fp(Fp::one().add(&Fp::one()).add(&Fp::one()));
            let numerator = x1.square().mul(&three).add(&a.mul(&x1).double()).add(&Fp2::one());
            return numerator.mul(&y1.double().invert());
        }
        y2.sub(&y1).mul(&x2.sub(&x1).invert())
    }
}

#[cfg(test)]
mod tests {
    use super::{xadd, xdbl, xdble, xtpl, xtple, MontgomeryCurve};
    use crate::fp2::Fp2;

    #[test]
    fn doubling_then_halving_shape_is_consistent() {
        let curve = MontgomeryCurve::base();
        let (a24, c24) = curve.doubling_constants();
        let p = super::ProjectivePoint::from_affine(Fp2::one());
        let doubled = xdbl(&p, &a24, &c24);
        let doubled_again = xdble(&p, &a24, &c24, 1);
        assert_eq!(doubled.to_affine(), doubled_again.to_affine());
    }

    #[test]
    fn tripling_matches_repeated_single_tripling() {
        let curve = MontgomeryCurve::base();
        let (a24, c24) = curve.doubling_constants();
        let p = super::ProjectivePoint::from_affine(Fp2::one());
        let tripled = xtpl(&p, &a24, &c24);
        let tripled_again = xtple(&p, &a24, &c24, 1);
        assert_eq!(tripled.to_affine(), tripled_again.to_affine());
    }

    #[test]
    fn j_invariant_of_base_curve_is_1728() {
        let curve = MontgomeryCurve::base();
        let j = curve.j_invariant();
        let expected = super::fp2_const(1728);
        assert_eq!(j, expected);
    }

    #[test]
    fn xadd_is_symmetric_in_its_operands() {
        let curve = MontgomeryCurve::base();
        let (a24, c24) = curve.doubling_constants();
        let p = super::ProjectivePoint::from_affine(Fp2::one());
        let q = xdbl(&p, &a24, &c24);
        let diff = p.to_affine();
        let sum1 = xadd(&p, &q, &diff);
        let sum2 = xadd(&q, &p, &diff);
        assert_eq!(sum1.to_affine(), sum2.to_affine());
    }
}
