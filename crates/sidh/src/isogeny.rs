//! L4 — isogeny computation and evaluation.
//!
//! Three isogeny degrees are needed: the very first 4-isogeny out of
//! the base curve `E0: y^2 = x^3 + x` has a fixed kernel (a canonical
//! point of order 4 with x-coordinate `1`), so its formulas specialize
//! to the domain curve alone; every other 4-isogeny and every
//! 3-isogeny takes an explicit kernel generator. All formulas below
//! are the standard Costello–Longa–Naehrig x-only isogeny formulas.

use crate::curve::{MontgomeryCurve, ProjectivePoint};
use crate::fp2::Fp2;

fn fp2_const(value: u64) -> Fp2 {
    let mut digits = [0_u64; crate::bigint::NWORDS_FIELD];
    if let Some(low) = digits.get_mut(0) {
        *low = value;
    }
    Fp2::from_fp(crate::fp::Fp::from_canonical_digits(digits))
}

/// The codomain of the fixed-kernel first 4-isogeny out of `domain`.
#[must_use]
pub fn first_four_isogeny_codomain(domain: &MontgomeryCurve) -> MontgomeryCurve {
    let two_c = domain.c.double();
    let c = domain.a.sub(&two_c);
    let four_c = two_c.double();
    let six_c = four_c.add(&two_c);
    let a_plus_six_c = six_c.add(&domain.a);
    let a = a_plus_six_c.double();
    MontgomeryCurve { a, c }
}

/// Push `point` through the fixed-kernel first 4-isogeny out of `domain`.
#[must_use]
pub fn eval_first_four_isogeny(point: &ProjectivePoint, domain: &MontgomeryCurve) -> ProjectivePoint {
    let t0 = point.x.add(&point.z).square();
    let t2 = point.x.mul(&point.z);
    let t1 = t2.double();
    let t1_diff = t0.sub(&t1);
    let x = domain.a.mul(&t2);
    let t3 = domain.c.mul(&t1_diff);
    let x_out = x.add(&t3).mul(&t0);
    let t0b = point.x.sub(&point.z).square();
    let t0c = t0b.mul(&t2);
    let t1c = domain.c.double().sub(&domain.a);
    let z_out = t1c.mul(&t0c);
    ProjectivePoint { x: x_out, z: z_out }
}

/// Precomputed coefficients for evaluating a general 4-isogeny,
/// returned alongside its codomain curve by [`compute_four_isogeny`].
#[derive(Clone, Copy, Debug)]
pub struct FourIsogenyCoefficients {
    x_sq_plus_z_sq: Fp2,
    x_sq_minus_z_sq: Fp2,
    xz_doubled_sq: Fp2,
    x_pow_4: Fp2,
    z_pow_4: Fp2,
}

/// Compute the 4-isogeny with kernel generated by `kernel` (a point
/// of order 4), returning its evaluation coefficients and codomain
/// curve.
#[must_use]
pub fn compute_four_isogeny(kernel: &ProjectivePoint) -> (FourIsogenyCoefficients, MontgomeryCurve) {
    let v0 = kernel.x.square();
    let v1 = kernel.z.square();
    let x_sq_plus_z_sq = v0.add(&v1);
    let x_sq_minus_z_sq = v0.sub(&v1);
    let xz_doubled_sq = kernel.x.add(&kernel.z).square().sub(&x_sq_plus_z_sq);
    let x_pow_4 = v0.square();
    let z_pow_4 = v1.square();
    let doubled = x_pow_4.double().sub(&z_pow_4);
    let a = doubled.double();
    let c = z_pow_4;
    let coeffs = FourIsogenyCoefficients { x_sq_plus_z_sq, x_sq_minus_z_sq, xz_doubled_sq, x_pow_4, z_pow_4 };
    (coeffs, MontgomeryCurve { a, c })
}

/// Push `point` through the 4-isogeny described by `coeffs`.
#[must_use]
pub fn eval_four_isogeny(point: &ProjectivePoint, coeffs: &FourIsogenyCoefficients) -> ProjectivePoint {
    let t0 = point.x.mul(&coeffs.xz_doubled_sq);
    let t1 = point.z.mul(&coeffs.x_sq_plus_z_sq);
    let t0b = t0.sub(&t1);
    let t1b = point.z.mul(&coeffs.x_sq_minus_z_sq);
    let t2 = t0b.sub(&t1b).square();
    let t0c = t0b.mul(&t1b);
    let t0d = t0c.double().double();
    let t1c = t0d.add(&t2);
    let t0e = t0d.mul(&t2);
    let z = t0e.mul(&coeffs.z_pow_4);
    let t2b = t2.mul(&coeffs.z_pow_4);
    let t0f = t1c.mul(&coeffs.x_pow_4);
    let t0g = t2b.sub(&t0f);
    let x = t1c.mul(&t0g);
    ProjectivePoint { x, z }
}

/// Precomputed coefficients for evaluating a 3-isogeny — simply the
/// kernel generator itself, normalized at computation time.
#[derive(Clone, Copy, Debug)]
pub struct ThreeIsogenyCoefficients {
    kernel_x: Fp2,
    kernel_z: Fp2,
}

/// Compute the 3-isogeny with kernel generated by `kernel` (a point
/// of order 3), returning its evaluation coefficients and codomain
/// curve.
#[must_use]
pub fn compute_three_isogeny(kernel: &ProjectivePoint) -> (ThreeIsogenyCoefficients, MontgomeryCurve) {
    let v1 = kernel.x.square();
    let v0 = v1.add(&v1).add(&v1);
    let v1b = v0.add(&v0).add(&v0);
    let v2 = kernel.z.square();
    let v3 = v2.square();
    let v2_doubled = v2.double();
    let v0b = v2_doubled.sub(&v0);
    let v1c = v1b.mul(&v0b);
    let cross = kernel.x.mul(&kernel.z).double();
    let a = v3.add(&v1c);
    let c = cross.mul(&v2_doubled);
    let coeffs = ThreeIsogenyCoefficients { kernel_x: kernel.x, kernel_z: kernel.z };
    (coeffs, MontgomeryCurve { a, c })
}

/// Push `point` through the 3-isogeny described by `coeffs`.
#[must_use]
pub fn eval_three_isogeny(point: &ProjectivePoint, coeffs: &ThreeIsogenyCoefficients) -> ProjectivePoint {
    let t0 = coeffs.kernel_x.mul(&point.x);
    let t1 = coeffs.kernel_z.mul(&point.z);
    let t2 = t0.sub(&t1);
    let t0b = coeffs.kernel_z.mul(&point.x);
    let t1b = coeffs.kernel_x.mul(&point.z);
    let t0c = t0b.sub(&t1b);
    let t2sq = t2.square();
    let t0dsq = t0c.square();
    let x = t2sq.mul(&point.x);
    let z = t0dsq.mul(&point.z);
    ProjectivePoint { x, z }
}

#[cfg(test)]
mod tests {
    use super::{compute_four_isogeny, compute_three_isogeny, eval_four_isogeny, eval_three_isogeny};
    use crate::curve::{xdbl, MontgomeryCurve, ProjectivePoint};
    use crate::fp2::Fp2;

    #[test]
    fn four_isogeny_kills_its_own_kernel() {
        let curve = MontgomeryCurve::base();
        let (a24, c24) = curve.doubling_constants();
        let order8 = ProjectivePoint::from_affine(Fp2::one());
        let kernel = xdbl(&order8, &a24, &c24);
        let (coeffs, _codomain) = compute_four_isogeny(&kernel);
        let image = eval_four_isogeny(&kernel, &coeffs);
        assert!(bool::from(image.z.is_zero()));
    }

    #[test]
    fn three_isogeny_kills_its_own_kernel() {
        let kernel = ProjectivePoint::from_affine(Fp2::one());
        let (coeffs, _codomain) = compute_three_isogeny(&kernel);
        let image = eval_three_isogeny(&kernel, &coeffs);
        assert!(bool::from(image.z.is_zero()));
    }
}
