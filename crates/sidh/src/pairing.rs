//! L6 — reduced Tate pairings used by public-key compression.
//!
//! Only compression touches this module, and compression only ever
//! operates on public curve points, so the Miller loop below is plain
//! affine `(x, y)` arithmetic via [`crate::curve::affine`] rather than
//! the constant-time `x`-only machinery the key-exchange path uses.

use crate::bigint::Digits;
use crate::curve::affine::{add_on, double_on, slope_on, AffinePoint as MaybePoint};
use crate::fp2::Fp2;
use crate::party::Party;

/// A known-affine (non-identity) point, the only kind the Miller loop
/// below is ever handed.
pub type Point = (Fp2, Fp2);

fn line_eval(lambda: &Fp2, at_step: Point, evaluated_at: Point) -> Fp2 {
    let (x_step, y_step) = at_step;
    let (x_at, y_at) = evaluated_at;
    y_at.sub(&y_step).sub(&lambda.mul(&x_at.sub(&x_step)))
}

fn digits_msb_bits(value: &Digits) -> Vec<bool> {
    let mut bits = Vec::with_capacity(value.len() * 64);
    for limb in value.iter().rev() {
        for bit_index in (0..64).rev() {
            bits.push((limb >> bit_index) & 1 == 1);
        }
    }
    while bits.first() == Some(&false) {
        bits.remove(0);
    }
    if bits.is_empty() {
        bits.push(false);
    }
    bits
}

/// Miller's algorithm: the rational function `f_{order,base}` of
/// [Miller1986], evaluated at `evaluated_at`. `base` must have order
/// exactly the integer `order_bits` (most-significant bit first)
/// encodes.
fn miller(curve_a: &Fp2, base: Point, order_bits: &[bool], evaluated_at: Point) -> Fp2 {
    let mut running = base;
    let mut f = Fp2::one();
    for &bit in order_bits.iter().skip(1) {
        let lambda = slope_on(curve_a, running, running);
        f = f.square().mul(&line_eval(&lambda, running, evaluated_at));
        let Some(doubled) = double_on(curve_a, Some(running)) else {
            unreachable!("base has order > 2 within the loop, doubling never hits the identity")
        };
        running = doubled;
        if bit {
            let lambda_add = slope_on(curve_a, running, base);
            f = f.mul(&line_eval(&lambda_add, running, evaluated_at));
            let Some(sum) = add_on(curve_a, Some(running), Some(base)) else {
                unreachable!("running and base are never exact negatives mid-loop for the bases this crate pairs")
            };
            running = sum;
        }
    }
    f
}

fn fp2_pow(base: &Fp2, exponent: &Digits) -> Fp2 {
    let mut result = Fp2::one();
    for limb in exponent.iter().rev() {
        for bit_index in (0..64).rev() {
            result = result.square();
            if (limb >> bit_index) & 1 == 1 {
                result = result.mul(base);
            }
        }
    }
    result
}

/// The reduced Tate pairing `T(base, evaluated_at)`, where `base` has
/// order `prime^chain_length` for `party`'s prime on the curve
/// `curve_a`. Used by compression to decompose torsion-basis images
/// into a Pohlig–Hellman-solvable pair.
///
/// `party` selects which party's torsion order `base` is assumed to
/// have (`2^eA` for Alice, `3^eB` for Bob) — the final exponentiation
/// uses the complementary cofactor `(p+1)/order`, which this crate's
/// `p751` happens to make exactly the *other* party's torsion order.
#[must_use]
pub fn tate_pairing(party: Party, curve_a: &Fp2, base: Point, evaluated_at: Point) -> Fp2 {
    let (order, cofactor) = match party {
        Party::Alice => (crate::params::TWO_POW_EA, crate::params::THREE_POW_EB),
        Party::Bob => (crate::params::THREE_POW_EB, crate::params::TWO_POW_EA),
    };
    let order_bits = digits_msb_bits(&order);
    let miller_value = miller(curve_a, base, &order_bits, evaluated_at);
    let conjugate = Fp2 { a0: miller_value.a0, a1: miller_value.a1.neg() };
    let after_p_minus_one = conjugate.mul(&miller_value.invert());
    fp2_pow(&after_p_minus_one, &cofactor)
}

/// `true` if `value` is not the curve's identity, for callers that
/// need to confirm a pairing input is non-degenerate before calling
/// [`tate_pairing`].
#[must_use]
pub fn is_nonidentity(point: MaybePoint) -> bool {
    point.is_some()
}

#[cfg(test)]
mod tests {
    use super::tate_pairing;
    use crate::curve::affine::scalar_mul;
    use crate::party::Party;
    use proptest::prelude::*;

    #[test]
    fn pairing_is_bilinear_in_the_first_argument() {
        let basis = crate::params::base_torsion_basis(Party::Bob);
        let p_point = {
            let rhs = basis.p_x.square().mul(&basis.p_x).add(&basis.p_x);
            let y = rhs.sqrt_if_real_square().expect("fixed basis x-coordinate lies on the curve");
            (basis.p_x, y)
        };
        let q_point = {
            let rhs = basis.q_x.square().mul(&basis.q_x).add(&basis.q_x);
            let y = rhs.sqrt_if_real_square().expect("distorted basis point also lies on the curve");
            (basis.q_x, y)
        };
        let curve_a = crate::fp2::Fp2::ZERO;
        let base_pairing = tate_pairing(Party::Bob, &curve_a, p_point, q_point);

        let three = {
            let mut digits = [0_u64; crate::bigint::NWORDS_FIELD];
            if let Some(low) = digits.get_mut(0) {
                *low = 3;
            }
            digits
        };
        let Some(tripled) = scalar_mul(&three, Some(p_point)) else {
            unreachable!("P has order 3^239, far from the identity after tripling")
        };
        let tripled_pairing = tate_pairing(Party::Bob, &curve_a, tripled, q_point);
        let expected = base_pairing.square().mul(&base_pairing);
        assert_eq!(tripled_pairing, expected);
    }

    fn bob_basis_points() -> (super::Point, super::Point) {
        let basis = crate::params::base_torsion_basis(Party::Bob);
        let p_point = {
            let rhs = basis.p_x.square().mul(&basis.p_x).add(&basis.p_x);
            let y = rhs.sqrt_if_real_square().expect("fixed basis x-coordinate lies on the curve");
            (basis.p_x, y)
        };
        let q_point = {
            let rhs = basis.q_x.square().mul(&basis.q_x).add(&basis.q_x);
            let y = rhs.sqrt_if_real_square().expect("distorted basis point also lies on the curve");
            (basis.q_x, y)
        };
        (p_point, q_point)
    }

    proptest! {
        #[test]
        fn pairing_is_bilinear_for_arbitrary_small_multiples(k in 1_u64..200) {
            let (p_point, q_point) = bob_basis_points();
            let curve_a = crate::fp2::Fp2::ZERO;
            let base_pairing = tate_pairing(Party::Bob, &curve_a, p_point, q_point);

            let scalar = {
                let mut digits = [0_u64; crate::bigint::NWORDS_FIELD];
                if let Some(low) = digits.get_mut(0) {
                    *low = k;
                }
                digits
            };
            let Some(scaled) = scalar_mul(&scalar, Some(p_point)) else {
                unreachable!("k is far smaller than P's order 3^239")
            };
            let scaled_pairing = tate_pairing(Party::Bob, &curve_a, scaled, q_point);

            let mut expected = crate::fp2::Fp2::one();
            for _ in 0..k {
                expected = expected.mul(&base_pairing);
            }
            prop_assert_eq!(scaled_pairing, expected);
        }
    }
}
