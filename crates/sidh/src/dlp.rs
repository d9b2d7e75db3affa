//! L7 — Pohlig–Hellman discrete log in the `prime^exponent`-order
//! cyclotomic subgroups produced by [`crate::pairing`].
//!
//! Rather than transcribing the reference implementation's four fixed
//! window sizes (tuned to its specific precomputed-table memory
//! budget), this is a digit-at-a-time recursive descent: at each
//! level the residual target is raised to a cofactor landing it in
//! the order-`prime^step` subgroup, then matched against a
//! lookup table built for that level. The window width is the
//! largest `w` with `prime^w <= 2^16` — `16` for `prime = 2`, `10`
//! for `prime = 3` — so the last level of a chain whose length isn't
//! a multiple of the window is simply a shorter step.

use crate::bigint::{mp_add, mp_mul, Digits, NWORDS_FIELD};
use crate::fp2::Fp2;

/// Largest window with `prime^window <= 2^16`.
#[must_use]
pub const fn window_for(prime: u64) -> u32 {
    match prime {
        2 => 16,
        3 => 10,
        _ => 1,
    }
}

fn digits_from_u64(value: u64) -> Digits {
    let mut out = [0_u64; NWORDS_FIELD];
    if let Some(low) = out.get_mut(0) {
        *low = value;
    }
    out
}

fn truncate_to_digits(wide: &[u64]) -> Digits {
    let mut out = [0_u64; NWORDS_FIELD];
    if let Some(low) = wide.get(..NWORDS_FIELD) {
        out.copy_from_slice(low);
    }
    out
}

fn prime_power_digits(prime: u64, exponent: u32) -> Digits {
    let mut acc = digits_from_u64(1);
    let prime_digits = digits_from_u64(prime);
    for _ in 0..exponent {
        let wide = mp_mul(&acc, &prime_digits);
        acc = truncate_to_digits(&wide);
    }
    acc
}

fn small_prime_power(prime: u64, exponent: u32) -> u64 {
    let mut acc = 1_u64;
    for _ in 0..exponent {
        acc *= prime;
    }
    acc
}

fn pow_digits(base: &Fp2, exponent: &Digits) -> Fp2 {
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

fn pow_prime_power(base: &Fp2, prime: u64, power: u32) -> Fp2 {
    let mut acc = *base;
    for _ in 0..power {
        acc = match prime {
            2 => acc.square(),
            3 => acc.square().mul(&acc),
            _ => acc,
        };
    }
    acc
}

fn table_lookup(table: &[Fp2], target: &Fp2) -> u64 {
    for (index, entry) in table.iter().enumerate() {
        if entry == target {
            return u64::try_from(index).unwrap_or(0);
        }
    }
    unreachable!("target always lies in the subgroup this level's table enumerates")
}

/// Solve `k` in `[0, prime^total_exponent)` such that `base^k ==
/// target`, where `base` has order exactly `prime^total_exponent`.
#[must_use]
pub fn solve(base: &Fp2, target: &Fp2, prime: u64, total_exponent: u32) -> Digits {
    let window = window_for(prime);
    let mut known = digits_from_u64(0);
    let mut level = 0_u32;
    while level < total_exponent {
        let step = window.min(total_exponent - level);
        let known_contribution = pow_digits(base, &known);
        let residual = target.mul(&known_contribution.invert());
        let remaining = total_exponent - level - step;
        let reduced = pow_prime_power(&residual, prime, remaining);

        let step_power = prime_power_digits(prime, remaining);
        let stepped_base = pow_digits(base, &step_power);
        let table_len = small_prime_power(prime, step);
        let mut table = Vec::with_capacity(usize::try_from(table_len).unwrap_or(0));
        let mut acc = Fp2::one();
        for _ in 0..table_len {
            table.push(acc);
            acc = acc.mul(&stepped_base);
        }
        let digit = table_lookup(&table, &reduced);

        let place_value = prime_power_digits(prime, level);
        let contribution = mp_mul(&place_value, &digits_from_u64(digit));
        let (sum, _carry) = mp_add(&known, &truncate_to_digits(&contribution));
        known = sum;
        level += step;
    }
    known
}

#[cfg(test)]
mod tests {
    use super::solve;
    use crate::fp2::Fp2;
    use crate::party::Party;
    use proptest::prelude::*;

    #[test]
    fn solves_a_structured_bob_side_instance() {
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
        let curve_a = Fp2::ZERO;
        let base = crate::pairing::tate_pairing(Party::Bob, &curve_a, p_point, q_point);

        let known_k = 17_u64;
        let mut exponent = [0_u64; crate::bigint::NWORDS_FIELD];
        if let Some(low) = exponent.get_mut(0) {
            *low = known_k;
        }
        let target = super::pow_digits(&base, &exponent);

        let solved = solve(&base, &target, Party::Bob.prime(), Party::Bob.chain_length());
        assert_eq!(solved.first().copied(), Some(known_k));
        assert!(solved.iter().skip(1).all(|&limb| limb == 0));
    }

    fn bob_side_base() -> Fp2 {
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
        crate::pairing::tate_pairing(Party::Bob, &Fp2::ZERO, p_point, q_point)
    }

    proptest! {
        #[test]
        fn solve_recovers_arbitrary_small_exponents(known_k in 0_u64..50_000) {
            let base = bob_side_base();
            let mut exponent = [0_u64; crate::bigint::NWORDS_FIELD];
            if let Some(low) = exponent.get_mut(0) {
                *low = known_k;
            }
            let target = super::pow_digits(&base, &exponent);
            let solved = solve(&base, &target, Party::Bob.prime(), Party::Bob.chain_length());
            prop_assert_eq!(solved.first().copied(), Some(known_k));
            prop_assert!(solved.iter().skip(1).all(|&limb| limb == 0));
        }
    }
}
