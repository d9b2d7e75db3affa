//! L8 — public-key compression and decompression.
//!
//! A public key is the codomain curve together with three torsion-basis
//! images. Rather than shipping all three `Fp2` x-coordinates, compression
//! re-expresses the images as coordinates against a freshly generated
//! basis of the same torsion subgroup and ships three scalars (plus one
//! bit and the curve coefficient) instead.
//!
//! The torsion subgroup a public key's images live in is always the
//! *other* party's — Alice's isogeny preserves Bob's basis order, and
//! vice versa — so every pairing, discrete log, and basis search in this
//! module runs against `party.other()`.

use crate::bigint::{mp_mul, mp_sub, ct_lt, Digits, NWORDS_FIELD};
use crate::curve::affine::{add_on, scalar_mul_on};
use crate::error::SidhError;
use crate::fp::Fp;
use crate::fp2::Fp2;
use crate::keyexchange::PublicKey;
use crate::params::RandomSource;
use crate::party::Party;

type Point = (Fp2, Fp2);

/// A compressed public key: three scalars modulo the other party's
/// torsion order, a branch bit, and the codomain curve coefficient.
#[derive(Clone, Copy, Debug)]
pub struct CompressedPublicKey {
    /// The party whose isogeny produced this key.
    pub party: Party,
    /// The codomain curve's `A` coefficient.
    pub curve_a: Fp2,
    /// `false` if normalized against `a0`, `true` if against `b0`.
    pub bit: bool,
    pub(crate) scalar0: Digits,
    pub(crate) scalar1: Digits,
    pub(crate) scalar2: Digits,
}

impl CompressedPublicKey {
    /// Encode as 336 octets: three 48-octet scalars, the top bit of
    /// the third standing in for the branch bit, followed by the
    /// 192-octet codomain curve coefficient.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; crate::encoding::COMPRESSED_PUBLIC_KEY_BYTES] {
        let mut out = [0_u8; crate::encoding::COMPRESSED_PUBLIC_KEY_BYTES];
        let scalar_bytes = crate::encoding::SCALAR_BYTES;
        let Some(slot0) = out.get_mut(..scalar_bytes) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        slot0.copy_from_slice(&crate::encoding::scalar_to_bytes(&self.scalar0));
        let Some(slot1) = out.get_mut(scalar_bytes..2 * scalar_bytes) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        slot1.copy_from_slice(&crate::encoding::scalar_to_bytes(&self.scalar1));
        let mut scalar2_bytes = crate::encoding::scalar_to_bytes(&self.scalar2);
        if self.bit {
            if let Some(top) = scalar2_bytes.last_mut() {
                *top |= 0x80;
            }
        }
        let Some(slot2) = out.get_mut(2 * scalar_bytes..3 * scalar_bytes) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        slot2.copy_from_slice(&scalar2_bytes);
        let Some(slot3) = out.get_mut(3 * scalar_bytes..) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        slot3.copy_from_slice(&crate::encoding::fp2_to_bytes(&self.curve_a));
        out
    }

    /// Decode a compressed public key belonging to `party`.
    pub fn try_from_bytes(
        party: Party,
        bytes: &[u8; crate::encoding::COMPRESSED_PUBLIC_KEY_BYTES],
    ) -> Result<Self, SidhError> {
        let scalar_bytes = crate::encoding::SCALAR_BYTES;
        let mut scalar0 = [0_u8; 48];
        let mut scalar1 = [0_u8; 48];
        let mut scalar2 = [0_u8; 48];
        let mut curve_a_bytes = [0_u8; crate::encoding::FP2_BYTES];
        let Some(chunk0) = bytes.get(..scalar_bytes) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        scalar0.copy_from_slice(chunk0);
        let Some(chunk1) = bytes.get(scalar_bytes..2 * scalar_bytes) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        scalar1.copy_from_slice(chunk1);
        let Some(chunk2) = bytes.get(2 * scalar_bytes..3 * scalar_bytes) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        scalar2.copy_from_slice(chunk2);
        let Some(chunk3) = bytes.get(3 * scalar_bytes..) else {
            unreachable!("buffer is sized for three scalars plus a curve coefficient")
        };
        curve_a_bytes.copy_from_slice(chunk3);

        let bit = scalar2.last().is_some_and(|byte| byte & 0x80 != 0);
        if let Some(top) = scalar2.last_mut() {
            *top &= 0x7f;
        }

        Ok(Self {
            party,
            curve_a: crate::encoding::fp2_from_bytes(&curve_a_bytes)?,
            bit,
            scalar0: crate::encoding::scalar_from_bytes(&scalar0),
            scalar1: crate::encoding::scalar_from_bytes(&scalar1),
            scalar2: crate::encoding::scalar_from_bytes(&scalar2),
        })
    }
}

fn digits_from_u64(value: u64) -> Digits {
    let mut out = [0_u64; NWORDS_FIELD];
    if let Some(low) = out.get_mut(0) {
        *low = value;
    }
    out
}

fn prime_power_digits(prime: u64, exponent: u32) -> Digits {
    let mut acc = digits_from_u64(1);
    let prime_digits = digits_from_u64(prime);
    for _ in 0..exponent {
        let wide = mp_mul(&acc, &prime_digits);
        let mut truncated = [0_u64; NWORDS_FIELD];
        if let Some(low) = wide.get(..NWORDS_FIELD) {
            truncated.copy_from_slice(low);
        }
        acc = truncated;
    }
    acc
}

/// Reduce a double-width value modulo `modulus` by processing its bits
/// most-significant first, non-constant-time (public compression data
/// only).
fn mod_reduce_wide(wide: &[u64], modulus: &Digits) -> Digits {
    let mut remainder = [0_u64; NWORDS_FIELD];
    for limb in wide.iter().rev() {
        for bit_index in (0..64_u32).rev() {
            let bit = (limb >> bit_index) & 1;
            let mut carry = bit;
            for slot in remainder.iter_mut() {
                let shifted = (*slot << 1) | carry;
                carry = *slot >> 63;
                *slot = shifted;
            }
            if !bool::from(ct_lt(&remainder, modulus)) {
                let (diff, _borrow) = mp_sub(&remainder, modulus);
                remainder = diff;
            }
        }
    }
    remainder
}

fn mulmod(a: &Digits, b: &Digits, modulus: &Digits) -> Digits {
    mod_reduce_wide(&mp_mul(a, b), modulus)
}

fn powmod(base: &Digits, exponent: &Digits, modulus: &Digits) -> Digits {
    let mut result = digits_from_u64(1);
    for limb in exponent.iter().rev() {
        for bit_index in (0..64_u32).rev() {
            result = mulmod(&result, &result, modulus);
            if (limb >> bit_index) & 1 == 1 {
                result = mulmod(&result, base, modulus);
            }
        }
    }
    result
}

/// `value^-1 mod prime^exponent`, via Euler's theorem
/// (`phi(prime^exponent) = prime^(exponent-1)*(prime-1)`). `None` if
/// `value` is divisible by `prime` and so has no inverse.
fn invert_mod_prime_power(value: &Digits, prime: u64, exponent: u32) -> Option<Digits> {
    let modulus = prime_power_digits(prime, exponent);
    if value_divisible_by(value, prime) {
        return None;
    }
    let totient_factor = prime_power_digits(prime, exponent - 1);
    let prime_minus_one = digits_from_u64(prime - 1);
    let totient = {
        let wide = mp_mul(&totient_factor, &prime_minus_one);
        let mut truncated = [0_u64; NWORDS_FIELD];
        if let Some(low) = wide.get(..NWORDS_FIELD) {
            truncated.copy_from_slice(low);
        }
        truncated
    };
    let (exponent_minus_one, _borrow) = mp_sub(&totient, &digits_from_u64(1));
    Some(powmod(value, &exponent_minus_one, &modulus))
}

fn value_divisible_by(value: &Digits, prime: u64) -> bool {
    let modulus = digits_from_u64(prime);
    mod_reduce_wide(value, &modulus) == digits_from_u64(0)
}

fn neg_mod(value: &Digits, modulus: &Digits) -> Digits {
    if *value == digits_from_u64(0) {
        return digits_from_u64(0);
    }
    let (diff, _borrow) = mp_sub(modulus, value);
    diff
}

fn fp_pow(base: &Fp, exponent: &Digits) -> Fp {
    let mut result = Fp::one();
    for limb in exponent.iter().rev() {
        for bit_index in (0..64_u32).rev() {
            result = result.square();
            if (limb >> bit_index) & 1 == 1 {
                result = result.mul(base);
            }
        }
    }
    result
}

fn fp_sqrt(value: &Fp) -> Option<Fp> {
    if bool::from(value.is_zero()) {
        return Some(Fp::ZERO);
    }
    let candidate = fp_pow(value, &crate::params::P_PLUS_ONE_OVER_4);
    if candidate.mul(&candidate) == *value {
        Some(candidate)
    } else {
        None
    }
}

/// Square root in `GF(p751^2)` via the classic "complex square root"
/// reduction to two `Fp` square roots through the norm.
fn fp2_sqrt(value: &Fp2) -> Option<Fp2> {
    if bool::from(value.a1.is_zero()) {
        return value.sqrt_if_real_square();
    }
    let norm = value.a0.square().add(&value.a1.square());
    let delta = fp_sqrt(&norm)?;
    let two_inv = Fp::one().add(&Fp::one()).invert();
    for candidate in [value.a0.add(&delta).mul(&two_inv), value.a0.sub(&delta).mul(&two_inv)] {
        if let Some(real_part) = fp_sqrt(&candidate) {
            if bool::from(real_part.is_zero()) {
                continue;
            }
            let imag_part = value.a1.mul(&real_part.double().invert());
            return Some(Fp2 { a0: real_part, a1: imag_part });
        }
    }
    None
}

fn lift_point(x: Fp2, curve_a: &Fp2) -> Option<Point> {
    let rhs = x.square().mul(&x).add(&curve_a.mul(&x.square())).add(&x);
    let y = fp2_sqrt(&rhs)?;
    Some((x, y))
}

fn random_fp2(rng: &mut impl RandomSource) -> Result<Fp2, SidhError> {
    let mut bytes = [0_u8; 2 * 8 * NWORDS_FIELD];
    rng.try_fill_bytes(&mut bytes)?;
    let a0 = bytes_to_fp(&bytes[..8 * NWORDS_FIELD]);
    let a1 = bytes_to_fp(&bytes[8 * NWORDS_FIELD..]);
    Ok(Fp2 { a0, a1 })
}

fn bytes_to_fp(bytes: &[u8]) -> Fp {
    let mut digits = [0_u64; NWORDS_FIELD];
    for (limb, chunk) in digits.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0_u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    Fp::from_canonical_digits(digits)
}

fn search_basis_point(
    curve_a: &Fp2,
    cofactor: &Digits,
    remaining_order_check: &Digits,
    rng: &mut impl RandomSource,
    max_iterations: u32,
) -> Result<Point, SidhError> {
    for _attempt in 0..max_iterations {
        let x = random_fp2(rng)?;
        let lifted = match lift_point(x, curve_a) {
            Some(point) => point,
            None => {
                let twisted_x = x.neg().sub(curve_a);
                match lift_point(twisted_x, curve_a) {
                    Some(point) => point,
                    None => continue,
                }
            }
        };
        let Some(scaled) = scalar_mul_on(curve_a, cofactor, Some(lifted)) else {
            continue;
        };
        if scalar_mul_on(curve_a, remaining_order_check, Some(scaled)).is_some() {
            return Ok(scaled);
        }
    }
    tracing::warn!(max_iterations, "torsion basis point search exhausted its retry budget");
    Err(SidhError::TooManyIterations(max_iterations))
}

/// Generate a deterministic-under-a-fixed-RNG basis of the `torsion`
/// party's full torsion subgroup on the curve `curve_a`.
fn generate_torsion_basis(
    curve_a: &Fp2,
    torsion: Party,
    rng: &mut impl RandomSource,
    max_iterations: u32,
) -> Result<(Point, Point), SidhError> {
    let cofactor = match torsion {
        Party::Alice => crate::params::THREE_POW_EB,
        Party::Bob => crate::params::TWO_POW_EA,
    };
    let remaining_order_check = match torsion {
        Party::Alice => crate::params::TWO_POW_EA_MINUS_1,
        Party::Bob => crate::params::THREE_POW_EB_MINUS_1,
    };
    let first = search_basis_point(curve_a, &cofactor, &remaining_order_check, rng, max_iterations)?;
    loop {
        let second = search_basis_point(curve_a, &cofactor, &remaining_order_check, rng, max_iterations)?;
        let scaled_first = scalar_mul_on(curve_a, &remaining_order_check, Some(first)).map(|(x, _)| x);
        let scaled_second = scalar_mul_on(curve_a, &remaining_order_check, Some(second)).map(|(x, _)| x);
        if scaled_first != scaled_second {
            return Ok((first, second));
        }
    }
}

fn decompose(
    torsion: Party,
    curve_a: &Fp2,
    base_pairing: &Fp2,
    r0: Point,
    r1: Point,
    target: Point,
    order: &Digits,
) -> (Digits, Digits) {
    let pairing_r0 = crate::pairing::tate_pairing(torsion, curve_a, r0, target);
    let pairing_r1 = crate::pairing::tate_pairing(torsion, curve_a, r1, target);
    let b = crate::dlp::solve(base_pairing, &pairing_r0, torsion.prime(), torsion.chain_length());
    let neg_a = crate::dlp::solve(base_pairing, &pairing_r1, torsion.prime(), torsion.chain_length());
    let a = neg_mod(&neg_a, order);
    (a, b)
}

/// Compress `pk` against a freshly generated torsion basis.
pub fn compress(
    pk: &PublicKey,
    rng: &mut impl RandomSource,
    parameters: &crate::params::ParameterSet,
) -> Result<CompressedPublicKey, SidhError> {
    tracing::debug!(party = ?pk.party, "compressing public key");
    let torsion = pk.party.other();
    let curve_a = crate::curve::recover_curve_a(&pk.p_x, &pk.q_x, &pk.pq_x);
    let phi_p = lift_point(pk.p_x, &curve_a).ok_or(SidhError::PublicKeyValidation)?;
    let phi_q = lift_point(pk.q_x, &curve_a).ok_or(SidhError::PublicKeyValidation)?;

    let (r0, r1) = generate_torsion_basis(&curve_a, torsion, rng, parameters.max_rng_iterations)?;
    let base_pairing = crate::pairing::tate_pairing(torsion, &curve_a, r0, r1);
    let order = prime_power_digits(torsion.prime(), torsion.chain_length());

    let (a0, b0) = decompose(torsion, &curve_a, &base_pairing, r0, r1, phi_p, &order);
    let (a1, b1) = decompose(torsion, &curve_a, &base_pairing, r0, r1, phi_q, &order);

    let result = if let Some(a0_inv) = invert_mod_prime_power(&a0, torsion.prime(), torsion.chain_length()) {
        CompressedPublicKey {
            party: pk.party,
            curve_a,
            bit: false,
            scalar0: mulmod(&b0, &a0_inv, &order),
            scalar1: mulmod(&a1, &a0_inv, &order),
            scalar2: mulmod(&b1, &a0_inv, &order),
        }
    } else {
        let b0_inv = invert_mod_prime_power(&b0, torsion.prime(), torsion.chain_length())
            .ok_or(SidhError::PublicKeyValidation)?;
        CompressedPublicKey {
            party: pk.party,
            curve_a,
            bit: true,
            scalar0: mulmod(&a0, &b0_inv, &order),
            scalar1: mulmod(&b1, &b0_inv, &order),
            scalar2: mulmod(&a1, &b0_inv, &order),
        }
    };
    tracing::debug!(party = ?pk.party, "public key compressed");
    Ok(result)
}

/// Recover the kernel generator point (and codomain `A`) a peer would
/// need to continue their own isogeny walk against this compressed key,
/// given their own secret scalar.
pub(crate) fn decompress(
    compressed: &CompressedPublicKey,
    peer_scalar: &Digits,
    rng: &mut impl RandomSource,
    parameters: &crate::params::ParameterSet,
) -> Result<(Point, Fp2), SidhError> {
    tracing::debug!(party = ?compressed.party, "decompressing public key");
    let torsion = compressed.party.other();
    let (r0, r1) = generate_torsion_basis(&compressed.curve_a, torsion, rng, parameters.max_rng_iterations)?;
    let order = prime_power_digits(torsion.prime(), torsion.chain_length());

    let s1_times_priv = mulmod(&compressed.scalar1, peer_scalar, &order);
    let s2_times_priv = mulmod(&compressed.scalar2, peer_scalar, &order);

    let (r0_coeff, r1_coeff) = if compressed.bit {
        let (sum0, _) = crate::bigint::mp_add(&compressed.scalar0, &s1_times_priv);
        let r0_coeff = mod_reduce_wide(&sum0, &order);
        let (sum1, _) = crate::bigint::mp_add(&digits_from_u64(1), &s2_times_priv);
        let r1_coeff = mod_reduce_wide(&sum1, &order);
        (r0_coeff, r1_coeff)
    } else {
        let (sum0, _) = crate::bigint::mp_add(&digits_from_u64(1), &s1_times_priv);
        let r0_coeff = mod_reduce_wide(&sum0, &order);
        let (sum1, _) = crate::bigint::mp_add(&compressed.scalar0, &s2_times_priv);
        let r1_coeff = mod_reduce_wide(&sum1, &order);
        (r0_coeff, r1_coeff)
    };

    let scaled_r0 = scalar_mul_on(&compressed.curve_a, &r0_coeff, Some(r0));
    let scaled_r1 = scalar_mul_on(&compressed.curve_a, &r1_coeff, Some(r1));
    let kernel = add_on(&compressed.curve_a, scaled_r0, scaled_r1).ok_or(SidhError::PublicKeyValidation)?;
    tracing::debug!(party = ?compressed.party, "public key decompressed");
    Ok((kernel, compressed.curve_a))
}

#[cfg(test)]
mod tests {
    use super::compress;
    use crate::keyexchange::SecretKey;
    use crate::params::P751;
    use crate::party::Party;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn compressed_kernel_matches_uncompressed_agreement() {
        let mut rng = StdRng::seed_from_u64(99);
        let alice = SecretKey::generate(Party::Alice, &P751, &mut rng).expect("rng does not fail in tests");
        let bob = SecretKey::generate(Party::Bob, &P751, &mut rng).expect("rng does not fail in tests");
        let alice_public = alice.public_key();

        let compressed = compress(&alice_public, &mut rng, &P751).expect("compression succeeds for a fresh key");
        let direct = bob.agree(&alice_public).expect("valid peer key");
        let via_compression = bob
            .agree_compressed(&compressed, &mut rng, &P751)
            .expect("decompression succeeds for a key this test just compressed");
        assert_eq!(via_compression, direct);
    }
}
