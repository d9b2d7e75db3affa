//! Wire-format byte conversions for `p751`.
//!
//! Every value here is fixed-size, so the only failure mode worth a
//! [`SidhError`] is a decoded `Fp`/`Fp2` coordinate outside `[0, p)` —
//! array lengths are enforced by the type system instead of a runtime
//! check.

use crate::bigint::{ct_lt, Digits, NWORDS_FIELD};
use crate::error::SidhError;
use crate::fp::{Fp, P};
use crate::fp2::Fp2;

/// Octets in one `Fp` element, little-endian.
pub const FP_BYTES: usize = 8 * NWORDS_FIELD;
/// Octets in one `Fp2` element (`a0` then `a1`).
pub const FP2_BYTES: usize = 2 * FP_BYTES;
/// Octets in a private scalar (`eA = 372` and `eB = 239` both fit in
/// 384 bits, six limbs, well short of the full field width).
pub const SCALAR_BYTES: usize = 48;
/// Octets in an uncompressed public key (three `Fp2` x-coordinates).
pub const PUBLIC_KEY_BYTES: usize = 3 * FP2_BYTES;
/// Octets in a shared secret (one `Fp2`, the codomain `j`-invariant).
pub const SHARED_SECRET_BYTES: usize = FP2_BYTES;
/// Octets in a compressed public key (three scalars plus the codomain
/// curve coefficient).
pub const COMPRESSED_PUBLIC_KEY_BYTES: usize = 3 * SCALAR_BYTES + FP2_BYTES;

const SCALAR_LIMBS: usize = SCALAR_BYTES / 8;

pub(crate) fn digits_to_le_bytes(digits: &Digits) -> [u8; FP_BYTES] {
    let mut out = [0_u8; FP_BYTES];
    for (chunk, limb) in out.chunks_exact_mut(8).zip(digits.iter()) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }
    out
}

pub(crate) fn le_bytes_to_digits(bytes: &[u8; FP_BYTES]) -> Digits {
    let mut digits = [0_u64; NWORDS_FIELD];
    for (limb, chunk) in digits.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0_u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    digits
}

pub(crate) fn fp_to_bytes(value: &Fp) -> [u8; FP_BYTES] {
    digits_to_le_bytes(&value.to_canonical_digits())
}

pub(crate) fn fp_from_bytes(bytes: &[u8; FP_BYTES]) -> Result<Fp, SidhError> {
    let digits = le_bytes_to_digits(bytes);
    if bool::from(ct_lt(&digits, &P)) {
        Ok(Fp::from_canonical_digits(digits))
    } else {
        Err(SidhError::InvalidArgument("fp coordinate is not less than p"))
    }
}

pub(crate) fn fp2_to_bytes(value: &Fp2) -> [u8; FP2_BYTES] {
    let mut out = [0_u8; FP2_BYTES];
    let Some(first) = out.get_mut(..FP_BYTES) else {
        unreachable!("FP2_BYTES == 2 * FP_BYTES")
    };
    first.copy_from_slice(&fp_to_bytes(&value.a0));
    let Some(second) = out.get_mut(FP_BYTES..) else {
        unreachable!("FP2_BYTES == 2 * FP_BYTES")
    };
    second.copy_from_slice(&fp_to_bytes(&value.a1));
    out
}

pub(crate) fn fp2_from_bytes(bytes: &[u8; FP2_BYTES]) -> Result<Fp2, SidhError> {
    let mut a0_bytes = [0_u8; FP_BYTES];
    let mut a1_bytes = [0_u8; FP_BYTES];
    let Some(first) = bytes.get(..FP_BYTES) else {
        unreachable!("FP2_BYTES == 2 * FP_BYTES")
    };
    a0_bytes.copy_from_slice(first);
    let Some(second) = bytes.get(FP_BYTES..) else {
        unreachable!("FP2_BYTES == 2 * FP_BYTES")
    };
    a1_bytes.copy_from_slice(second);
    Ok(Fp2 { a0: fp_from_bytes(&a0_bytes)?, a1: fp_from_bytes(&a1_bytes)? })
}

/// Encode a scalar's low 48 octets, little-endian. Callers only ever
/// hold scalars already masked to `eA`/`eB` bits, so the high limbs are
/// always zero and safely dropped.
pub(crate) fn scalar_to_bytes(digits: &Digits) -> [u8; SCALAR_BYTES] {
    let mut out = [0_u8; SCALAR_BYTES];
    for (chunk, limb) in out.chunks_exact_mut(8).zip(digits.iter().take(SCALAR_LIMBS)) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }
    out
}

pub(crate) fn scalar_from_bytes(bytes: &[u8; SCALAR_BYTES]) -> Digits {
    let mut digits = [0_u64; NWORDS_FIELD];
    for (limb, chunk) in digits.iter_mut().take(SCALAR_LIMBS).zip(bytes.chunks_exact(8)) {
        let mut word = [0_u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::{fp2_from_bytes, fp2_to_bytes, fp_from_bytes, fp_to_bytes, scalar_from_bytes, scalar_to_bytes};
    use crate::bigint::NWORDS_FIELD;
    use crate::fp::Fp;
    use crate::fp2::Fp2;

    #[test]
    fn fp_roundtrips_through_bytes() {
        let mut digits = [0_u64; NWORDS_FIELD];
        if let Some(low) = digits.get_mut(0) {
            *low = 123_456_789;
        }
        let value = Fp::from_canonical_digits(digits);
        let bytes = fp_to_bytes(&value);
        let decoded = fp_from_bytes(&bytes).expect("value was canonical");
        assert_eq!(decoded.to_canonical_digits(), value.to_canonical_digits());
    }

    #[test]
    fn fp2_roundtrips_through_bytes() {
        let mut a0 = [0_u64; NWORDS_FIELD];
        let mut a1 = [0_u64; NWORDS_FIELD];
        if let Some(low) = a0.get_mut(0) {
            *low = 7;
        }
        if let Some(low) = a1.get_mut(0) {
            *low = 9;
        }
        let value = Fp2 { a0: Fp::from_canonical_digits(a0), a1: Fp::from_canonical_digits(a1) };
        let bytes = fp2_to_bytes(&value);
        let decoded = fp2_from_bytes(&bytes).expect("value was canonical");
        assert_eq!(decoded, value);
    }

    #[test]
    fn fp_bytes_at_the_modulus_are_rejected() {
        let bytes = super::digits_to_le_bytes(&crate::fp::P);
        assert!(fp_from_bytes(&bytes).is_err());
    }

    #[test]
    fn scalar_roundtrips_through_bytes() {
        let mut digits = [0_u64; NWORDS_FIELD];
        if let Some(low) = digits.get_mut(0) {
            *low = 0xdead_beef;
        }
        let bytes = scalar_to_bytes(&digits);
        assert_eq!(scalar_from_bytes(&bytes), digits);
    }
}
